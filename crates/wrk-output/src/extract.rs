// Numan Thabit 2025
//! Single pass over the report that splits it into raw blocks.

use std::{borrow::Cow, collections::HashMap};

use tracing::{debug, trace};

use crate::grammar::{BlockKind, GrammarRegistry, LinePredicate, Matcher};

/// Raw text of every block found in a report, keyed by block type.
///
/// Single-line blocks borrow from the input; multi-line captures are joined
/// with `\n` and include both boundary lines.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BlockMatches<'a> {
    blocks: HashMap<BlockKind, Cow<'a, str>>,
}

impl<'a> BlockMatches<'a> {
    pub fn get(&self, kind: BlockKind) -> Option<&str> {
        self.blocks.get(&kind).map(|raw| raw.as_ref())
    }

    pub fn contains(&self, kind: BlockKind) -> bool {
        self.blocks.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Block types present, sorted by [`BlockKind`] (not by registry order).
    pub fn kinds(&self) -> Vec<BlockKind> {
        let mut kinds: Vec<_> = self.blocks.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }

    fn record(&mut self, kind: BlockKind, raw: Cow<'a, str>) {
        // wrk2 -U repeats the distribution blocks for uncorrected latency;
        // the first (corrected) occurrence is the one kept.
        if self.blocks.contains_key(&kind) {
            trace!(%kind, "ignoring repeated block");
            return;
        }
        trace!(%kind, bytes = raw.len(), "captured block");
        self.blocks.insert(kind, raw);
    }
}

struct OpenRegion<'a> {
    kind: BlockKind,
    closes: LinePredicate,
    lines: Vec<&'a str>,
}

/// Scans `raw` line by line against `registry`.
///
/// Blocks that never appear are simply absent from the result. A region whose
/// closing line is never seen is dropped.
pub fn extract_blocks<'a>(raw: &'a str, registry: &GrammarRegistry) -> BlockMatches<'a> {
    let mut matches = BlockMatches::default();
    let mut open: Option<OpenRegion<'a>> = None;

    for line in raw.lines() {
        if let Some(region) = open.as_mut() {
            region.lines.push(line);
            if (region.closes)(line) {
                if let Some(region) = open.take() {
                    matches.record(region.kind, Cow::Owned(region.lines.join("\n")));
                }
            }
            continue;
        }

        for (kind, matcher) in registry.iter() {
            match matcher {
                Matcher::Line(pattern) => {
                    if pattern.is_match(line) {
                        matches.record(*kind, Cow::Borrowed(line));
                        break;
                    }
                }
                Matcher::Region { opens, closes } => {
                    if opens(line) {
                        open = Some(OpenRegion {
                            kind: *kind,
                            closes: *closes,
                            lines: vec![line],
                        });
                        break;
                    }
                }
            }
        }
    }

    if let Some(region) = open {
        debug!(
            kind = %region.kind,
            lines = region.lines.len(),
            "report ended inside an unterminated block; dropping it"
        );
    }

    matches
}
