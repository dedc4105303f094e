// Numan Thabit 2025
use serde::Serialize;

use crate::grammar::BlockKind;

/// A recognized block whose contents did not have the expected shape.
///
/// Carries the block type it was meant to become and the raw text, so a
/// caller can report exactly which part of the report broke the grammar.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize)]
#[error("failed to parse {target} block: {message}")]
pub struct ParseFailure {
    pub message: String,
    pub target: BlockKind,
    pub raw: String,
}

impl ParseFailure {
    pub fn new(target: BlockKind, message: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            target,
            raw: raw.into(),
        }
    }
}

/// Failure to turn captured output into a [`crate::BenchmarkOutput`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum OutputError {
    #[error("not a wrk report: missing {0} line")]
    MissingBlock(BlockKind),
    #[error(transparent)]
    Block(#[from] ParseFailure),
}

/// Invalid block grammar declaration, detected when a registry is built.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    #[error("{kind} declares only one of `line_matches`/`last_line_matches`; define both")]
    UnpairedBoundary { kind: BlockKind },
    #[error("{kind} declares neither a line pattern nor region boundaries")]
    NoMatcher { kind: BlockKind },
    #[error("{kind} declares both a line pattern and region boundaries")]
    AmbiguousMatcher { kind: BlockKind },
}
