// Numan Thabit 2025
//! Declarative grammar of the blocks found in a `wrk`/`wrk2` report.
//!
//! Single-line blocks are recognized by an anchored pattern. Multi-line blocks
//! are recognized by a pair of predicates: one for the opening line and one
//! for the (inclusive) closing line. The registry keeps declaration order,
//! which is also the tie-break order when several grammars accept a line.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::error::GrammarError;

/// Every block type the extractor knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Header,
    ThreadsConnections,
    SocketErrors,
    Latency,
    LatencyDistribution,
    HdrHistogramDistribution,
    RequestsSummary,
    TransferSummary,
    RequestsPerThread,
    TotalRequests,
    NotSuccessfulResponses,
    DetailedPercentileSpectrum,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::ThreadsConnections => "threads/connections",
            Self::SocketErrors => "socket errors",
            Self::Latency => "latency",
            Self::LatencyDistribution => "latency distribution",
            Self::HdrHistogramDistribution => "HdrHistogram latency distribution",
            Self::RequestsSummary => "requests/sec",
            Self::TransferSummary => "transfer/sec",
            Self::RequestsPerThread => "req/sec",
            Self::TotalRequests => "total requests",
            Self::NotSuccessfulResponses => "non-2xx or 3xx responses",
            Self::DetailedPercentileSpectrum => "detailed percentile spectrum",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Running 30s test @ https://foo.org/
pub(crate) static HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*Running\s+(?P<duration>\d+(?:\.\d+)?)(?P<unit>[a-z]+)\s+test\s+@\s+(?P<url>\S+)\s*$")
        .expect("header pattern")
});

// 12 threads and 400 connections
pub(crate) static THREADS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?P<threads>\d+)\s+threads\s+and\s+(?P<connections>\d+)\s+connections\s*$")
        .expect("threads pattern")
});

// Socket errors: connect 0, read 0, write 0, timeout 1463
pub(crate) static SOCKET_ERRORS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*Socket errors:\s+connect\s+(?P<connect>\d+),\s+read\s+(?P<read>\d+),\s+write\s+(?P<write>\d+),\s+timeout\s+(?P<timeout>\d+)\s*$",
    )
    .expect("socket errors pattern")
});

// Latency   196.94ms  183.71ms 944.41ms   89.18%
pub(crate) static LATENCY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*Latency\s+(?P<avg>[\d.]+)(?P<avg_unit>[A-Za-z]+)\s+(?P<stdev>[\d.]+)(?P<stdev_unit>[A-Za-z]+)\s+(?P<max>[\d.]+)(?P<max_unit>[A-Za-z]+)\s+(?P<stdev_pct>[\d.]+)%\s*$",
    )
    .expect("latency pattern")
});

// Requests/sec:     59.61
pub(crate) static REQUESTS_SUMMARY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*Requests/sec:\s+(?P<value>[\d.]+|-?nan|-?inf)\s*$")
        .expect("requests/sec pattern")
});

// Transfer/sec:     29.28KB
pub(crate) static TRANSFER_SUMMARY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*Transfer/sec:\s+(?P<value>[\d.]+)(?P<unit>[A-Za-z]+)\s*$")
        .expect("transfer/sec pattern")
});

// Req/Sec     7.65      2.98    10.00     71.19%
pub(crate) static REQUESTS_PER_THREAD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*Req/Sec\s+(?P<avg>[^\s%]+)\s+(?P<stdev>[^\s%]+)\s+(?P<max>[^\s%]+)\s+(?P<stdev_pct>[^\s%]+)%\s*$",
    )
    .expect("req/sec pattern")
});

// 4294 requests in 30.09s, 2.06MB read
pub(crate) static TOTAL_REQUESTS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?P<requests>\d+)\s+requests\s+in\s+(?P<duration>[\d.]+)(?P<duration_unit>[A-Za-z]+),\s+(?P<read>[\d.]+)(?P<read_unit>[A-Za-z]+)\s+read\s*$",
    )
    .expect("total requests pattern")
});

// Non-2xx or 3xx responses: 2400
pub(crate) static NOT_SUCCESSFUL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*Non-2xx or 3xx responses:\s+(?P<count>\d+)\s*$")
        .expect("non-2xx pattern")
});

pub fn latency_distribution_opens(line: &str) -> bool {
    line.contains("Latency Distribution") && !line.contains("HdrHistogram")
}

pub fn latency_distribution_closes(line: &str) -> bool {
    line.contains("99% ")
}

pub fn hdr_histogram_opens(line: &str) -> bool {
    line.contains("Latency Distribution") && line.contains("HdrHistogram")
}

pub fn hdr_histogram_closes(line: &str) -> bool {
    line.contains("100.000% ")
}

pub fn spectrum_opens(line: &str) -> bool {
    line.contains("Detailed Percentile spectrum")
}

pub fn spectrum_closes(line: &str) -> bool {
    line.trim_start().starts_with("#[Buckets")
}

pub type LinePredicate = fn(&str) -> bool;

/// A block declaration as written in a grammar table.
///
/// Either `pattern` or the pair `line_matches`/`last_line_matches` must be
/// set; [`GrammarRegistry::new`] rejects anything else.
#[derive(Debug, Clone, Copy)]
pub struct BlockGrammar {
    pub kind: BlockKind,
    pub pattern: Option<&'static Regex>,
    pub line_matches: Option<LinePredicate>,
    pub last_line_matches: Option<LinePredicate>,
}

impl BlockGrammar {
    pub const fn line(kind: BlockKind, pattern: &'static Regex) -> Self {
        Self {
            kind,
            pattern: Some(pattern),
            line_matches: None,
            last_line_matches: None,
        }
    }

    pub const fn region(
        kind: BlockKind,
        line_matches: LinePredicate,
        last_line_matches: LinePredicate,
    ) -> Self {
        Self {
            kind,
            pattern: None,
            line_matches: Some(line_matches),
            last_line_matches: Some(last_line_matches),
        }
    }
}

/// How the extractor recognizes one block type.
#[derive(Debug, Clone, Copy)]
pub enum Matcher {
    Line(&'static Regex),
    Region {
        opens: LinePredicate,
        closes: LinePredicate,
    },
}

/// Ordered, validated set of block grammars.
#[derive(Debug, Clone)]
pub struct GrammarRegistry {
    entries: Vec<(BlockKind, Matcher)>,
}

static STANDARD: Lazy<GrammarRegistry> = Lazy::new(|| {
    GrammarRegistry::new(standard_grammar()).expect("standard grammar is well formed")
});

impl GrammarRegistry {
    pub fn new(grammar: impl IntoIterator<Item = BlockGrammar>) -> Result<Self, GrammarError> {
        let entries = grammar
            .into_iter()
            .map(|block| Ok((block.kind, matcher_for(block)?)))
            .collect::<Result<Vec<_>, GrammarError>>()?;
        Ok(Self { entries })
    }

    /// Registry covering every block printed by `wrk` and `wrk2`.
    pub fn standard() -> &'static GrammarRegistry {
        &STANDARD
    }

    pub fn iter(&self) -> impl Iterator<Item = &(BlockKind, Matcher)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn matcher_for(block: BlockGrammar) -> Result<Matcher, GrammarError> {
    let kind = block.kind;
    match (block.pattern, block.line_matches, block.last_line_matches) {
        (Some(pattern), None, None) => Ok(Matcher::Line(pattern)),
        (None, Some(opens), Some(closes)) => Ok(Matcher::Region { opens, closes }),
        (None, None, None) => Err(GrammarError::NoMatcher { kind }),
        (None, Some(_), None) | (None, None, Some(_)) => {
            Err(GrammarError::UnpairedBoundary { kind })
        }
        (Some(_), _, _) => Err(GrammarError::AmbiguousMatcher { kind }),
    }
}

/// Declaration order is the tie-break order.
pub fn standard_grammar() -> Vec<BlockGrammar> {
    vec![
        BlockGrammar::line(BlockKind::Header, &HEADER_RE),
        BlockGrammar::line(BlockKind::ThreadsConnections, &THREADS_RE),
        BlockGrammar::line(BlockKind::SocketErrors, &SOCKET_ERRORS_RE),
        BlockGrammar::line(BlockKind::Latency, &LATENCY_RE),
        BlockGrammar::region(
            BlockKind::LatencyDistribution,
            latency_distribution_opens,
            latency_distribution_closes,
        ),
        BlockGrammar::region(
            BlockKind::HdrHistogramDistribution,
            hdr_histogram_opens,
            hdr_histogram_closes,
        ),
        BlockGrammar::line(BlockKind::RequestsSummary, &REQUESTS_SUMMARY_RE),
        BlockGrammar::line(BlockKind::TransferSummary, &TRANSFER_SUMMARY_RE),
        BlockGrammar::line(BlockKind::RequestsPerThread, &REQUESTS_PER_THREAD_RE),
        BlockGrammar::line(BlockKind::TotalRequests, &TOTAL_REQUESTS_RE),
        BlockGrammar::line(BlockKind::NotSuccessfulResponses, &NOT_SUCCESSFUL_RE),
        BlockGrammar::region(
            BlockKind::DetailedPercentileSpectrum,
            spectrum_opens,
            spectrum_closes,
        ),
    ]
}
