// Numan Thabit 2025
#![forbid(unsafe_code)]
//! wrk-output: turns the captured stdout of `wrk`/`wrk2` into a typed record.
//!
//! Parsing runs in three stages: [`extract::extract_blocks`] splits the report
//! into raw blocks using the ordered [`grammar::GrammarRegistry`], one
//! [`blocks::BlockParser`] per block type produces typed sub-results, and
//! [`BenchmarkOutput::parse`] assembles them. The engine is synchronous and
//! holds no shared mutable state.

pub mod blocks;
pub mod distribution;
pub mod error;
pub mod extract;
pub mod goals;
pub mod grammar;
pub mod numeric;
pub mod output;
pub mod scalar;

pub use blocks::{
    LatencySummary, RequestsPerThread, SocketErrors, ThreadsConnections, TotalRequests,
};
pub use distribution::{
    DetailedPercentileSpectrum, DistributionKind, LatencyDistribution, Percentiles, SpectrumRow,
};
pub use error::{GrammarError, OutputError, ParseFailure};
pub use goals::{evaluate_goals, GoalConfig, GoalError, GoalResult, PerformanceGoal};
pub use grammar::BlockKind;
pub use numeric::{Numeric, Sentinel};
pub use output::{BenchmarkOutput, ParseOptions};
pub use scalar::{ByteValue, TimeValue};
