// Numan Thabit 2025
//! The aggregate record assembled from one captured report.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::{
    blocks::{
        BlockParser, Header, LatencySummary, NotSuccessfulResponses, RequestsPerThread,
        RequestsSummary, SocketErrors, ThreadsConnections, TotalRequests, TransferSummary,
    },
    distribution::{DetailedPercentileSpectrum, LatencyDistribution},
    error::{OutputError, ParseFailure},
    extract::{extract_blocks, BlockMatches},
    goals::GoalResult,
    grammar::{BlockKind, GrammarRegistry},
    numeric::Numeric,
    scalar::{ByteValue, TimeValue},
};

/// Identity and timing supplied by whoever captured the report.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Defaults to a fresh UUID v4.
    pub benchmark_id: Option<String>,
    pub suite_id: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

/// Structured result of one `wrk`/`wrk2` run.
///
/// Measurement fields are fixed at construction. Only the goal results and
/// the suite/timestamp annotations can change afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkOutput {
    id: String,
    #[serde(serialize_with = "serialize_lines")]
    raw_output: String,
    url: String,
    threads: u32,
    connections: u32,
    duration: TimeValue,
    latency: Option<LatencySummary>,
    latency_distribution: Option<LatencyDistribution>,
    requests_per_thread: Option<RequestsPerThread>,
    requests_per_second: Option<Numeric<f64>>,
    transfer_per_second: Option<ByteValue>,
    total: Option<TotalRequests>,
    socket_errors: Option<SocketErrors>,
    detailed_percentile_spectrum: Option<DetailedPercentileSpectrum>,
    not_successful_responses: u64,
    has_errors: bool,
    goals_results: Vec<GoalResult>,
    suite_id: Option<String>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
}

impl BenchmarkOutput {
    pub fn parse(raw_output: &str) -> Result<Self, OutputError> {
        Self::parse_with(raw_output, ParseOptions::default())
    }

    /// Parses trimmed `raw_output` with the standard grammar.
    ///
    /// Header and thread/connection lines are mandatory. Every other block is
    /// optional, but a block that is present and malformed fails the parse.
    pub fn parse_with(raw_output: &str, options: ParseOptions) -> Result<Self, OutputError> {
        let raw_output = raw_output.trim();
        let matches = extract_blocks(raw_output, GrammarRegistry::standard());
        Self::assemble(raw_output, &matches, options)
    }

    fn assemble(
        raw_output: &str,
        matches: &BlockMatches<'_>,
        options: ParseOptions,
    ) -> Result<Self, OutputError> {
        let header = required::<Header>(matches)?;
        let threads = required::<ThreadsConnections>(matches)?;

        let latency = optional::<LatencySummary>(matches)?;
        let latency_distribution = latency_distribution(matches)?;
        let socket_errors = optional::<SocketErrors>(matches)?;
        let requests_per_thread = optional::<RequestsPerThread>(matches)?;
        let requests_per_second = optional::<RequestsSummary>(matches)?.map(|rps| rps.0);
        let transfer_per_second = optional::<TransferSummary>(matches)?.map(|rate| rate.0);
        let total = optional::<TotalRequests>(matches)?;
        let not_successful_responses = optional::<NotSuccessfulResponses>(matches)?
            .map(|count| count.0)
            .unwrap_or(0);
        let detailed_percentile_spectrum = optional::<DetailedPercentileSpectrum>(matches)?;

        let has_errors = socket_errors.is_some() || not_successful_responses > 0;

        Ok(Self {
            id: options
                .benchmark_id
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            raw_output: raw_output.to_string(),
            url: header.url,
            threads: threads.threads,
            connections: threads.connections,
            duration: header.duration,
            latency,
            latency_distribution,
            requests_per_thread,
            requests_per_second,
            transfer_per_second,
            total,
            socket_errors,
            detailed_percentile_spectrum,
            not_successful_responses,
            has_errors,
            goals_results: Vec::new(),
            suite_id: options.suite_id,
            start_time: options.start_time,
            end_time: options.end_time,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn raw_output(&self) -> &str {
        &self.raw_output
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn threads(&self) -> u32 {
        self.threads
    }

    pub fn connections(&self) -> u32 {
        self.connections
    }

    pub fn duration(&self) -> &TimeValue {
        &self.duration
    }

    pub fn latency(&self) -> Option<&LatencySummary> {
        self.latency.as_ref()
    }

    pub fn latency_distribution(&self) -> Option<&LatencyDistribution> {
        self.latency_distribution.as_ref()
    }

    /// Thread-level `Req/Sec` statistics.
    pub fn requests_per_thread(&self) -> Option<&RequestsPerThread> {
        self.requests_per_thread.as_ref()
    }

    /// Overall `Requests/sec` figure; a sentinel when `wrk` printed one.
    pub fn requests_per_second(&self) -> Option<Numeric<f64>> {
        self.requests_per_second
    }

    pub fn transfer_per_second(&self) -> Option<&ByteValue> {
        self.transfer_per_second.as_ref()
    }

    pub fn total(&self) -> Option<&TotalRequests> {
        self.total.as_ref()
    }

    pub fn socket_errors(&self) -> Option<&SocketErrors> {
        self.socket_errors.as_ref()
    }

    pub fn detailed_percentile_spectrum(&self) -> Option<&DetailedPercentileSpectrum> {
        self.detailed_percentile_spectrum.as_ref()
    }

    /// Responses outside 2xx/3xx; 0 when the report has no such line.
    pub fn not_successful_responses(&self) -> u64 {
        self.not_successful_responses
    }

    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    pub fn goals_results(&self) -> &[GoalResult] {
        &self.goals_results
    }

    pub fn push_goal_result(&mut self, result: GoalResult) {
        self.goals_results.push(result);
    }

    pub fn suite_id(&self) -> Option<&str> {
        self.suite_id.as_deref()
    }

    pub fn set_suite_id(&mut self, suite_id: impl Into<String>) {
        self.suite_id = Some(suite_id.into());
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    pub fn set_start_time(&mut self, start_time: DateTime<Utc>) {
        self.start_time = Some(start_time);
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    pub fn set_end_time(&mut self, end_time: DateTime<Utc>) {
        self.end_time = Some(end_time);
    }
}

fn required<T: BlockParser>(matches: &BlockMatches<'_>) -> Result<T, OutputError> {
    let raw = matches
        .get(T::KIND)
        .ok_or(OutputError::MissingBlock(T::KIND))?;
    Ok(T::parse_block(raw)?)
}

fn optional<T: BlockParser>(matches: &BlockMatches<'_>) -> Result<Option<T>, ParseFailure> {
    matches.get(T::KIND).map(T::parse_block).transpose()
}

// The two variants never both open on the same line; basic wins if a report
// somehow carries both.
fn latency_distribution(
    matches: &BlockMatches<'_>,
) -> Result<Option<LatencyDistribution>, ParseFailure> {
    if let Some(raw) = matches.get(BlockKind::LatencyDistribution) {
        return LatencyDistribution::parse_basic(raw).map(Some);
    }
    matches
        .get(BlockKind::HdrHistogramDistribution)
        .map(LatencyDistribution::parse_histogram)
        .transpose()
}

fn serialize_lines<S: Serializer>(raw: &str, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(raw.lines())
}
