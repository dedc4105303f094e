// Numan Thabit 2025
//! Typed results for the single-line blocks of a report.

use std::str::FromStr;

use regex::{Captures, Regex};
use serde::Serialize;

use crate::{
    error::ParseFailure,
    grammar::{
        BlockKind, HEADER_RE, LATENCY_RE, NOT_SUCCESSFUL_RE, REQUESTS_PER_THREAD_RE,
        REQUESTS_SUMMARY_RE, SOCKET_ERRORS_RE, THREADS_RE, TOTAL_REQUESTS_RE,
        TRANSFER_SUMMARY_RE,
    },
    numeric::Numeric,
    scalar::{ByteValue, TimeValue},
};

/// Conversion of one block's raw text into its typed result.
pub trait BlockParser: Sized {
    const KIND: BlockKind;

    fn parse_block(raw: &str) -> Result<Self, ParseFailure>;
}

/// `Running 30s test @ https://foo.org/`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Header {
    pub duration: TimeValue,
    pub url: String,
}

impl BlockParser for Header {
    const KIND: BlockKind = BlockKind::Header;

    fn parse_block(raw: &str) -> Result<Self, ParseFailure> {
        let caps = captures::<Self>(&HEADER_RE, raw)?;
        Ok(Self {
            duration: TimeValue::new(field::<Self, f64>(&caps, "duration", raw)?, &caps["unit"]),
            url: caps["url"].to_string(),
        })
    }
}

/// `12 threads and 400 connections`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThreadsConnections {
    pub threads: u32,
    pub connections: u32,
}

impl BlockParser for ThreadsConnections {
    const KIND: BlockKind = BlockKind::ThreadsConnections;

    fn parse_block(raw: &str) -> Result<Self, ParseFailure> {
        let caps = captures::<Self>(&THREADS_RE, raw)?;
        Ok(Self {
            threads: field::<Self, _>(&caps, "threads", raw)?,
            connections: field::<Self, _>(&caps, "connections", raw)?,
        })
    }
}

/// Thread-level latency statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencySummary {
    pub avg: TimeValue,
    pub stdev: TimeValue,
    pub max: TimeValue,
    /// Share of samples within one standard deviation, in percent.
    pub stdev_perc: f64,
}

impl BlockParser for LatencySummary {
    const KIND: BlockKind = BlockKind::Latency;

    fn parse_block(raw: &str) -> Result<Self, ParseFailure> {
        let caps = captures::<Self>(&LATENCY_RE, raw)?;
        let time = |value: &str, unit: &str| -> Result<TimeValue, ParseFailure> {
            Ok(TimeValue::new(field::<Self, f64>(&caps, value, raw)?, &caps[unit]))
        };
        Ok(Self {
            avg: time("avg", "avg_unit")?,
            stdev: time("stdev", "stdev_unit")?,
            max: time("max", "max_unit")?,
            stdev_perc: field::<Self, _>(&caps, "stdev_pct", raw)?,
        })
    }
}

/// Thread-level request rate statistics (`Req/Sec` row).
///
/// A run without samples prints `-nan`, kept as a sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RequestsPerThread {
    pub avg: Numeric<f64>,
    pub stdev: Numeric<f64>,
    pub max: Numeric<f64>,
    pub stdev_perc: Numeric<f64>,
}

impl BlockParser for RequestsPerThread {
    const KIND: BlockKind = BlockKind::RequestsPerThread;

    fn parse_block(raw: &str) -> Result<Self, ParseFailure> {
        let caps = captures::<Self>(&REQUESTS_PER_THREAD_RE, raw)?;
        let column = |name: &str| {
            parse_scaled(&caps[name]).ok_or_else(|| {
                ParseFailure::new(
                    Self::KIND,
                    format!("invalid {name} value '{}'", &caps[name]),
                    raw,
                )
            })
        };
        Ok(Self {
            avg: column("avg")?,
            stdev: column("stdev")?,
            max: column("max")?,
            stdev_perc: column("stdev_pct")?,
        })
    }
}

/// `4294 requests in 30.09s, 2.06MB read`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalRequests {
    pub requests: u64,
    pub duration: TimeValue,
    pub read: ByteValue,
}

impl BlockParser for TotalRequests {
    const KIND: BlockKind = BlockKind::TotalRequests;

    fn parse_block(raw: &str) -> Result<Self, ParseFailure> {
        let caps = captures::<Self>(&TOTAL_REQUESTS_RE, raw)?;
        Ok(Self {
            requests: field::<Self, _>(&caps, "requests", raw)?,
            duration: TimeValue::new(
                field::<Self, f64>(&caps, "duration", raw)?,
                &caps["duration_unit"],
            ),
            read: ByteValue::new(field::<Self, f64>(&caps, "read", raw)?, &caps["read_unit"]),
        })
    }
}

/// `Requests/sec:     59.61`, or a sentinel when nothing completed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RequestsSummary(pub Numeric<f64>);

impl BlockParser for RequestsSummary {
    const KIND: BlockKind = BlockKind::RequestsSummary;

    fn parse_block(raw: &str) -> Result<Self, ParseFailure> {
        let caps = captures::<Self>(&REQUESTS_SUMMARY_RE, raw)?;
        let token = &caps["value"];
        Numeric::parse(token).map(Self).ok_or_else(|| {
            ParseFailure::new(Self::KIND, format!("invalid value '{token}'"), raw)
        })
    }
}

/// `Transfer/sec:     29.28KB`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferSummary(pub ByteValue);

impl BlockParser for TransferSummary {
    const KIND: BlockKind = BlockKind::TransferSummary;

    fn parse_block(raw: &str) -> Result<Self, ParseFailure> {
        let caps = captures::<Self>(&TRANSFER_SUMMARY_RE, raw)?;
        Ok(Self(ByteValue::new(
            field::<Self, f64>(&caps, "value", raw)?,
            &caps["unit"],
        )))
    }
}

/// Socket-level failures. `wrk` only prints this line when one is non-zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SocketErrors {
    pub connect_errors: u64,
    pub read_errors: u64,
    pub write_errors: u64,
    pub timeout_errors: u64,
}

impl SocketErrors {
    pub fn total(&self) -> u64 {
        self.connect_errors
            .saturating_add(self.read_errors)
            .saturating_add(self.write_errors)
            .saturating_add(self.timeout_errors)
    }
}

impl BlockParser for SocketErrors {
    const KIND: BlockKind = BlockKind::SocketErrors;

    fn parse_block(raw: &str) -> Result<Self, ParseFailure> {
        let caps = captures::<Self>(&SOCKET_ERRORS_RE, raw)?;
        Ok(Self {
            connect_errors: field::<Self, _>(&caps, "connect", raw)?,
            read_errors: field::<Self, _>(&caps, "read", raw)?,
            write_errors: field::<Self, _>(&caps, "write", raw)?,
            timeout_errors: field::<Self, _>(&caps, "timeout", raw)?,
        })
    }
}

/// `Non-2xx or 3xx responses: 2400`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NotSuccessfulResponses(pub u64);

impl BlockParser for NotSuccessfulResponses {
    const KIND: BlockKind = BlockKind::NotSuccessfulResponses;

    fn parse_block(raw: &str) -> Result<Self, ParseFailure> {
        let caps = captures::<Self>(&NOT_SUCCESSFUL_RE, raw)?;
        field::<Self, _>(&caps, "count", raw).map(Self)
    }
}

pub(crate) fn captures<'t, P: BlockParser>(
    pattern: &Regex,
    raw: &'t str,
) -> Result<Captures<'t>, ParseFailure> {
    pattern.captures(raw).ok_or_else(|| {
        ParseFailure::new(
            P::KIND,
            format!("expected line matching `{}`", pattern.as_str()),
            raw,
        )
    })
}

fn field<P: BlockParser, T: FromStr>(
    caps: &Captures<'_>,
    name: &str,
    raw: &str,
) -> Result<T, ParseFailure>
where
    T::Err: std::fmt::Display,
{
    let token = caps.name(name).map(|m| m.as_str()).ok_or_else(|| {
        ParseFailure::new(P::KIND, format!("missing {name} field"), raw)
    })?;
    token.parse::<T>().map_err(|err| {
        ParseFailure::new(P::KIND, format!("invalid {name} value '{token}': {err}"), raw)
    })
}

/// Parses a `Req/Sec` column, which `wrk` scales with `k`/`M`/`G` suffixes.
fn parse_scaled(token: &str) -> Option<Numeric<f64>> {
    let (digits, scale) = match token.as_bytes().last()? {
        b'k' => (&token[..token.len() - 1], 1e3),
        b'M' => (&token[..token.len() - 1], 1e6),
        b'G' => (&token[..token.len() - 1], 1e9),
        _ => (token, 1.0),
    };
    match Numeric::<f64>::parse(digits)? {
        Numeric::Number(value) => Some(Numeric::Number(value * scale)),
        sentinel => Some(sentinel),
    }
}
