// Numan Thabit 2025
//! Multi-line blocks: latency percentiles and the HdrHistogram spectrum.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::{
    blocks::{captures, BlockParser},
    error::ParseFailure,
    grammar::BlockKind,
    numeric::Numeric,
    scalar::TimeValue,
};

const PERCENTILE_TOLERANCE: f64 = 0.0001;

// "     50%  129.15ms"
static BASIC_ROW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?P<percentile>\d+)%\s+(?P<value>[\d.]+)(?P<unit>[A-Za-z]+)\s*$")
        .expect("basic percentile row")
});

// " 99.900%  876.54ms"
static HISTOGRAM_ROW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?P<percentile>\d+\.\d+)%\s+(?P<value>[\d.]+)(?P<unit>[A-Za-z]+)\s*$")
        .expect("histogram percentile row")
});

static SPECTRUM_MEAN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#\[Mean\s*=\s*(?P<mean>[^,\s]+),\s*StdDeviation\s*=\s*(?P<stdev>[^\]\s]+)\]$")
        .expect("spectrum mean row")
});

static SPECTRUM_MAX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#\[Max\s*=\s*(?P<max>[^,\s]+),\s*Total count\s*=\s*(?P<total>[^\]\s]+)\]$")
        .expect("spectrum max row")
});

static SPECTRUM_BUCKETS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#\[Buckets\s*=\s*(?P<buckets>[^,\s]+),\s*SubBuckets\s*=\s*(?P<sub>[^\]\s]+)\]$")
        .expect("spectrum buckets row")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionKind {
    /// `wrk --latency`: integer percentiles 50/75/90/99.
    Basic,
    /// `wrk2`: fractional percentiles up to 100.000.
    Histogram,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PercentileValue {
    pub percentile: f64,
    pub latency: TimeValue,
}

/// Percentile to latency table, in report order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Percentiles(Vec<PercentileValue>);

impl Percentiles {
    pub fn get(&self, percentile: f64) -> Option<&TimeValue> {
        self.0
            .iter()
            .find(|entry| (entry.percentile - percentile).abs() < PERCENTILE_TOLERANCE)
            .map(|entry| &entry.latency)
    }

    pub fn keys(&self) -> Vec<f64> {
        self.0.iter().map(|entry| entry.percentile).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PercentileValue> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<PercentileValue> for Percentiles {
    fn from_iter<I: IntoIterator<Item = PercentileValue>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Latency percentiles, tagged with the report mode that produced them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LatencyDistribution {
    Basic {
        percentiles: Percentiles,
    },
    Histogram {
        /// Text inside the opener's parentheses, e.g.
        /// `HdrHistogram - Recorded Latency`.
        label: String,
        percentiles: Percentiles,
    },
}

impl LatencyDistribution {
    pub fn kind(&self) -> DistributionKind {
        match self {
            Self::Basic { .. } => DistributionKind::Basic,
            Self::Histogram { .. } => DistributionKind::Histogram,
        }
    }

    pub fn percentiles(&self) -> &Percentiles {
        match self {
            Self::Basic { percentiles } | Self::Histogram { percentiles, .. } => percentiles,
        }
    }

    pub fn get(&self, percentile: f64) -> Option<&TimeValue> {
        self.percentiles().get(percentile)
    }

    /// Parses a `Latency Distribution` block printed by `wrk --latency`.
    pub fn parse_basic(raw: &str) -> Result<Self, ParseFailure> {
        let percentiles =
            parse_percentile_rows(raw, &BASIC_ROW_RE, BlockKind::LatencyDistribution)?;
        Ok(Self::Basic { percentiles })
    }

    /// Parses a `Latency Distribution (HdrHistogram ...)` block printed by `wrk2`.
    ///
    /// Percentiles must be strictly increasing and end at 100%.
    pub fn parse_histogram(raw: &str) -> Result<Self, ParseFailure> {
        let kind = BlockKind::HdrHistogramDistribution;
        let percentiles = parse_percentile_rows(raw, &HISTOGRAM_ROW_RE, kind)?;

        let keys = percentiles.keys();
        if keys.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(ParseFailure::new(
                kind,
                "percentiles are not strictly increasing",
                raw,
            ));
        }
        if keys.last().map_or(true, |last| (last - 100.0).abs() >= PERCENTILE_TOLERANCE) {
            return Err(ParseFailure::new(kind, "distribution does not end at 100%", raw));
        }

        let label = raw
            .lines()
            .next()
            .and_then(|opener| {
                let start = opener.find('(')?;
                let end = opener.rfind(')')?;
                (start < end).then(|| opener[start + 1..end].trim().to_string())
            })
            .unwrap_or_else(|| "HdrHistogram".to_string());

        Ok(Self::Histogram { label, percentiles })
    }
}

fn parse_percentile_rows(
    raw: &str,
    row: &Regex,
    kind: BlockKind,
) -> Result<Percentiles, ParseFailure> {
    let mut rows = Vec::new();
    for line in raw.lines().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        let caps = row.captures(line).ok_or_else(|| {
            ParseFailure::new(kind, format!("unexpected percentile row '{}'", line.trim()), raw)
        })?;
        let percentile = caps["percentile"].parse::<f64>().map_err(|err| {
            ParseFailure::new(kind, format!("invalid percentile: {err}"), raw)
        })?;
        let value = caps["value"].parse::<f64>().map_err(|err| {
            ParseFailure::new(kind, format!("invalid latency '{}': {err}", &caps["value"]), raw)
        })?;
        rows.push(PercentileValue {
            percentile,
            latency: TimeValue::new(value, &caps["unit"]),
        });
    }
    if rows.is_empty() {
        return Err(ParseFailure::new(kind, "block has no percentile rows", raw));
    }
    Ok(Percentiles(rows))
}

/// One row of the `Detailed Percentile spectrum` table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpectrumRow {
    pub value: Numeric<f64>,
    pub percentile: Numeric<f64>,
    pub total_count: Numeric<u64>,
    /// The `1/(1-Percentile)` column; `inf` on the last row.
    pub inverse_percentile: Numeric<f64>,
}

/// Full HdrHistogram dump printed by `wrk2`, rows plus trailing summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailedPercentileSpectrum {
    pub rows: Vec<SpectrumRow>,
    pub mean: Numeric<f64>,
    pub standard_deviation: Numeric<f64>,
    pub max: Numeric<f64>,
    pub total_count: Numeric<u64>,
    pub buckets: Numeric<u64>,
    pub sub_buckets: Numeric<u64>,
}

impl BlockParser for DetailedPercentileSpectrum {
    const KIND: BlockKind = BlockKind::DetailedPercentileSpectrum;

    fn parse_block(raw: &str) -> Result<Self, ParseFailure> {
        let fail = |message: String| ParseFailure::new(Self::KIND, message, raw);
        let numeric_f64 = |token: &str, column: &str| {
            Numeric::<f64>::parse(token).ok_or_else(|| fail(format!("invalid {column} '{token}'")))
        };
        let numeric_u64 = |token: &str, column: &str| {
            Numeric::<u64>::parse(token).ok_or_else(|| fail(format!("invalid {column} '{token}'")))
        };

        let mut rows = Vec::new();
        let mut mean = None;
        let mut max = None;
        let mut buckets = None;

        for line in raw.lines().skip(1) {
            let line = line.trim();
            if line.is_empty() || line.starts_with("Value") {
                continue;
            }
            if line.starts_with("#[Mean") {
                let caps = captures::<Self>(&SPECTRUM_MEAN_RE, line)
                    .map_err(|err| fail(err.message))?;
                mean = Some((
                    numeric_f64(&caps["mean"], "mean")?,
                    numeric_f64(&caps["stdev"], "standard deviation")?,
                ));
                continue;
            }
            if line.starts_with("#[Max") {
                let caps = captures::<Self>(&SPECTRUM_MAX_RE, line)
                    .map_err(|err| fail(err.message))?;
                max = Some((
                    numeric_f64(&caps["max"], "max")?,
                    numeric_u64(&caps["total"], "total count")?,
                ));
                continue;
            }
            if line.starts_with("#[Buckets") {
                let caps = captures::<Self>(&SPECTRUM_BUCKETS_RE, line)
                    .map_err(|err| fail(err.message))?;
                buckets = Some((
                    numeric_u64(&caps["buckets"], "buckets")?,
                    numeric_u64(&caps["sub"], "sub-buckets")?,
                ));
                continue;
            }

            let columns: Vec<&str> = line.split_whitespace().collect();
            let [value, percentile, total_count, inverse] = columns[..] else {
                return Err(fail(format!(
                    "expected 4 columns, found {} in '{line}'",
                    columns.len()
                )));
            };
            rows.push(SpectrumRow {
                value: numeric_f64(value, "value")?,
                percentile: numeric_f64(percentile, "percentile")?,
                total_count: numeric_u64(total_count, "total count")?,
                inverse_percentile: numeric_f64(inverse, "1/(1-percentile)")?,
            });
        }

        if rows.is_empty() {
            return Err(fail("spectrum has no rows".to_string()));
        }
        let (mean, standard_deviation) =
            mean.ok_or_else(|| fail("missing #[Mean] summary".to_string()))?;
        let (max, total_count) = max.ok_or_else(|| fail("missing #[Max] summary".to_string()))?;
        let (buckets, sub_buckets) =
            buckets.ok_or_else(|| fail("missing #[Buckets] summary".to_string()))?;

        Ok(Self {
            rows,
            mean,
            standard_deviation,
            max,
            total_count,
            buckets,
            sub_buckets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::Sentinel;

    const HISTOGRAM: &str = "  Latency Distribution (HdrHistogram - Recorded Latency)
 50.000%  129.15ms
 75.000%  142.46ms
 90.000%  148.09ms
 99.000%  873.98ms
 99.900%  876.54ms
 99.990%  876.54ms
 99.999%  876.54ms
100.000%  876.54ms";

    const SPECTRUM: &str = "  Detailed Percentile spectrum:
       Value   Percentile   TotalCount 1/(1-Percentile)

     108.031     0.000000            1         1.00
     129.151     0.500000           40         2.00
     876.031     1.000000           80          inf
#[Mean    =      161.908, StdDeviation   =      150.488]
#[Max     =      876.032, Total count    =           80]
#[Buckets =           27, SubBuckets     =         2048]";

    #[test]
    fn basic_distribution_keeps_input_keys() {
        let raw = "  Latency Distribution\n     50%  111.84ms\n     75%  200.12ms\n     90%  333.50ms\n     99%  556.54ms";
        let distribution = LatencyDistribution::parse_basic(raw).expect("basic");
        assert_eq!(distribution.kind(), DistributionKind::Basic);
        assert_eq!(distribution.percentiles().keys(), vec![50.0, 75.0, 90.0, 99.0]);
        assert_eq!(distribution.get(90.0).and_then(TimeValue::ms), Some(333.5));
        assert!(distribution.get(55.0).is_none());
    }

    #[test]
    fn basic_distribution_rejects_fractional_rows() {
        let raw = "  Latency Distribution\n 50.000%  129.15ms\n 99.000%  873.98ms";
        let failure = LatencyDistribution::parse_basic(raw).expect_err("fractional row");
        assert_eq!(failure.target, BlockKind::LatencyDistribution);
    }

    #[test]
    fn histogram_distribution_ends_at_hundred() {
        let distribution = LatencyDistribution::parse_histogram(HISTOGRAM).expect("histogram");
        assert_eq!(distribution.kind(), DistributionKind::Histogram);
        let keys = distribution.percentiles().keys();
        assert_eq!(keys.len(), 8);
        assert!(keys.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(keys.last().copied(), Some(100.0));
        assert_eq!(distribution.get(99.9).and_then(TimeValue::ms), Some(876.54));
        match distribution {
            LatencyDistribution::Histogram { label, .. } => {
                assert_eq!(label, "HdrHistogram - Recorded Latency")
            }
            other => panic!("unexpected variant {other:?}"),
        }
    }

    #[test]
    fn histogram_requires_increasing_percentiles() {
        let raw = "  Latency Distribution (HdrHistogram - Recorded Latency)\n 90.000%  1.00ms\n 50.000%  1.00ms\n100.000%  2.00ms";
        let failure = LatencyDistribution::parse_histogram(raw).expect_err("unordered");
        assert!(failure.message.contains("strictly increasing"));
    }

    #[test]
    fn parses_spectrum_with_summary() {
        let spectrum = DetailedPercentileSpectrum::parse_block(SPECTRUM).expect("spectrum");
        assert_eq!(spectrum.rows.len(), 3);
        assert_eq!(spectrum.rows[1].total_count, Numeric::Number(40));
        assert_eq!(
            spectrum.rows[2].inverse_percentile,
            Numeric::Sentinel(Sentinel::Inf)
        );
        assert_eq!(spectrum.mean, Numeric::Number(161.908));
        assert_eq!(spectrum.standard_deviation, Numeric::Number(150.488));
        assert_eq!(spectrum.max, Numeric::Number(876.032));
        assert_eq!(spectrum.total_count, Numeric::Number(80));
        assert_eq!(spectrum.buckets, Numeric::Number(27));
        assert_eq!(spectrum.sub_buckets, Numeric::Number(2048));
    }

    #[test]
    fn spectrum_summary_may_hold_sentinels() {
        let raw = "  Detailed Percentile spectrum:
       Value   Percentile   TotalCount 1/(1-Percentile)

       0.000     1.000000            0          inf
#[Mean    =         -nan, StdDeviation   =         -nan]
#[Max     =        0.000, Total count    =            0]
#[Buckets =           27, SubBuckets     =         2048]";
        let spectrum = DetailedPercentileSpectrum::parse_block(raw).expect("spectrum");
        assert_eq!(spectrum.mean, Numeric::Sentinel(Sentinel::NegNan));
        assert!(spectrum.standard_deviation.is_sentinel());
    }

    #[test]
    fn spectrum_rejects_wrong_column_count() {
        let raw = SPECTRUM.replace(
            "     129.151     0.500000           40         2.00",
            "     129.151     0.500000",
        );
        let failure = DetailedPercentileSpectrum::parse_block(&raw).expect_err("short row");
        assert_eq!(failure.target, BlockKind::DetailedPercentileSpectrum);
        assert!(failure.message.contains("expected 4 columns"));
    }
}
