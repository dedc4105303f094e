// Numan Thabit 2025
//! Performance goals evaluated against a parsed [`BenchmarkOutput`].

use serde::{Deserialize, Serialize};

use crate::output::BenchmarkOutput;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GoalError {
    #[error("{0} was not found in the benchmark output")]
    NotParsed(&'static str),
    #[error(
        "percentile {percentile} is not found among output percentiles {available:?}; \
         configure goals to use percentiles reported by wrk"
    )]
    PercentileNotFound { percentile: f64, available: Vec<f64> },
    #[error("{field} uses unit '{unit}', which cannot be converted to milliseconds")]
    CannotNormalize { field: &'static str, unit: String },
    #[error("{field} is undefined in the benchmark output ({token})")]
    Undefined { field: &'static str, token: String },
}

/// A condition a benchmark run must satisfy.
pub trait PerformanceGoal: Send + Sync {
    /// Kebab-case identifier, also used as the `type` tag in configuration.
    fn type_name(&self) -> &'static str;

    fn describe(&self) -> String;

    fn is_satisfied(&self, output: &BenchmarkOutput) -> Result<bool, GoalError>;
}

/// Outcome of one goal check, stored on the benchmark output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalResult {
    pub success: bool,
    pub goal: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Evaluates every goal and appends the results to `output`.
///
/// A goal that cannot be evaluated is recorded as failed with its reason.
pub fn evaluate_goals(output: &mut BenchmarkOutput, goals: &[Box<dyn PerformanceGoal>]) {
    for goal in goals {
        let result = match goal.is_satisfied(output) {
            Ok(success) => GoalResult {
                success,
                goal: goal.describe(),
                error: None,
            },
            Err(err) => GoalResult {
                success: false,
                goal: goal.describe(),
                error: Some(err.to_string()),
            },
        };
        output.push_goal_result(result);
    }
}

/// Satisfied when the report has no `Socket errors` line.
///
/// Timeouts count as socket errors, so a short `--timeout` trips this goal.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSocketErrorsGoal;

impl PerformanceGoal for NoSocketErrorsGoal {
    fn type_name(&self) -> &'static str {
        "no-socket-errors"
    }

    fn describe(&self) -> String {
        "No socket errors".to_string()
    }

    fn is_satisfied(&self, output: &BenchmarkOutput) -> Result<bool, GoalError> {
        Ok(output.socket_errors().is_none())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoFailedRequestsGoal;

impl PerformanceGoal for NoFailedRequestsGoal {
    fn type_name(&self) -> &'static str {
        "no-failed-requests"
    }

    fn describe(&self) -> String {
        "No responses with status not in 2xx or 3xx".to_string()
    }

    fn is_satisfied(&self, output: &BenchmarkOutput) -> Result<bool, GoalError> {
        Ok(output.not_successful_responses() == 0)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoErrorsGoal;

impl PerformanceGoal for NoErrorsGoal {
    fn type_name(&self) -> &'static str {
        "no-errors"
    }

    fn describe(&self) -> String {
        "No socket errors and no responses with status not in 2xx or 3xx".to_string()
    }

    fn is_satisfied(&self, output: &BenchmarkOutput) -> Result<bool, GoalError> {
        Ok(!output.has_errors())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RequestsPerSecondGoal {
    pub minimum: f64,
}

impl PerformanceGoal for RequestsPerSecondGoal {
    fn type_name(&self) -> &'static str {
        "requests-per-second"
    }

    fn describe(&self) -> String {
        format!(
            "The minimum amount of handled requests per second is {}",
            self.minimum
        )
    }

    fn is_satisfied(&self, output: &BenchmarkOutput) -> Result<bool, GoalError> {
        let rps = output
            .requests_per_second()
            .ok_or(GoalError::NotParsed("requests/sec"))?;
        let value = rps.as_number().ok_or_else(|| GoalError::Undefined {
            field: "requests/sec",
            token: rps.to_string(),
        })?;
        Ok(value >= self.minimum)
    }
}

/// Average latency must not exceed `limit_ms`.
#[derive(Debug, Clone, Copy)]
pub struct AverageLatencyGoal {
    pub limit_ms: f64,
}

impl PerformanceGoal for AverageLatencyGoal {
    fn type_name(&self) -> &'static str {
        "avg-latency"
    }

    fn describe(&self) -> String {
        format!(
            "Average latency for web requests must be less than {} ms",
            self.limit_ms
        )
    }

    fn is_satisfied(&self, output: &BenchmarkOutput) -> Result<bool, GoalError> {
        let latency = output.latency().ok_or(GoalError::NotParsed("latency"))?;
        let avg = latency.avg.ms().ok_or_else(|| GoalError::CannotNormalize {
            field: "average latency",
            unit: latency.avg.unit().to_string(),
        })?;
        Ok(avg <= self.limit_ms)
    }
}

/// Latency at an exact reported percentile must not exceed `limit_ms`.
#[derive(Debug, Clone, Copy)]
pub struct PercentileLatencyGoal {
    pub percentile: f64,
    pub limit_ms: f64,
}

impl PerformanceGoal for PercentileLatencyGoal {
    fn type_name(&self) -> &'static str {
        "percentile-latency"
    }

    fn describe(&self) -> String {
        format!(
            "The {} percentile latency of web requests must be less than {} ms",
            self.percentile, self.limit_ms
        )
    }

    fn is_satisfied(&self, output: &BenchmarkOutput) -> Result<bool, GoalError> {
        let distribution = output
            .latency_distribution()
            .ok_or(GoalError::NotParsed("latency distribution"))?;
        let value =
            distribution
                .get(self.percentile)
                .ok_or_else(|| GoalError::PercentileNotFound {
                    percentile: self.percentile,
                    available: distribution.percentiles().keys(),
                })?;
        let ms = value.ms().ok_or_else(|| GoalError::CannotNormalize {
            field: "percentile latency",
            unit: value.unit().to_string(),
        })?;
        Ok(ms <= self.limit_ms)
    }
}

/// Goal declaration as read from a configuration file.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum GoalConfig {
    NoSocketErrors,
    NoFailedRequests,
    NoErrors,
    RequestsPerSecond { minimum: f64 },
    AvgLatency { limit: f64 },
    PercentileLatency { percentile: f64, limit: f64 },
}

impl GoalConfig {
    pub fn build(&self) -> Box<dyn PerformanceGoal> {
        match *self {
            Self::NoSocketErrors => Box::new(NoSocketErrorsGoal),
            Self::NoFailedRequests => Box::new(NoFailedRequestsGoal),
            Self::NoErrors => Box::new(NoErrorsGoal),
            Self::RequestsPerSecond { minimum } => Box::new(RequestsPerSecondGoal { minimum }),
            Self::AvgLatency { limit } => Box::new(AverageLatencyGoal { limit_ms: limit }),
            Self::PercentileLatency { percentile, limit } => Box::new(PercentileLatencyGoal {
                percentile,
                limit_ms: limit,
            }),
        }
    }
}
