// Numan Thabit 2025
mod config;

use std::{
    fs::{self, OpenOptions},
    io::BufWriter,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use humantime::format_duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wrk_output::{evaluate_goals, BenchmarkOutput, GoalConfig, ParseOptions, PerformanceGoal};

use crate::config::{CliArgs, Config};

fn main() -> Result<()> {
    let cli = CliArgs::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_cli(&cli)?;
    let goals: Vec<Box<dyn PerformanceGoal>> = config.goals.iter().map(GoalConfig::build).collect();

    let mut outputs = Vec::with_capacity(config.inputs.len());
    for input in &config.inputs {
        let output = load_report(input, &config, &goals)?;
        log_report(input, &output);
        if config.write_json {
            let path = write_report(&config.output_dir, input, &output)?;
            info!(path = %path.display(), "persisted benchmark output");
        }
        outputs.push(output);
    }

    log_aggregate_metrics(&outputs);

    let unmet = unmet_goals(&outputs);
    if unmet > 0 {
        if config.fail_on_goals {
            bail!("{unmet} performance goal(s) not satisfied");
        }
        warn!(unmet, "some performance goals were not satisfied");
    }

    Ok(())
}

fn load_report(
    input: &Path,
    config: &Config,
    goals: &[Box<dyn PerformanceGoal>],
) -> Result<BenchmarkOutput> {
    let raw = fs::read_to_string(input)
        .with_context(|| format!("failed to read wrk output {}", input.display()))?;
    let end_time = fs::metadata(input)
        .and_then(|meta| meta.modified())
        .ok()
        .map(DateTime::<Utc>::from);

    let options = ParseOptions {
        suite_id: config.suite_id.clone(),
        end_time,
        ..ParseOptions::default()
    };
    let mut output = BenchmarkOutput::parse_with(&raw, options)
        .with_context(|| format!("failed to parse wrk output {}", input.display()))?;
    evaluate_goals(&mut output, goals);
    Ok(output)
}

fn format_millis(ms: f64) -> String {
    let micros = (ms * 1000.0).round().max(0.0) as u64;
    format!("{}", format_duration(Duration::from_micros(micros)))
}

fn p99_millis(output: &BenchmarkOutput) -> Option<f64> {
    output
        .latency_distribution()
        .and_then(|distribution| distribution.get(99.0))
        .and_then(|value| value.ms())
}

fn log_report(input: &Path, output: &BenchmarkOutput) {
    let avg_latency = output
        .latency()
        .and_then(|latency| latency.avg.ms())
        .map(format_millis)
        .unwrap_or_else(|| "<n/a>".to_string());
    let p99_latency = p99_millis(output)
        .map(format_millis)
        .unwrap_or_else(|| "<n/a>".to_string());
    let requests_per_sec = output
        .requests_per_second()
        .map(|rps| rps.to_string())
        .unwrap_or_else(|| "<n/a>".to_string());

    info!(
        input = %input.display(),
        id = output.id(),
        url = output.url(),
        threads = output.threads(),
        connections = output.connections(),
        requests_per_sec = %requests_per_sec,
        avg_latency = %avg_latency,
        p99_latency = %p99_latency,
        has_errors = output.has_errors(),
        "wrk output parsed"
    );

    if let Some(errors) = output.socket_errors() {
        warn!(
            connect = errors.connect_errors,
            read = errors.read_errors,
            write = errors.write_errors,
            timeout = errors.timeout_errors,
            "socket errors reported"
        );
    }

    for result in output.goals_results() {
        if result.success {
            info!(goal = %result.goal, "goal satisfied");
        } else {
            warn!(
                goal = %result.goal,
                error = result.error.as_deref().unwrap_or("threshold exceeded"),
                "goal not satisfied"
            );
        }
    }
}

fn log_aggregate_metrics(outputs: &[BenchmarkOutput]) {
    if outputs.len() < 2 {
        return;
    }

    let rps: Vec<f64> = outputs
        .iter()
        .filter_map(|output| output.requests_per_second()?.as_number())
        .collect();
    if !rps.is_empty() {
        info!(
            reports = rps.len(),
            avg_requests_per_sec = rps.iter().sum::<f64>() / rps.len() as f64,
            "wrk average throughput"
        );
    }

    let mut p99_values: Vec<f64> = outputs.iter().filter_map(p99_millis).collect();
    if !p99_values.is_empty() {
        p99_values.sort_unstable_by(f64::total_cmp);
        let median = p99_values[p99_values.len() / 2];
        info!(
            reports = p99_values.len(),
            median_p99_latency = %format_millis(median),
            "wrk median p99 latency"
        );
    }
}

fn unmet_goals(outputs: &[BenchmarkOutput]) -> usize {
    outputs
        .iter()
        .flat_map(BenchmarkOutput::goals_results)
        .filter(|result| !result.success)
        .count()
}

fn report_file_name(input: &Path, output: &BenchmarkOutput) -> String {
    let stem = input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or("wrk");
    let timestamp = output.end_time().unwrap_or_else(Utc::now);
    format!(
        "{stem}-{}-{}.json",
        timestamp.format("%Y-%m-%d-%H-%M-%S"),
        output.id()
    )
}

fn write_report(dir: &Path, input: &Path, output: &BenchmarkOutput) -> Result<PathBuf> {
    if !dir.as_os_str().is_empty() {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
    }

    let path = dir.join(report_file_name(input, output));
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&path)
        .with_context(|| format!("failed to open output path {}", path.display()))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, output)
        .with_context(|| format!("failed to write benchmark output to {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    const REPORT: &str = "Running 10s test @ http://localhost:8080/
  2 threads and 10 connections
  Thread Stats   Avg      Stdev     Max   +/- Stdev
    Latency     1.20ms  300.00us   9.87ms   88.00%
    Req/Sec     4.10k   220.00     4.60k    71.00%
  Latency Distribution
     50%    1.10ms
     75%    1.30ms
     90%    1.60ms
     99%    2.50ms
  81234 requests in 10.00s, 9.87MB read
Requests/sec:   8123.40
Transfer/sec:      0.99MB";

    fn parsed() -> BenchmarkOutput {
        let end_time = Utc.with_ymd_and_hms(2024, 3, 9, 17, 4, 5).single();
        BenchmarkOutput::parse_with(
            REPORT,
            ParseOptions {
                benchmark_id: Some("run-1".to_string()),
                end_time,
                ..ParseOptions::default()
            },
        )
        .expect("parsed")
    }

    #[test]
    fn format_millis_uses_humantime() {
        assert_eq!(format_millis(2.5), "2ms 500us");
        assert_eq!(format_millis(1500.0), "1s 500ms");
    }

    #[test]
    fn report_file_name_carries_stem_time_and_id() {
        let name = report_file_name(Path::new("runs/login.txt"), &parsed());
        assert_eq!(name, "login-2024-03-09-17-04-05-run-1.json");
    }

    #[test]
    fn write_report_creates_directory_and_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("nested");
        let path = write_report(&target, Path::new("login.txt"), &parsed()).expect("written");

        let raw = fs::read_to_string(&path).expect("read back");
        let json: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(json["id"], "run-1");
        assert_eq!(json["requests_per_second"], 8123.4);
        assert_eq!(json["raw_output"][1], "  2 threads and 10 connections");
    }

    #[test]
    fn unmet_goals_counts_failed_results() {
        let mut output = parsed();
        let goals: Vec<Box<dyn PerformanceGoal>> = [
            GoalConfig::RequestsPerSecond { minimum: 10_000.0 },
            GoalConfig::PercentileLatency {
                percentile: 99.0,
                limit: 3.0,
            },
            GoalConfig::NoErrors,
        ]
        .iter()
        .map(GoalConfig::build)
        .collect();
        evaluate_goals(&mut output, &goals);

        assert_eq!(unmet_goals(&[output]), 1);
        assert_eq!(p99_millis(&parsed()), Some(2.5));
    }
}
