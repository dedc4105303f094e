// Numan Thabit 2025
use std::thread;

use wrk_output::{
    evaluate_goals, BenchmarkOutput, DistributionKind, GoalConfig, LatencyDistribution, Numeric,
    OutputError, Sentinel,
};

const WRK_LATENCY: &str = include_str!("fixtures/wrk_latency.txt");
const WRK2_HISTOGRAM: &str = include_str!("fixtures/wrk2_histogram.txt");
const WRK2_UNCORRECTED: &str = include_str!("fixtures/wrk2_uncorrected.txt");

#[test]
fn wrk_report_yields_basic_distribution() {
    let output = BenchmarkOutput::parse(WRK_LATENCY).expect("wrk report");

    assert_eq!(output.url(), "https://foo.org/api/cats?page=1");
    assert_eq!(output.threads(), 10);
    assert_eq!(output.connections(), 10);
    assert_eq!(output.duration().ms(), Some(5000.0));

    let distribution = output.latency_distribution().expect("distribution");
    assert_eq!(distribution.kind(), DistributionKind::Basic);
    assert_eq!(distribution.percentiles().keys(), vec![50.0, 75.0, 90.0, 99.0]);
    assert_eq!(distribution.get(99.0).and_then(|v| v.ms()), Some(873.98));

    let latency = output.latency().expect("latency");
    assert_eq!(latency.max.ms(), Some(944.41));

    let per_thread = output.requests_per_thread().expect("req/sec");
    assert_eq!(per_thread.avg, Numeric::Number(7.65));

    let total = output.total().expect("total");
    assert_eq!(total.requests, 302);
    assert_eq!(total.read.bytes(), Some(151_880));

    assert_eq!(output.requests_per_second(), Some(Numeric::Number(59.61)));
    assert_eq!(output.transfer_per_second().map(|t| t.unit()), Some("kb"));
    assert_eq!(output.not_successful_responses(), 12);
    assert!(output.socket_errors().is_none());
    assert!(output.has_errors());
    assert!(output.detailed_percentile_spectrum().is_none());
}

#[test]
fn wrk2_report_yields_histogram_and_spectrum() {
    let output = BenchmarkOutput::parse(WRK2_HISTOGRAM).expect("wrk2 report");

    let distribution = output.latency_distribution().expect("distribution");
    assert_eq!(distribution.kind(), DistributionKind::Histogram);
    let keys = distribution.percentiles().keys();
    assert!(keys.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(keys.last().copied(), Some(100.0));
    assert_eq!(distribution.get(99.999).and_then(|v| v.ms()), Some(4.09));

    let latency = output.latency().expect("latency");
    assert_eq!(latency.stdev.unit(), "us");
    assert_eq!(latency.stdev.ms(), Some(0.487));

    let per_thread = output.requests_per_thread().expect("req/sec");
    assert_eq!(per_thread.avg.as_number(), Some(5270.0));
    assert_eq!(per_thread.max.as_number(), Some(6890.0));

    let spectrum = output.detailed_percentile_spectrum().expect("spectrum");
    assert_eq!(spectrum.rows.len(), 6);
    assert_eq!(spectrum.rows[5].inverse_percentile, Numeric::Sentinel(Sentinel::Inf));
    assert_eq!(spectrum.total_count, Numeric::Number(59985));
    assert_eq!(spectrum.sub_buckets, Numeric::Number(2048));

    assert_eq!(output.requests_per_second(), Some(Numeric::Number(9999.12)));
    assert!(!output.has_errors());
}

#[test]
fn wrk2_uncorrected_sections_do_not_replace_recorded_ones() {
    let output = BenchmarkOutput::parse(WRK2_UNCORRECTED).expect("wrk2 -U report");

    match output.latency_distribution().expect("distribution") {
        LatencyDistribution::Histogram { label, percentiles } => {
            assert_eq!(label, "HdrHistogram - Recorded Latency");
            assert_eq!(percentiles.get(50.0).and_then(|v| v.ms()), Some(2.0));
        }
        other => panic!("expected histogram, got {other:?}"),
    }
    let spectrum = output.detailed_percentile_spectrum().expect("spectrum");
    assert_eq!(spectrum.mean, Numeric::Number(2.0));
    assert_eq!(output.total().map(|t| t.requests), Some(1000));
}

#[test]
fn end_to_end_timeout_scenario() {
    let raw = "Running 30s test @ https://foo.org/
  12 threads and 400 connections
  Thread Stats   Avg      Stdev     Max   +/- Stdev
    Latency     1.49s   329.38ms   2.00s    73.97%
    Req/Sec    15.13     10.21    80.00     72.41%
  4294 requests in 30.09s, 2.06MB read
  Socket errors: connect 0, read 0, write 0, timeout 1463
Requests/sec:    142.72
Transfer/sec:     70.11KB";
    let output = BenchmarkOutput::parse(raw).expect("parsed");

    assert_eq!(output.threads(), 12);
    assert_eq!(output.connections(), 400);
    assert_eq!(output.latency().and_then(|l| l.avg.ms()), Some(1490.0));
    let socket_errors = output.socket_errors().expect("socket errors");
    assert_eq!(socket_errors.timeout_errors, 1463);
    assert_eq!(socket_errors.connect_errors, 0);
    assert_eq!(socket_errors.read_errors, 0);
    assert_eq!(socket_errors.write_errors, 0);
    assert_eq!(output.requests_per_second(), Some(Numeric::Number(142.72)));
    assert!(output.latency_distribution().is_none());
    assert_eq!(output.not_successful_responses(), 0);
    assert!(output.has_errors());
}

#[test]
fn unrelated_text_is_rejected() {
    let err = BenchmarkOutput::parse("unable to connect to foo.org:https Connection refused")
        .expect_err("not a report");
    assert!(matches!(err, OutputError::MissingBlock(_)));
    assert!(err.to_string().starts_with("not a wrk report"));
}

#[test]
fn malformed_distribution_row_is_fatal() {
    let raw = WRK_LATENCY.replace("     75%  142.46ms", "     75%  fast");
    match BenchmarkOutput::parse(&raw) {
        Err(OutputError::Block(failure)) => {
            assert_eq!(failure.target, wrk_output::BlockKind::LatencyDistribution);
            assert!(failure.raw.contains("75%  fast"));
        }
        other => panic!("expected block failure, got {other:?}"),
    }
}

#[test]
fn serialized_record_keeps_audit_lines_and_sentinels() {
    let mut output = BenchmarkOutput::parse(WRK2_HISTOGRAM).expect("wrk2 report");
    let goals: Vec<_> = [
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

    let json = serde_json::to_value(&output).expect("serializable");
    let lines = json["raw_output"].as_array().expect("raw output lines");
    assert_eq!(lines[0], "Running 10s test @ http://127.0.0.1:8080/index.html");
    assert_eq!(lines.len(), WRK2_HISTOGRAM.trim().lines().count());

    assert_eq!(json["latency_distribution"]["kind"], "histogram");
    assert_eq!(json["detailed_percentile_spectrum"]["rows"][5]["inverse_percentile"], "inf");
    assert_eq!(json["detailed_percentile_spectrum"]["total_count"], 59985);
    assert_eq!(json["not_successful_responses"], 0);
    assert!(json["socket_errors"].is_null());

    let results = json["goals_results"].as_array().expect("goal results");
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["success"], true);
    assert!(results[0].get("error").is_none());
}

#[test]
fn independent_inputs_parse_concurrently() {
    let handles: Vec<_> = [WRK_LATENCY, WRK2_HISTOGRAM, WRK2_UNCORRECTED]
        .into_iter()
        .cycle()
        .take(12)
        .map(|raw| thread::spawn(move || BenchmarkOutput::parse(raw).map(|o| o.threads())))
        .collect();
    for handle in handles {
        let threads = handle.join().expect("thread").expect("parsed");
        assert!(threads > 0);
    }
}
