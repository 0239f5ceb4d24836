//! End-to-end payload parsing and aggregation tests.

use chrono::{DateTime, TimeZone, Utc};
use pretty_assertions::assert_eq;
use probe_payload::core::{DistMetricConfig, OutputMetricsOptions, PayloadError};
use probe_payload::metrics::{Distribution, MetricKind, MetricSnapshot, MetricValue};
use probe_payload::payload::{Parser, SnapshotStore};
use std::sync::Arc;

const PTYPE: &str = "external";
const PROBE: &str = "testprobe";
const TARGET: &str = "test-target";

fn parser_for_test(aggregate: bool) -> Parser {
    let options = OutputMetricsOptions {
        aggregate_in_core: aggregate,
        metrics_kind: None,
        dist_metrics: vec![DistMetricConfig::explicit("op_latency", "1,10,100")],
    };
    Parser::new(&options, PTYPE, PROBE, MetricKind::Cumulative, &[]).unwrap()
}

struct TestData {
    var_a: f64,
    var_b: f64,
    lat: Vec<f64>,
}

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn test_payload(td: &TestData) -> String {
    let lat: Vec<String> = td.lat.iter().map(|f| format!("{:.6}", f)).collect();
    [
        format!("time_to_running {:.6}", td.var_a),
        format!("time_to_ssh {:.6}", td.var_b),
        format!("op_latency {}", lat.join(",")),
    ]
    .join("\n")
}

/// The snapshot a payload built from `td` is expected to produce.
fn expected_snapshot(timestamp: DateTime<Utc>, td: &TestData) -> MetricSnapshot {
    let mut dist = Distribution::new(Arc::from(vec![1.0, 10.0, 100.0]));
    for &sample in &td.lat {
        dist.add_sample(sample);
    }
    MetricSnapshot::new(timestamp, MetricKind::Cumulative)
        .add_metric("time_to_running", MetricValue::Scalar(td.var_a))
        .add_metric("time_to_ssh", MetricValue::Scalar(td.var_b))
        .add_metric("op_latency", MetricValue::Distribution(dist))
        .add_label("ptype", PTYPE)
        .add_label("probe", PROBE)
        .add_label("dst", TARGET)
}

fn join(samples: &[f64]) -> String {
    samples.iter().map(f64::to_string).collect::<Vec<_>>().join(",")
}

fn counts(snapshot: &MetricSnapshot, name: &str) -> Vec<u64> {
    snapshot
        .metric(name)
        .and_then(MetricValue::as_distribution)
        .map(|d| d.bucket_counts().to_vec())
        .unwrap_or_default()
}

fn scalar(snapshot: &MetricSnapshot, name: &str) -> Option<f64> {
    snapshot.metric(name).and_then(MetricValue::as_scalar)
}

#[test]
fn test_aggregate_in_core() {
    let p = parser_for_test(true);

    let td = TestData {
        var_a: 10.0,
        var_b: 30.0,
        lat: vec![3.1, 4.0, 13.0],
    };
    let first = p.payload_metrics_at(None, &test_payload(&td), TARGET, ts(100)).unwrap();
    assert_eq!(first.to_string(), expected_snapshot(ts(100), &td).to_string());
    assert_eq!(counts(&first, "op_latency"), vec![0, 2, 1, 0]);

    let next = TestData {
        var_a: 8.0,
        var_b: 45.0,
        lat: vec![6.0, 14.1, 2.1],
    };
    let second = p
        .payload_metrics_at(Some(&first), &test_payload(&next), TARGET, ts(200))
        .unwrap();

    assert_eq!(scalar(&second, "time_to_running"), Some(18.0));
    assert_eq!(scalar(&second, "time_to_ssh"), Some(75.0));
    assert_eq!(counts(&second, "op_latency"), vec![0, 4, 2, 0]);
    assert_eq!(second.timestamp(), ts(200));
    assert_eq!(second.label("dst"), Some(TARGET));
}

#[test]
fn test_no_aggregation() {
    let p = parser_for_test(false);

    let td = TestData {
        var_a: 10.0,
        var_b: 30.0,
        lat: vec![3.1, 4.0, 13.0],
    };
    let first = p.payload_metrics_at(None, &test_payload(&td), TARGET, ts(100)).unwrap();

    let next = TestData {
        var_a: 8.0,
        var_b: 45.0,
        lat: vec![6.0, 14.1, 2.1],
    };
    let second = p
        .payload_metrics_at(Some(&first), &test_payload(&next), TARGET, ts(200))
        .unwrap();
    assert_eq!(second.to_string(), expected_snapshot(ts(200), &next).to_string());
}

#[test]
fn test_disabled_aggregation_ignores_previous() {
    let p = parser_for_test(false);
    let unrelated = MetricSnapshot::new(ts(1), MetricKind::Gauge)
        .add_metric("time_to_ssh", MetricValue::Scalar(999.0))
        .add_metric("leftover", MetricValue::Scalar(1.0));

    let payload = "time_to_ssh 5\nop_latency 50";
    let without = p.payload_metrics_at(None, payload, TARGET, ts(5)).unwrap();
    let with = p.payload_metrics_at(Some(&unrelated), payload, TARGET, ts(5)).unwrap();
    assert_eq!(without, with);
}

#[test]
fn test_three_payloads_accumulate() {
    let p = parser_for_test(true);
    let mut previous: Option<MetricSnapshot> = None;
    for value in [1.5, 2.25, 4.0] {
        let payload = format!("x {}", value);
        previous = Some(p.payload_metrics(previous.as_ref(), &payload, TARGET).unwrap());
    }
    assert_eq!(previous.as_ref().and_then(|s| scalar(s, "x")), Some(7.75));
}

#[test]
fn test_distribution_merge_matches_direct_bucketing() {
    let p = parser_for_test(true);
    let s1 = [0.5, 99.0, 100.0, 101.0, 7.0];
    let s2 = [1.0, 1.0001, 1000.0, 3.0];

    let first = p
        .payload_metrics(None, &format!("op_latency {}", join(&s1)), TARGET)
        .unwrap();
    let merged = p
        .payload_metrics(Some(&first), &format!("op_latency {}", join(&s2)), TARGET)
        .unwrap();

    let all: Vec<f64> = s2.iter().chain(s1.iter()).copied().collect();
    let direct = p
        .payload_metrics(None, &format!("op_latency {}", join(&all)), TARGET)
        .unwrap();

    assert_eq!(counts(&merged, "op_latency"), counts(&direct, "op_latency"));
    assert_eq!(counts(&merged, "op_latency"), vec![2, 3, 2, 2]);
}

#[test]
fn test_per_target_isolation() {
    let p = parser_for_test(true);
    let store = SnapshotStore::new();

    store.ingest(&p, "B", "x 100").unwrap();
    let before = store.get("B").unwrap();

    store.ingest(&p, "A", "x 1").unwrap();
    store.ingest(&p, "A", "x 2").unwrap();

    assert_eq!(store.get("B").unwrap(), before);
    assert_eq!(store.get("A").as_ref().and_then(|s| scalar(s, "x")), Some(3.0));
    assert_eq!(store.get("A").unwrap().label("dst"), Some("A"));
}

#[test]
fn test_rejection_leaves_state_unaffected() {
    let p = parser_for_test(true);
    let stored = p.payload_metrics_at(None, "x 1\nop_latency 5", TARGET, ts(1)).unwrap();
    let copy = stored.clone();

    for bad in ["x 2\nop_latency 5,abc", "x 1,2", "x", "x 2\ny NaN"] {
        let err = p.payload_metrics_at(Some(&stored), bad, TARGET, ts(2)).unwrap_err();
        assert!(matches!(err, PayloadError::PayloadParse { .. }), "{bad:?} gave {err:?}");
    }
    assert_eq!(stored, copy);

    let next = p.payload_metrics_at(Some(&stored), "x 4", TARGET, ts(3)).unwrap();
    assert_eq!(scalar(&next, "x"), Some(5.0));
    assert_eq!(counts(&next, "op_latency"), vec![0, 1, 0, 0]);
}

#[test]
fn test_blank_and_whitespace_lines() {
    let p = parser_for_test(false);
    let snapshot = p
        .payload_metrics(None, "\n\n  a    1.5  \r\n\t\nop_latency 2 , 3,4\n\n", TARGET)
        .unwrap();
    assert_eq!(scalar(&snapshot, "a"), Some(1.5));
    assert_eq!(counts(&snapshot, "op_latency"), vec![0, 3, 0, 0]);
}

#[test]
fn test_empty_payload_yields_labeled_snapshot() {
    let p = parser_for_test(false);
    let snapshot = p.payload_metrics(None, "", TARGET).unwrap();
    assert!(snapshot.is_empty());
    assert_eq!(snapshot.label("ptype"), Some(PTYPE));
    assert_eq!(snapshot.label("probe"), Some(PROBE));
    assert_eq!(snapshot.label("dst"), Some(TARGET));
}

#[test]
fn test_bounds_mismatch_with_previous_is_internal_error() {
    let p = parser_for_test(true);
    let mut foreign = Distribution::new(Arc::from(vec![1.0, 2.0]));
    foreign.add_sample(1.5);
    let previous = MetricSnapshot::new(ts(1), MetricKind::Cumulative)
        .add_metric("op_latency", MetricValue::Distribution(foreign))
        .add_metric("x", MetricValue::Scalar(1.0));
    let copy = previous.clone();

    let err = p
        .payload_metrics_at(Some(&previous), "x 1\nop_latency 5", TARGET, ts(2))
        .unwrap_err();
    assert!(matches!(err, PayloadError::Internal(_)), "got {err:?}");
    assert_eq!(err.category(), "internal");
    assert_eq!(previous, copy);
}
