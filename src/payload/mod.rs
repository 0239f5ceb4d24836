//! Parsing of external probe payloads into metric snapshots.
//!
//! A probe prints lines of the form `<name> <value>`, where the value is
//! either a single number or, for metrics declared as distributions, a
//! comma-separated list of samples:
//!
//! ```text
//! time_to_running 10.000000
//! time_to_ssh 30.000000
//! op_latency 3.1,4.0,13
//! ```
//!
//! [`Parser`] holds no per-target state. Callers keep the last snapshot for
//! each target and hand it back on the next call; with `aggregate_in_core`
//! set, the new payload is added on top of it.
//!
//! # Example
//!
//! ```
//! use probe_payload::core::{DistMetricConfig, OutputMetricsOptions};
//! use probe_payload::metrics::MetricKind;
//! use probe_payload::payload::Parser;
//!
//! let options = OutputMetricsOptions {
//!     aggregate_in_core: true,
//!     metrics_kind: None,
//!     dist_metrics: vec![DistMetricConfig::explicit("op_latency", "1,10,100")],
//! };
//! let parser = Parser::new(&options, "external", "ssh", MetricKind::Cumulative, &[]).unwrap();
//!
//! let first = parser.payload_metrics(None, "time_to_ssh 30", "host-1").unwrap();
//! let second = parser.payload_metrics(Some(&first), "time_to_ssh 45", "host-1").unwrap();
//! assert_eq!(second.metric("time_to_ssh").and_then(|m| m.as_scalar()), Some(75.0));
//! ```

pub mod buckets;
pub mod grammar;
pub mod store;

use crate::core::{Config, OutputMetricsOptions, PayloadError, Result};
use crate::metrics::{Distribution, MetricKind, MetricSnapshot, MetricValue};
use buckets::{resolve_buckets, BucketMap};
use chrono::{DateTime, Utc};
use grammar::{line_name, parse_line, PayloadLine};
use std::collections::HashMap;
use std::sync::Arc;

pub use store::SnapshotStore;

/// Label carrying the probe type
pub const PTYPE_LABEL: &str = "ptype";
/// Label carrying the probe name
pub const PROBE_LABEL: &str = "probe";
/// Label carrying the target
pub const DST_LABEL: &str = "dst";

/// Reject additional label names that would shadow `ptype`, `probe` or `dst`.
pub fn check_label_names<'a, I>(names: I) -> Result<()>
where
    I: IntoIterator<Item = &'a str>,
{
    for name in names {
        if [PTYPE_LABEL, PROBE_LABEL, DST_LABEL].contains(&name) {
            return Err(PayloadError::config(format!(
                "additional label '{}' shadows a built-in label",
                name
            )));
        }
    }
    Ok(())
}

/// Turns payload text into snapshots for one probe.
///
/// Read-only after construction, so one instance can serve any number of
/// targets concurrently.
#[derive(Debug, Clone)]
pub struct Parser {
    probe_type: String,
    probe_name: String,
    kind: MetricKind,
    aggregate: bool,
    dist_buckets: BucketMap,
    extra_labels: Vec<(String, String)>,
}

impl Parser {
    /// Build a parser, resolving all distribution bucket declarations.
    pub fn new(
        options: &OutputMetricsOptions,
        probe_type: &str,
        probe_name: &str,
        default_kind: MetricKind,
        extra_labels: &[(String, String)],
    ) -> Result<Self> {
        if options.aggregate_in_core && options.metrics_kind == Some(MetricKind::Gauge) {
            return Err(PayloadError::config(
                "metrics_kind gauge cannot be combined with aggregate_in_core",
            ));
        }
        check_label_names(extra_labels.iter().map(|(key, _)| key.as_str()))?;

        // Accumulated scalars are cumulative whatever the default kind.
        let kind = if options.aggregate_in_core {
            MetricKind::Cumulative
        } else {
            options.metrics_kind.unwrap_or(default_kind)
        };

        let dist_buckets = resolve_buckets(&options.dist_metrics)?;

        tracing::debug!(
            probe = probe_name,
            ptype = probe_type,
            aggregate = options.aggregate_in_core,
            kind = kind.as_str(),
            dist_metrics = dist_buckets.len(),
            "Payload parser ready"
        );

        Ok(Self {
            probe_type: probe_type.to_string(),
            probe_name: probe_name.to_string(),
            kind,
            aggregate: options.aggregate_in_core,
            dist_buckets,
            extra_labels: extra_labels.to_vec(),
        })
    }

    /// Build a parser from a full configuration document
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        Self::new(
            &config.output_metrics,
            &config.probe.probe_type,
            &config.probe.name,
            MetricKind::Cumulative,
            &config.additional_labels(),
        )
    }

    /// Parse `payload` for `target`, stamping it with the current time.
    ///
    /// See [`Parser::payload_metrics_at`].
    pub fn payload_metrics(
        &self,
        previous: Option<&MetricSnapshot>,
        payload: &str,
        target: &str,
    ) -> Result<MetricSnapshot> {
        self.payload_metrics_at(previous, payload, target, Utc::now())
    }

    /// Parse `payload` for `target` and apply the aggregation policy.
    ///
    /// With aggregation disabled, or no `previous`, the freshly parsed
    /// snapshot is returned. Otherwise the fresh metrics are added into a
    /// copy of `previous`; metrics only in `previous` carry through, and
    /// timestamp and labels come from the fresh snapshot.
    ///
    /// A malformed payload is rejected as a whole and `previous` is never
    /// modified.
    pub fn payload_metrics_at(
        &self,
        previous: Option<&MetricSnapshot>,
        payload: &str,
        target: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<MetricSnapshot> {
        let (fresh, sources) = self.parse_payload(payload, target, timestamp)?;

        let previous = match previous {
            Some(previous) if self.aggregate => previous,
            _ => return Ok(fresh),
        };

        let mut merged = previous.clone();
        for (name, value) in fresh.metrics() {
            match merged.metric_mut(name) {
                Some(existing) => {
                    if std::mem::discriminant(existing) != std::mem::discriminant(value) {
                        let (line_number, line) = sources.get(name).copied().unwrap_or((0, ""));
                        return Err(PayloadError::PayloadParse {
                            line_number,
                            line: line.to_string(),
                            metric: name.to_string(),
                            reason: format!(
                                "{} value conflicts with previously recorded {}",
                                value.kind_name(),
                                existing.kind_name()
                            ),
                        });
                    }
                    existing.merge(value)?;
                },
                None => merged.set_metric(name, value.clone()),
            }
        }
        merged.adopt_header(&fresh);

        Ok(merged)
    }

    /// Parse into a fresh labeled snapshot, also returning the last source
    /// line (1-based number and text) of each metric.
    fn parse_payload<'p>(
        &self,
        payload: &'p str,
        target: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<(MetricSnapshot, HashMap<&'p str, (usize, &'p str)>)> {
        let mut snapshot = MetricSnapshot::new(timestamp, self.kind);
        let mut sources = HashMap::new();

        for (idx, raw) in payload.lines().enumerate() {
            let line_number = idx + 1;
            let reject = |reason: String| PayloadError::PayloadParse {
                line_number,
                line: raw.trim().to_string(),
                metric: line_name(raw).to_string(),
                reason,
            };

            let PayloadLine { name, values } = match parse_line(raw) {
                Ok(Some(line)) => line,
                Ok(None) => continue,
                Err(e) => return Err(reject(e.reason())),
            };

            match self.dist_buckets.get(name) {
                Some(bounds) => {
                    match snapshot.metric_mut(name) {
                        Some(MetricValue::Distribution(dist)) => {
                            values.iter().for_each(|&v| dist.add_sample(v));
                        },
                        _ => {
                            let mut dist = Distribution::new(Arc::clone(bounds));
                            values.iter().for_each(|&v| dist.add_sample(v));
                            snapshot.set_metric(name, MetricValue::Distribution(dist));
                        },
                    }
                },
                None => {
                    if values.len() != 1 {
                        return Err(reject(format!(
                            "{} values given for a scalar metric",
                            values.len()
                        )));
                    }
                    snapshot.set_metric(name, MetricValue::Scalar(values[0]));
                },
            }
            sources.insert(name, (line_number, raw.trim()));
        }

        snapshot.set_label(PTYPE_LABEL, self.probe_type.as_str());
        snapshot.set_label(PROBE_LABEL, self.probe_name.as_str());
        snapshot.set_label(DST_LABEL, target);
        for (key, value) in &self.extra_labels {
            snapshot.set_label(key.as_str(), value.as_str());
        }

        tracing::trace!(
            probe = %self.probe_name,
            dst = target,
            metrics = snapshot.len(),
            "Parsed payload"
        );

        Ok((snapshot, sources))
    }

    /// Value of the `ptype` label
    pub fn probe_type(&self) -> &str {
        &self.probe_type
    }

    /// Value of the `probe` label
    pub fn probe_name(&self) -> &str {
        &self.probe_name
    }

    /// Kind stamped on every snapshot this parser produces
    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    /// Whether payloads are accumulated on top of the previous snapshot
    pub fn aggregates(&self) -> bool {
        self.aggregate
    }

    /// Resolved upper bounds of a declared distribution metric
    pub fn bucket_bounds(&self, metric: &str) -> Option<&[f64]> {
        self.dist_buckets.get(metric).map(|bounds| &**bounds)
    }

    /// Names of declared distribution metrics, sorted
    pub fn dist_metric_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.dist_buckets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
