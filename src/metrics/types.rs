//! Metric snapshot types.
//!
//! A [`MetricSnapshot`] is a timestamped, labeled bundle of named
//! sub-metrics. Sub-metric names are unique within a snapshot and keep
//! their insertion order, as do labels.

use crate::core::{PayloadError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// How consumers should interpret scalar values across snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Accumulated across snapshots of the same series
    #[default]
    Cumulative,
    /// Point-in-time, replaced by each snapshot
    Gauge,
}

/// Histogram over fixed upper bounds with an implicit overflow bucket.
///
/// Bucket `i` counts samples `v` with `upper_bounds[i-1] < v <= upper_bounds[i]`;
/// the last bucket counts samples above the final bound.
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
    upper_bounds: Arc<[f64]>,
    bucket_counts: Vec<u64>,
    sum: f64,
    count: u64,
}

/// A single named sub-metric
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    /// Floating-point value
    Scalar(f64),
    /// Bucketed samples
    Distribution(Distribution),
}

/// Timestamped, labeled bundle of sub-metrics for one target
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSnapshot {
    timestamp: DateTime<Utc>,
    kind: MetricKind,
    labels: Vec<(String, String)>,
    metrics: Vec<(String, MetricValue)>,
}

impl MetricKind {
    /// Lowercase name, as used in configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Cumulative => "cumulative",
            MetricKind::Gauge => "gauge",
        }
    }
}

impl Distribution {
    /// Create an empty distribution over the given strictly increasing bounds
    pub fn new(upper_bounds: Arc<[f64]>) -> Self {
        let buckets = upper_bounds.len() + 1;
        Self {
            upper_bounds,
            bucket_counts: vec![0; buckets],
            sum: 0.0,
            count: 0,
        }
    }

    /// Index of the bucket a sample falls into
    #[inline]
    pub fn bucket_index(&self, sample: f64) -> usize {
        self.upper_bounds.partition_point(|&bound| bound < sample)
    }

    /// Record one sample
    pub fn add_sample(&mut self, sample: f64) {
        let idx = self.bucket_index(sample);
        self.bucket_counts[idx] += 1;
        self.sum += sample;
        self.count += 1;
    }

    /// Add another distribution's counts into this one.
    ///
    /// Both sides must share the same bounds.
    pub fn merge(&mut self, other: &Distribution) -> Result<()> {
        if !Arc::ptr_eq(&self.upper_bounds, &other.upper_bounds)
            && self.upper_bounds != other.upper_bounds
        {
            return Err(PayloadError::internal(format!(
                "cannot merge distributions with bounds {:?} and {:?}",
                self.upper_bounds, other.upper_bounds
            )));
        }

        for (mine, theirs) in self.bucket_counts.iter_mut().zip(&other.bucket_counts) {
            *mine += theirs;
        }
        self.sum += other.sum;
        self.count += other.count;
        Ok(())
    }

    /// Bucket upper bounds, excluding the overflow bucket
    pub fn upper_bounds(&self) -> &[f64] {
        &self.upper_bounds
    }

    /// Per-bucket counts; one longer than the bounds
    pub fn bucket_counts(&self) -> &[u64] {
        &self.bucket_counts
    }

    /// Sum of all recorded samples
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Number of recorded samples
    pub fn count(&self) -> u64 {
        self.count
    }
}

impl MetricValue {
    /// Short name of the variant, used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            MetricValue::Scalar(_) => "scalar",
            MetricValue::Distribution(_) => "distribution",
        }
    }

    /// Additively merge `other` into `self`
    pub fn merge(&mut self, other: &MetricValue) -> Result<()> {
        match (self, other) {
            (MetricValue::Scalar(mine), MetricValue::Scalar(theirs)) => {
                *mine += theirs;
                Ok(())
            },
            (MetricValue::Distribution(mine), MetricValue::Distribution(theirs)) => {
                mine.merge(theirs)
            },
            (mine, theirs) => Err(PayloadError::internal(format!(
                "cannot merge {} into {}",
                theirs.kind_name(),
                mine.kind_name()
            ))),
        }
    }

    /// Scalar value, if this is a scalar
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            MetricValue::Scalar(value) => Some(*value),
            MetricValue::Distribution(_) => None,
        }
    }

    /// Distribution, if this is one
    pub fn as_distribution(&self) -> Option<&Distribution> {
        match self {
            MetricValue::Distribution(dist) => Some(dist),
            MetricValue::Scalar(_) => None,
        }
    }
}

impl MetricSnapshot {
    /// Create an empty snapshot
    pub fn new(timestamp: DateTime<Utc>, kind: MetricKind) -> Self {
        Self {
            timestamp,
            kind,
            labels: Vec::new(),
            metrics: Vec::new(),
        }
    }

    /// Set a label, replacing an existing value with the same name
    pub fn add_label<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.set_label(key, value);
        self
    }

    /// In-place form of [`MetricSnapshot::add_label`]
    pub fn set_label<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        let key = key.into();
        let value = value.into();
        match self.labels.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.labels.push((key, value)),
        }
    }

    /// Set a sub-metric, replacing an existing one with the same name
    pub fn add_metric<N: Into<String>>(mut self, name: N, value: MetricValue) -> Self {
        self.set_metric(name, value);
        self
    }

    /// In-place form of [`MetricSnapshot::add_metric`]
    pub fn set_metric<N: Into<String>>(&mut self, name: N, value: MetricValue) {
        let name = name.into();
        match self.metric_mut(&name) {
            Some(slot) => *slot = value,
            None => self.metrics.push((name, value)),
        }
    }

    /// Sub-metric by name
    pub fn metric(&self, name: &str) -> Option<&MetricValue> {
        self.metrics.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Mutable sub-metric by name
    pub fn metric_mut(&mut self, name: &str) -> Option<&mut MetricValue> {
        self.metrics.iter_mut().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Sub-metrics in insertion order
    pub fn metrics(&self) -> impl Iterator<Item = (&str, &MetricValue)> {
        self.metrics.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Sub-metric names in insertion order
    pub fn metric_names(&self) -> impl Iterator<Item = &str> {
        self.metrics.iter().map(|(n, _)| n.as_str())
    }

    /// Label value by name
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Labels in insertion order
    pub fn labels(&self) -> &[(String, String)] {
        &self.labels
    }

    /// Time the snapshot was produced
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Metric kind of the snapshot's scalars
    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    /// Number of sub-metrics
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// True when the snapshot holds no sub-metrics
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Take timestamp, kind and labels from `other`, keeping the metrics
    pub(crate) fn adopt_header(&mut self, other: &MetricSnapshot) {
        self.timestamp = other.timestamp;
        self.kind = other.kind;
        self.labels.clone_from(&other.labels);
    }
}

fn write_joined<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dist:sum:{}|count:{}|ub:", self.sum, self.count)?;
        write_joined(f, &self.upper_bounds)?;
        f.write_str("|bc:")?;
        write_joined(f, &self.bucket_counts)
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Scalar(value) => write!(f, "{}", value),
            MetricValue::Distribution(dist) => write!(f, "{}", dist),
        }
    }
}

impl fmt::Display for MetricSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} labels=", self.timestamp.timestamp())?;
        for (i, (key, value)) in self.labels.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        for (name, value) in &self.metrics {
            write!(f, " {}={}", name, value)?;
        }
        Ok(())
    }
}
