//! Configuration management for the payload parser.
//!
//! This module provides:
//! - YAML file support
//! - Distribution bucket declarations (explicit or exponential)
//! - Validation and defaults

use crate::core::{PayloadError, Result};
use crate::metrics::MetricKind;
use crate::payload::buckets::resolve_buckets;
use crate::payload::check_label_names;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Complete configuration for a probe's payload handling
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Probe identity and extra labels
    pub probe: ProbeConfig,
    /// Output metrics options consumed by the parser
    pub output_metrics: OutputMetricsOptions,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Probe identity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Probe type, exported as the `ptype` label
    #[serde(rename = "type")]
    pub probe_type: String,
    /// Probe name, exported as the `probe` label
    pub name: String,
    /// Labels appended to every snapshot after ptype, probe and dst
    pub additional_labels: BTreeMap<String, String>,
}

/// Options controlling how payloads become metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputMetricsOptions {
    /// Accumulate successive payloads per target inside the parser's caller
    pub aggregate_in_core: bool,
    /// Overrides the default metric kind handed to the parser
    pub metrics_kind: Option<MetricKind>,
    /// Metrics whose payload values are distribution samples
    pub dist_metrics: Vec<DistMetricConfig>,
}

/// Declaration of a distribution metric.
///
/// Exactly one of `explicit_buckets` and `exponential_buckets` must be set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistMetricConfig {
    /// Metric name as it appears in payload lines
    pub name: String,
    /// Comma-separated ascending boundaries, e.g. `"1,10,100"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explicit_buckets: Option<String>,
    /// Exponentially growing boundaries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exponential_buckets: Option<ExponentialBuckets>,
}

/// Exponential bucket generation: `boundary[i] = scale_factor * base^i`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExponentialBuckets {
    /// Number of boundaries to generate
    pub num_buckets: i64,
    /// First boundary
    pub scale_factor: f64,
    /// Growth factor between consecutive boundaries
    #[serde(default = "default_base")]
    pub base: f64,
}

/// The bucket declaration of a [`DistMetricConfig`] once the oneof is checked
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BucketConfig<'a> {
    /// Comma-separated boundaries
    Explicit(&'a str),
    /// Generated boundaries
    Exponential(&'a ExponentialBuckets),
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: LogLevel,
    /// Include targets, thread ids and line numbers in log lines
    pub structured: bool,
}

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Per-line parse events
    Trace,
    /// Per-payload summaries
    Debug,
    /// Startup and lifecycle
    Info,
    /// Recoverable problems
    Warn,
    /// Failures only
    Error,
}

fn default_base() -> f64 {
    2.0
}

impl Default for ProbeConfig {
    fn default() -> Self {
        ProbeConfig {
            probe_type: "external".to_string(),
            name: "external-probe".to_string(),
            additional_labels: BTreeMap::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: LogLevel::Info,
            structured: false,
        }
    }
}

impl DistMetricConfig {
    /// Declares a distribution with explicit boundaries
    pub fn explicit<N: Into<String>, B: Into<String>>(name: N, buckets: B) -> Self {
        DistMetricConfig {
            name: name.into(),
            explicit_buckets: Some(buckets.into()),
            exponential_buckets: None,
        }
    }

    /// Declares a distribution with base-2 exponential boundaries
    pub fn exponential<N: Into<String>>(name: N, num_buckets: i64, scale_factor: f64) -> Self {
        DistMetricConfig {
            name: name.into(),
            explicit_buckets: None,
            exponential_buckets: Some(ExponentialBuckets {
                num_buckets,
                scale_factor,
                base: default_base(),
            }),
        }
    }

    /// Returns the single bucket declaration, or a config error if none or both are set
    pub fn bucket_config(&self) -> Result<BucketConfig<'_>> {
        match (&self.explicit_buckets, &self.exponential_buckets) {
            (Some(explicit), None) => Ok(BucketConfig::Explicit(explicit)),
            (None, Some(exponential)) => Ok(BucketConfig::Exponential(exponential)),
            (Some(_), Some(_)) => Err(PayloadError::config(format!(
                "distribution metric '{}' sets both explicit_buckets and exponential_buckets",
                self.name
            ))),
            (None, None) => Err(PayloadError::config(format!(
                "distribution metric '{}' has no bucket declaration",
                self.name
            ))),
        }
    }
}

impl OutputMetricsOptions {
    /// Validate the options, including every bucket declaration
    pub fn validate(&self) -> Result<()> {
        if self.aggregate_in_core && self.metrics_kind == Some(MetricKind::Gauge) {
            return Err(PayloadError::config(
                "metrics_kind gauge cannot be combined with aggregate_in_core",
            ));
        }

        resolve_buckets(&self.dist_metrics)?;
        Ok(())
    }
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.probe.probe_type.trim().is_empty() {
            return Err(PayloadError::config("probe type must not be empty"));
        }

        if self.probe.name.trim().is_empty() {
            return Err(PayloadError::config("probe name must not be empty"));
        }

        check_label_names(self.probe.additional_labels.keys().map(String::as_str))?;

        self.output_metrics.validate()
    }

    /// Additional labels in the order they are attached to snapshots
    pub fn additional_labels(&self) -> Vec<(String, String)> {
        self.probe
            .additional_labels
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl LogLevel {
    /// Convert to tracing filter string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Configuration builder for programmatic construction
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        ConfigBuilder {
            config: Config::default(),
        }
    }

    /// Load configuration from YAML string
    pub fn from_yaml(mut self, yaml: &str) -> Result<Self> {
        self.config = serde_yaml::from_str(yaml)
            .map_err(|e| PayloadError::config(format!("Failed to parse YAML config: {}", e)))?;
        Ok(self)
    }

    /// Set probe type
    pub fn probe_type<S: Into<String>>(mut self, probe_type: S) -> Self {
        self.config.probe.probe_type = probe_type.into();
        self
    }

    /// Set probe name
    pub fn probe_name<S: Into<String>>(mut self, name: S) -> Self {
        self.config.probe.name = name.into();
        self
    }

    /// Add an extra label
    pub fn additional_label<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.config
            .probe
            .additional_labels
            .insert(key.into(), value.into());
        self
    }

    /// Enable or disable in-core aggregation
    pub fn aggregate_in_core(mut self, enable: bool) -> Self {
        self.config.output_metrics.aggregate_in_core = enable;
        self
    }

    /// Override the metric kind
    pub fn metrics_kind(mut self, kind: MetricKind) -> Self {
        self.config.output_metrics.metrics_kind = Some(kind);
        self
    }

    /// Declare a distribution metric
    pub fn dist_metric(mut self, metric: DistMetricConfig) -> Self {
        self.config.output_metrics.dist_metrics.push(metric);
        self
    }

    /// Set log level
    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.logging.level = level;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
