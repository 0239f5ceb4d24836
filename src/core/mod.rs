//! Error taxonomy and configuration for the payload parser.

#![warn(missing_docs)]

pub mod config;
pub mod error;

// Re-export commonly used types
pub use config::{
    BucketConfig, Config, ConfigBuilder, DistMetricConfig, ExponentialBuckets, LogLevel,
    LoggingConfig, OutputMetricsOptions, ProbeConfig,
};
pub use error::{PayloadError, Result};
