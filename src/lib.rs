//! probe_payload - metrics from external probe output.
//!
//! External probes run as separate processes and print raw `name value`
//! lines. This crate turns that text into typed, labeled metric snapshots
//! and can accumulate successive snapshots per target.
//!
//! # Architecture
//!
//! - `core`: error taxonomy and YAML configuration
//! - `metrics`: snapshot, scalar and distribution types
//! - `payload`: bucket resolution, line grammar, parser and per-target store
//! - `cli`: command-line interface
//!
//! # Example
//!
//! ```
//! use probe_payload::core::{ConfigBuilder, DistMetricConfig};
//! use probe_payload::payload::{Parser, SnapshotStore};
//!
//! let config = ConfigBuilder::new()
//!     .probe_name("ssh-check")
//!     .aggregate_in_core(true)
//!     .dist_metric(DistMetricConfig::explicit("op_latency", "1,10,100"))
//!     .build()
//!     .unwrap();
//! let parser = Parser::from_config(&config).unwrap();
//!
//! let store = SnapshotStore::new();
//! store.ingest(&parser, "host-1", "op_latency 3.1,4.0,13").unwrap();
//! let snapshot = store.ingest(&parser, "host-1", "op_latency 6").unwrap();
//! let dist = snapshot.metric("op_latency").and_then(|m| m.as_distribution()).unwrap();
//! assert_eq!(dist.bucket_counts(), &[0, 3, 1, 0]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod cli;
pub mod core;
pub mod metrics;
pub mod payload;

// Re-export core types for convenience
pub use crate::core::{Config, PayloadError, Result};
pub use crate::metrics::MetricSnapshot;
pub use crate::payload::Parser;
