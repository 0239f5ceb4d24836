//! Typed, labeled metric snapshots produced from probe payloads.

pub mod types;

pub use types::{Distribution, MetricKind, MetricSnapshot, MetricValue};
