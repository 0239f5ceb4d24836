//! Caller-side storage of the latest snapshot per target.

use super::Parser;
use crate::core::Result;
use crate::metrics::MetricSnapshot;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Latest snapshot per target.
///
/// `ingest` holds the target's entry lock for the whole read-merge-write,
/// so merges for one target are serialized while different targets proceed
/// in parallel. A rejected payload leaves the stored snapshot untouched.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    snapshots: DashMap<String, MetricSnapshot>,
}

impl SnapshotStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `payload` against the stored snapshot for `target` and store the result.
    pub fn ingest(&self, parser: &Parser, target: &str, payload: &str) -> Result<MetricSnapshot> {
        match self.snapshots.entry(target.to_string()) {
            Entry::Occupied(mut entry) => {
                let next = parser.payload_metrics(Some(entry.get()), payload, target)?;
                entry.insert(next.clone());
                Ok(next)
            },
            Entry::Vacant(entry) => {
                let next = parser.payload_metrics(None, payload, target)?;
                entry.insert(next.clone());
                Ok(next)
            },
        }
    }

    /// Clone of the stored snapshot for `target`
    pub fn get(&self, target: &str) -> Option<MetricSnapshot> {
        self.snapshots.get(target).map(|entry| entry.value().clone())
    }

    /// Forget a target, returning its last snapshot
    pub fn remove(&self, target: &str) -> Option<MetricSnapshot> {
        self.snapshots.remove(target).map(|(_, snapshot)| snapshot)
    }

    /// Known targets, sorted
    pub fn targets(&self) -> Vec<String> {
        let mut targets: Vec<String> = self.snapshots.iter().map(|e| e.key().clone()).collect();
        targets.sort_unstable();
        targets
    }

    /// Number of stored targets
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// True when no target has been ingested
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
