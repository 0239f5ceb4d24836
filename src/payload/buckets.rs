//! Resolution of distribution bucket declarations into boundary lists.

use crate::core::{BucketConfig, DistMetricConfig, ExponentialBuckets, PayloadError, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Upper limit on `num_buckets` for exponential declarations
pub const MAX_EXPONENTIAL_BUCKETS: i64 = 10_000;

/// Resolved metric name to upper bounds mapping. Shared, never mutated.
pub type BucketMap = HashMap<String, Arc<[f64]>>;

/// Resolve every declaration into a strictly increasing, finite boundary list.
pub fn resolve_buckets(declarations: &[DistMetricConfig]) -> Result<BucketMap> {
    let mut resolved = BucketMap::with_capacity(declarations.len());

    for decl in declarations {
        if decl.name.trim().is_empty() {
            return Err(PayloadError::config("distribution metric name must not be empty"));
        }
        if resolved.contains_key(&decl.name) {
            return Err(PayloadError::DuplicateMetric(decl.name.clone()));
        }

        let bounds = match decl.bucket_config()? {
            BucketConfig::Explicit(text) => explicit_bounds(&decl.name, text)?,
            BucketConfig::Exponential(spec) => exponential_bounds(&decl.name, spec)?,
        };
        resolved.insert(decl.name.clone(), Arc::from(bounds));
    }

    Ok(resolved)
}

/// Parse `"b1,b2,...,bn"`.
fn explicit_bounds(metric: &str, text: &str) -> Result<Vec<f64>> {
    let mut bounds: Vec<f64> = Vec::new();

    for token in text.split(',') {
        let token = token.trim();
        let bound: f64 = token
            .parse()
            .map_err(|_| PayloadError::invalid_bucket(metric, token))?;
        if !bound.is_finite() {
            return Err(PayloadError::invalid_bucket(metric, token));
        }
        if let Some(&last) = bounds.last() {
            if bound <= last {
                return Err(PayloadError::config(format!(
                    "bucket boundaries for '{}' must be strictly increasing: {} follows {}",
                    metric, bound, last
                )));
            }
        }
        bounds.push(bound);
    }

    Ok(bounds)
}

/// Generate `scale_factor * base^i` for `i` in `0..num_buckets`.
fn exponential_bounds(metric: &str, spec: &ExponentialBuckets) -> Result<Vec<f64>> {
    if spec.num_buckets <= 0 {
        return Err(PayloadError::config(format!(
            "num_buckets for '{}' must be positive, got {}",
            metric, spec.num_buckets
        )));
    }
    if spec.num_buckets > MAX_EXPONENTIAL_BUCKETS {
        return Err(PayloadError::config(format!(
            "num_buckets for '{}' must be at most {}, got {}",
            metric, MAX_EXPONENTIAL_BUCKETS, spec.num_buckets
        )));
    }
    if !(spec.scale_factor.is_finite() && spec.scale_factor > 0.0) {
        return Err(PayloadError::config(format!(
            "scale_factor for '{}' must be positive, got {}",
            metric, spec.scale_factor
        )));
    }
    if !(spec.base.is_finite() && spec.base > 1.0) {
        return Err(PayloadError::config(format!(
            "base for '{}' must be greater than 1, got {}",
            metric, spec.base
        )));
    }

    let mut bounds = Vec::with_capacity(usize::try_from(spec.num_buckets).unwrap_or_default());
    let mut bound = spec.scale_factor;
    for _ in 0..spec.num_buckets {
        if !bound.is_finite() {
            return Err(PayloadError::config(format!(
                "exponential buckets for '{}' overflow after {} boundaries",
                metric,
                bounds.len()
            )));
        }
        bounds.push(bound);
        bound *= spec.base;
    }

    Ok(bounds)
}
