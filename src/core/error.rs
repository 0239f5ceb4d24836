use thiserror::Error;

/// Errors raised while building a parser or handling a payload
#[derive(Error, Debug)]
pub enum PayloadError {
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A bucket boundary token that is not a finite number
    #[error("Invalid bucket boundary for distribution metric '{metric}': '{token}'")]
    InvalidBucket {
        /// Distribution metric name
        metric: String,
        /// Offending token
        token: String,
    },

    /// The same distribution metric declared twice
    #[error("Duplicate distribution metric: {0}")]
    DuplicateMetric(String),

    /// A payload line that could not be parsed
    #[error("Invalid payload line {line_number} ('{line}') for metric '{metric}': {reason}")]
    PayloadParse {
        /// 1-based line number
        line_number: usize,
        /// Raw line text
        line: String,
        /// Metric name, empty if none could be read
        metric: String,
        /// What was wrong
        reason: String,
    },

    /// Inconsistent state, e.g. a previous snapshot with mismatched bounds
    #[error("Internal error: {0}")]
    Internal(String),

    /// I/O failure in the command-line driver
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for payload operations
pub type Result<T> = std::result::Result<T, PayloadError>;

impl PayloadError {
    /// Creates a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a new invalid bucket error
    pub fn invalid_bucket<M: Into<String>, T: Into<String>>(metric: M, token: T) -> Self {
        Self::InvalidBucket {
            metric: metric.into(),
            token: token.into(),
        }
    }

    /// Creates a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns true if the error was raised while building a parser
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::InvalidBucket { .. } | Self::DuplicateMetric(_))
    }

    /// Returns the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) | Self::InvalidBucket { .. } | Self::DuplicateMetric(_) => "config",
            Self::PayloadParse { .. } => "payload",
            Self::Internal(_) => "internal",
            Self::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = PayloadError::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");
        assert_eq!(err.category(), "config");
        assert!(err.is_config());
    }

    #[test]
    fn test_invalid_bucket_names_metric_and_token() {
        let err = PayloadError::invalid_bucket("op_latency", "1x");
        assert_eq!(
            err.to_string(),
            "Invalid bucket boundary for distribution metric 'op_latency': '1x'"
        );
        assert!(err.is_config());
    }

    #[test]
    fn test_payload_parse_error() {
        let err = PayloadError::PayloadParse {
            line_number: 3,
            line: "op_latency 1,x".to_string(),
            metric: "op_latency".to_string(),
            reason: "invalid numeric value".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid payload line 3 ('op_latency 1,x') for metric 'op_latency': invalid numeric value"
        );
        assert_eq!(err.category(), "payload");
        assert!(!err.is_config());
    }
}
