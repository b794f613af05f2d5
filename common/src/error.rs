//! Error types for the FxFlow pipeline.

use thiserror::Error;

/// Main error type for pipeline invocations.
#[derive(Error, Debug)]
pub enum FxFlowError {
    /// Required configuration value missing or malformed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An external service call failed (rate API, object storage, query engine, metrics).
    #[error("{service} call failed: {reason}")]
    ExternalCall { service: String, reason: String },

    /// A payload is missing required fields or quotes.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Division by zero, missing lookup or an unrepresentable rate.
    #[error("Arithmetic error: {0}")]
    Arithmetic(String),

    /// Some pairs failed while others were processed.
    #[error("{} pair(s) failed: {}", .failed.len(), .failed.join("; "))]
    PartialFailure {
        /// One `"PAIR: reason"` entry per failed pair.
        failed: Vec<String>,
        /// Pairs whose metric was published before the invocation failed.
        published: Vec<String>,
    },
}

impl FxFlowError {
    /// Create an external call error.
    pub fn external(service: impl Into<String>, reason: impl ToString) -> Self {
        FxFlowError::ExternalCall {
            service: service.into(),
            reason: reason.to_string(),
        }
    }

    /// Check if the invoking system may retry this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FxFlowError::ExternalCall { .. })
    }

    /// Get a stable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            FxFlowError::Configuration(_) => "CONFIGURATION_ERROR",
            FxFlowError::ExternalCall { .. } => "EXTERNAL_CALL_ERROR",
            FxFlowError::Validation(_) => "VALIDATION_ERROR",
            FxFlowError::Arithmetic(_) => "ARITHMETIC_ERROR",
            FxFlowError::PartialFailure { .. } => "PARTIAL_FAILURE",
        }
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, FxFlowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(FxFlowError::external("rate-api", "status 503").is_retryable());
        assert!(!FxFlowError::Validation("missing quotes".into()).is_retryable());
        assert!(!FxFlowError::Configuration("BUCKET_NAME".into()).is_retryable());
    }

    #[test]
    fn test_messages() {
        let err = FxFlowError::external("query-engine", "FAILED: table not found");
        assert_eq!(err.to_string(), "query-engine call failed: FAILED: table not found");
        assert_eq!(err.error_code(), "EXTERNAL_CALL_ERROR");

        let err = FxFlowError::PartialFailure {
            failed: vec!["EURUSD: division by zero".into()],
            published: vec!["USDJPY".into()],
        };
        assert_eq!(err.to_string(), "1 pair(s) failed: EURUSD: division by zero");
    }
}
