//! # Payment Error Types
//!
//! Typed error handling for the eway-checkout payment pipeline.
//!
//! These are *infrastructure* errors returned as `Err`. Card declines, missing
//! saved cards and similar payment-local failures are never returned this way;
//! they are recorded on the payment as a [`crate::PaymentFailure`].

use thiserror::Error;

/// Core error type for all payment operations
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A record the pipeline depends on does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Amount cannot be represented in the gateway's minor units
    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },

    /// Payment provider API error
    #[error("Provider error [{provider}]: {message}")]
    ProviderError { provider: String, message: String },

    /// Network/HTTP error communicating with provider
    #[error("Network error: {0}")]
    NetworkError(String),

    /// A gateway call exceeded its time budget
    #[error("Gateway call timed out after {secs}s: {operation}")]
    Timeout { operation: &'static str, secs: u64 },

    /// Invoice data does not line up with the domain records
    #[error("Data integrity error: {0}")]
    Integrity(String),

    /// Persistence backend failure
    #[error("Store error: {0}")]
    Store(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PaymentError {
    /// Shorthand for a missing record
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        PaymentError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentError::NetworkError(_)
                | PaymentError::Timeout { .. }
                | PaymentError::ProviderError { .. }
                | PaymentError::Store(_)
        )
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            PaymentError::Configuration(_) => 500,
            PaymentError::InvalidRequest(_) => 400,
            PaymentError::NotFound { .. } => 404,
            PaymentError::InvalidAmount { .. } => 400,
            PaymentError::ProviderError { .. } => 502,
            PaymentError::NetworkError(_) => 503,
            PaymentError::Timeout { .. } => 504,
            PaymentError::Integrity(_) => 422,
            PaymentError::Store(_) => 500,
            PaymentError::Internal(_) => 500,
            PaymentError::Serialization(_) => 500,
        }
    }
}

impl From<serde_json::Error> for PaymentError {
    fn from(err: serde_json::Error) -> Self {
        PaymentError::Serialization(err.to_string())
    }
}

/// Result type alias for payment operations
pub type PaymentResult<T> = Result<T, PaymentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(PaymentError::NetworkError("timeout".into()).is_retryable());
        assert!(PaymentError::Timeout {
            operation: "create_transaction",
            secs: 30
        }
        .is_retryable());
        assert!(!PaymentError::InvalidRequest("bad data".into()).is_retryable());
        assert!(!PaymentError::Integrity("no line".into()).is_retryable());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            PaymentError::InvalidRequest("test".into()).status_code(),
            400
        );
        assert_eq!(PaymentError::not_found("Payment", "p1").status_code(), 404);
        assert_eq!(
            PaymentError::Timeout {
                operation: "create_customer",
                secs: 5
            }
            .status_code(),
            504
        );
    }

    #[test]
    fn test_not_found_message() {
        let err = PaymentError::not_found("Invoice", "inv_1");
        assert_eq!(err.to_string(), "Invoice not found: inv_1");
    }
}
