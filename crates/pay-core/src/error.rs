//! # Payment Error Types
//!
//! Typed error handling for the alipay-checkout payment engine.
//! All payment operations return `Result<T, PaymentError>`.

use thiserror::Error;

/// Core error type for all payment operations
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Configuration errors (missing app id, unsupported sign type)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Amount could not be parsed or is out of range
    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },

    /// Key text is empty or not base64 after cleanup
    #[error("Key format error: {0}")]
    KeyFormat(String),

    /// PEM envelope or DER payload could not be decoded
    #[error("Key parse error: {0}")]
    KeyParse(String),

    /// RSA signing failed. The request must not be sent unsigned.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Callback signature did not verify against the gateway public key
    #[error("Signature invalid: {0}")]
    SignatureInvalid(String),

    /// Outbound call to the gateway failed or returned a non-success status
    #[error("Transport error: {0}")]
    Transport(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PaymentError {
    /// Returns true if this error must stop the process at startup
    /// (or abort the request, for signing failures).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PaymentError::Configuration(_)
                | PaymentError::KeyFormat(_)
                | PaymentError::KeyParse(_)
                | PaymentError::Signing(_)
        )
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            PaymentError::Configuration(_) => 500,
            PaymentError::InvalidRequest(_) => 400,
            PaymentError::InvalidAmount { .. } => 400,
            PaymentError::KeyFormat(_) => 500,
            PaymentError::KeyParse(_) => 500,
            PaymentError::Signing(_) => 500,
            PaymentError::SignatureInvalid(_) => 401,
            PaymentError::Transport(_) => 502,
            PaymentError::Serialization(_) => 500,
            PaymentError::Internal(_) => 500,
        }
    }
}

/// Result type alias for payment operations
pub type PaymentResult<T> = Result<T, PaymentError>;
