//! Common error types shared across crates.

use thiserror::Error;

/// Top-level service error type.
///
/// Variants map to HTTP status codes returned to callers:
/// - [`ServiceError::DecryptionFailure`] → 400
/// - [`ServiceError::BadRequest`] → 400
/// - [`ServiceError::Unavailable`] → 503
/// - [`ServiceError::Internal`] → 500
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Any failure while unwrapping or decrypting an inbound envelope.
    ///
    /// Deliberately carries no detail: RSA padding errors, GCM tag
    /// mismatches, malformed base64, and invalid plaintext JSON all collapse
    /// into this one variant so that differentiated error responses cannot
    /// be used as a decryption oracle.
    #[error("Failed to decrypt payload")]
    DecryptionFailure,

    /// The request was malformed in a way unrelated to decryption.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A required resource (key material) is not yet initialised.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// An unexpected internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::DecryptionFailure => 400,
            ServiceError::BadRequest(_) => 400,
            ServiceError::Unavailable(_) => 503,
            ServiceError::Internal(_) => 500,
        }
    }

    /// Short machine-readable code used in error response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::DecryptionFailure => "decryption_failure",
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::Unavailable(_) => "service_unavailable",
            ServiceError::Internal(_) => "internal_error",
        }
    }
}
