//! Wire envelopes exchanged between clients and the encryption service.
//!
//! All envelope fields are standard-alphabet base64 strings carried inside
//! JSON bodies.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Request envelope
// ---------------------------------------------------------------------------

/// Inbound request envelope for encrypted routes.
///
/// The client generates a fresh 256-bit AES session key per request, wraps it
/// with RSA-OAEP(SHA-256) under the server's published public key, and
/// AES-256-GCM-encrypts the JSON request body with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedPayload {
    /// RSA-OAEP(SHA-256) ciphertext of the 32-byte AES session key.
    pub k: String,
    /// 96-bit GCM nonce.
    pub iv: String,
    /// AES-256-GCM ciphertext of the UTF-8 JSON request body.
    pub data: String,
    /// 128-bit GCM authentication tag.
    pub tag: String,
}

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

/// Outbound response envelope.
///
/// Carries no wrapped key: the response is encrypted under the session key
/// recovered from the paired request, with a freshly generated nonce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedResponse {
    /// 96-bit GCM nonce, distinct from the request's.
    pub iv: String,
    /// AES-256-GCM ciphertext of the UTF-8 JSON response body.
    pub data: String,
    /// 128-bit GCM authentication tag.
    pub tag: String,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"decryption_failure"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status: `"ok"` or `"degraded"`.
    pub status: String,
    /// Whether the RSA keypair is provisioned and cached in memory.
    pub keys_ready: bool,
}
