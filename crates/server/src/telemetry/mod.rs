//! Structured logging setup for the encryption service.
//!
//! # Telemetry invariants
//!
//! - **No key material or payload plaintext** must appear in any span
//!   attribute or log field. Envelope fields are ciphertext and may be
//!   logged at debug level; session keys and private key PEMs never.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`); `RUST_LOG`
//!   takes precedence when set.

pub mod init;

pub use init::init_telemetry;
