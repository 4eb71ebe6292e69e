//! AES-256-GCM bulk encryption primitives.
//!
//! This module is intentionally free of RSA and HTTP dependencies. It
//! provides the low-level seal/open operations used by the payload layer.
//!
//! # Envelope representation
//!
//! The GCM authentication tag travels as its own envelope field rather than
//! appended to the ciphertext, so [`aead::seal`] returns the nonce,
//! ciphertext, and tag separately and [`aead::open`] accepts them separately.

pub mod aead;

pub use aead::KEY_LEN;
