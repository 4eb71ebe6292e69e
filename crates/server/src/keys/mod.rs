//! RSA keypair lifecycle: lazy generation, PEM persistence, in-memory cache.
//!
//! # Lifecycle
//!
//! 1. At startup, `main` calls [`KeyStore::provision`]; a provisioning failure
//!    aborts the process, since encrypted routes cannot be served without a
//!    keypair.
//! 2. If `<keys_dir>/server_private.pem` (PKCS8) and
//!    `<keys_dir>/server_public.pem` (SPKI) both exist, they are loaded and
//!    cached. Otherwise a 2048-bit keypair is generated and both files are
//!    written, the private one with owner-only permissions.
//! 3. The cached material is immutable for the life of the process. Clients
//!    wrap their ephemeral session keys under the published public key, so
//!    replacing it while running would invalidate every in-flight client.
//! 4. Request handlers unwrap session keys via
//!    [`KeyStore::unwrap_session_key`]; the private key never leaves the
//!    store.
//!
//! # Security invariants
//!
//! - Private key material is never logged, never serialized into responses,
//!   and is persisted only to the 0600 private PEM file.
//! - Initialization is single-flight: concurrent first requests cannot race
//!   to generate two different keypairs.

pub mod store;

pub use store::{KeyError, KeyStore};
