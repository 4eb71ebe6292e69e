//! Shared application state injected into every Axum handler.

use crate::keys::KeyStore;

/// Application state shared across all request handlers.
///
/// All fields are cheaply cloneable (`Arc`-backed) so that Axum can clone the
/// state for each request without copying expensive data.
#[derive(Clone)]
pub struct AppState {
    /// Process-wide store for the RSA keypair.
    pub key_store: KeyStore,
}

impl AppState {
    /// Create a new [`AppState`] around the provided key store.
    pub fn new(key_store: KeyStore) -> Self {
        Self { key_store }
    }
}

impl Default for AppState {
    /// Creates a default [`AppState`] with an unprovisioned store rooted at
    /// the default keys directory, suitable for tests that never touch keys.
    fn default() -> Self {
        Self::new(KeyStore::new("keys"))
    }
}
