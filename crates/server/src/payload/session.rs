//! Request-scoped session key recovered from an inbound envelope.

use crate::crypto::KEY_LEN;

/// The ephemeral 256-bit AES key for one request/response exchange.
///
/// Recovered by unwrapping the envelope's `k` field, threaded to the response
/// encryptor for the same exchange, and dropped when the exchange ends. It is
/// never placed in global or ambient state, so concurrent requests cannot
/// cross-contaminate each other's keys, and compromise of one request's key
/// exposes no other request. The memory is overwritten with zeroes on drop.
#[derive(Clone)]
pub struct SessionKey(Box<[u8; KEY_LEN]>);

impl SessionKey {
    /// Build a session key from unwrapped bytes.
    ///
    /// Returns `None` unless `bytes` is exactly [`KEY_LEN`] long.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != KEY_LEN {
            return None;
        }
        let mut buf = Box::new([0u8; KEY_LEN]);
        buf.copy_from_slice(bytes);
        Some(Self(buf))
    }

    /// Raw key bytes for the cipher layer.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }
}

impl Drop for SessionKey {
    fn drop(&mut self) {
        // Zero the key material on drop.
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material — not even in debug builds.
        f.write_str("SessionKey([REDACTED])")
    }
}
