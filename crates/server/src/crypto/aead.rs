//! AES-256-GCM encryption and decryption of JSON payload bytes.
//!
//! **Nonce discipline:** a fresh 96-bit nonce is generated from the OS CSPRNG
//! on every [`seal`] call. GCM nonce reuse under the same key is catastrophic
//! — it breaks both confidentiality and authentication — so no caller-supplied
//! nonce path exists for encryption.

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use thiserror::Error;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of an AES-GCM nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of a GCM authentication tag (16 bytes = 128 bits).
pub const TAG_LEN: usize = 16;

/// Output of a [`seal`] call: nonce, ciphertext, and detached tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedPayload {
    /// Raw nonce bytes, freshly generated for this seal.
    pub nonce: [u8; NONCE_LEN],
    /// Raw ciphertext bytes, without the tag.
    pub ciphertext: Vec<u8>,
    /// Raw authentication tag bytes.
    pub tag: [u8; TAG_LEN],
}

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The session key is the wrong length (must be [`KEY_LEN`] bytes).
    #[error("invalid session key length: expected {KEY_LEN} bytes")]
    InvalidKeyLength,

    /// The nonce is the wrong length (must be [`NONCE_LEN`] bytes).
    #[error("invalid nonce length: expected {NONCE_LEN} bytes")]
    InvalidNonceLength,

    /// The authentication tag is the wrong length (must be [`TAG_LEN`] bytes).
    #[error("invalid tag length: expected {TAG_LEN} bytes")]
    InvalidTagLength,

    /// AES-GCM encryption or authentication failed.
    #[error("aead operation failed")]
    AeadFailure,
}

/// Encrypt plaintext bytes using AES-256-GCM with a fresh random nonce.
///
/// # Errors
///
/// Returns [`CipherError::InvalidKeyLength`] if `key` is not [`KEY_LEN`] bytes.
/// Returns [`CipherError::AeadFailure`] on an internal AEAD error (should be
/// unreachable with a valid key and nonce).
pub fn seal(plaintext: &[u8], key: &[u8]) -> Result<SealedPayload, CipherError> {
    let cipher = build_cipher(key)?;

    // Use OsRng for a cryptographically secure random nonce.
    use aes_gcm::aead::rand_core::RngCore;
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    // The aead API appends the tag to the ciphertext; split it back off so
    // the envelope can carry it as its own field.
    let mut combined = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| CipherError::AeadFailure)?;
    let tag_vec = combined.split_off(combined.len() - TAG_LEN);
    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&tag_vec);

    Ok(SealedPayload {
        nonce: nonce_bytes,
        ciphertext: combined,
        tag,
    })
}

/// Decrypt and authenticate ciphertext with its detached tag.
///
/// # Errors
///
/// Returns a length error if `key`, `nonce`, or `tag` has the wrong size.
/// Returns [`CipherError::AeadFailure`] if authentication fails (wrong key or
/// tampered data); no partial plaintext is ever returned.
pub fn open(
    ciphertext: &[u8],
    tag: &[u8],
    nonce: &[u8],
    key: &[u8],
) -> Result<Vec<u8>, CipherError> {
    let cipher = build_cipher(key)?;
    if nonce.len() != NONCE_LEN {
        return Err(CipherError::InvalidNonceLength);
    }
    if tag.len() != TAG_LEN {
        return Err(CipherError::InvalidTagLength);
    }

    let mut combined = Vec::with_capacity(ciphertext.len() + TAG_LEN);
    combined.extend_from_slice(ciphertext);
    combined.extend_from_slice(tag);

    cipher
        .decrypt(Nonce::from_slice(nonce), combined.as_ref())
        .map_err(|_| CipherError::AeadFailure)
}

fn build_cipher(key: &[u8]) -> Result<Aes256Gcm, CipherError> {
    if key.len() != KEY_LEN {
        return Err(CipherError::InvalidKeyLength);
    }
    Aes256Gcm::new_from_slice(key).map_err(|_| CipherError::InvalidKeyLength)
}
