//! Shared test helpers: a cached RSA keypair and client-side envelope
//! operations that mirror what a browser client does.

use std::sync::OnceLock;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use common::protocol::{EncryptedPayload, EncryptedResponse};
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::pkcs8::{DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use serde_json::Value;
use sha2::Sha256;
use tempfile::TempDir;

use crate::crypto::aead;
use crate::keys::store::{PRIVATE_KEY_FILE, PUBLIC_KEY_FILE};
use crate::keys::KeyStore;

/// One 2048-bit keypair shared across the test binary; keygen is slow in
/// debug builds.
pub fn test_keypair_pems() -> &'static (String, String) {
    static PEMS: OnceLock<(String, String)> = OnceLock::new();
    PEMS.get_or_init(|| {
        let private_key = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
        let private_pem = private_key.to_pkcs8_pem(LineEnding::LF).unwrap().to_string();
        let public_pem = RsaPublicKey::from(&private_key)
            .to_public_key_pem(LineEnding::LF)
            .unwrap();
        (private_pem, public_pem)
    })
}

/// A [`KeyStore`] provisioned in a fresh temp directory, seeded with the
/// shared test keypair.
pub async fn provisioned_store() -> (TempDir, KeyStore) {
    let (private_pem, public_pem) = test_keypair_pems();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(PRIVATE_KEY_FILE), private_pem).unwrap();
    std::fs::write(dir.path().join(PUBLIC_KEY_FILE), public_pem).unwrap();
    let store = KeyStore::new(dir.path());
    store.provision().await.unwrap();
    (dir, store)
}

/// A random 32-byte client-side session key.
pub fn fresh_session_key() -> [u8; 32] {
    let mut key = [0u8; 32];
    OsRng.fill_bytes(&mut key);
    key
}

/// RSA-OAEP(SHA-256)-wrap `session_key` under the store's public key, as a
/// client would, returning base64.
pub async fn wrap_session_key(store: &KeyStore, session_key: &[u8]) -> String {
    let pem = store.public_key_pem().await.unwrap();
    let public_key = RsaPublicKey::from_public_key_pem(&pem).unwrap();
    let wrapped = public_key
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), session_key)
        .unwrap();
    BASE64.encode(wrapped)
}

/// Build a complete request envelope for `body`, as a client would.
pub async fn make_envelope(
    store: &KeyStore,
    body: &Value,
    session_key: &[u8],
) -> EncryptedPayload {
    let plaintext = serde_json::to_string(body).unwrap();
    let sealed = aead::seal(plaintext.as_bytes(), session_key).unwrap();
    EncryptedPayload {
        k: wrap_session_key(store, session_key).await,
        iv: BASE64.encode(sealed.nonce),
        data: BASE64.encode(&sealed.ciphertext),
        tag: BASE64.encode(sealed.tag),
    }
}

/// Decrypt a response envelope with the client's session key.
pub fn open_response(envelope: &EncryptedResponse, session_key: &[u8]) -> Value {
    let iv = BASE64.decode(&envelope.iv).unwrap();
    let data = BASE64.decode(&envelope.data).unwrap();
    let tag = BASE64.decode(&envelope.tag).unwrap();
    let plaintext = aead::open(&data, &tag, &iv, session_key).unwrap();
    serde_json::from_slice(&plaintext).unwrap()
}

/// Flip one bit in a base64 field to simulate in-transit tampering.
pub fn flip_first_bit_b64(field: &str) -> String {
    let mut bytes = BASE64.decode(field).unwrap();
    bytes[0] ^= 0x01;
    BASE64.encode(bytes)
}
