//! Hybrid RSA/AES envelope protocol: validation, decryption, response encryption.
//!
//! Inbound bodies on encrypted routes arrive as `{k, iv, data, tag}`
//! envelopes: `k` is the client's ephemeral 256-bit AES key wrapped with
//! RSA-OAEP(SHA-256) under the server's public key; `iv`, `data`, and `tag`
//! are the AES-256-GCM nonce, ciphertext, and authentication tag for the JSON
//! body. The response is encrypted under the session key recovered from the
//! request, so it carries `{iv, data, tag}` with a freshly generated nonce
//! and no wrapped key.
//!
//! # Failure semantics
//!
//! Every failure between "this looks like an envelope" and "here is the
//! plaintext" — bad base64, RSA padding error, GCM tag mismatch, invalid
//! plaintext JSON — maps to [`ServiceError::DecryptionFailure`] and nothing
//! else. The wire must not reveal which step failed.

pub mod session;

pub use session::SessionKey;

use std::future::Future;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use common::protocol::{EncryptedPayload, EncryptedResponse};
use common::ServiceError;
use serde::Serialize;
use serde_json::Value;

use crate::crypto::aead;
use crate::keys::{KeyError, KeyStore};

/// Per-route gate for the envelope protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionPolicy {
    /// The route only accepts enveloped bodies; a plain JSON body is rejected
    /// with the same opaque error as a bad envelope.
    Required,
    /// The route accepts both; a plain body passes through to the handler and
    /// the response is returned unencrypted.
    Optional,
}

/// Result of running [`decrypt_payload`] over an inbound body.
#[derive(Debug)]
pub enum DecryptedPayload {
    /// The body was not an envelope and is returned untouched.
    Passthrough(Value),
    /// The body was an envelope; the plaintext plus the recovered session key.
    Decrypted {
        /// Decrypted JSON request body.
        plaintext: Value,
        /// The ephemeral AES key, for encrypting the paired response.
        session_key: SessionKey,
    },
}

/// How the response to one exchange must be written.
#[derive(Debug)]
pub enum ExchangeReply {
    /// Plain JSON response (the request was plain on an [`EncryptionPolicy::Optional`] route).
    Plain(Value),
    /// Enveloped response under the request's session key.
    Encrypted(EncryptedResponse),
}

/// Structurally recognize an encrypted envelope.
///
/// Returns `true` iff `payload` is an object whose `k`, `iv`, `data`, and
/// `tag` fields are all present and all strings. Extra fields are ignored.
pub fn is_encrypted_payload(payload: &Value) -> bool {
    const ENVELOPE_FIELDS: [&str; 4] = ["k", "iv", "data", "tag"];
    match payload.as_object() {
        Some(map) => ENVELOPE_FIELDS
            .iter()
            .all(|field| map.get(*field).is_some_and(Value::is_string)),
        None => false,
    }
}

/// Decrypt an inbound body if it is an envelope; pass it through otherwise.
///
/// # Errors
///
/// Returns [`ServiceError::DecryptionFailure`] for any failure while
/// unwrapping or decrypting a body that structurally is an envelope.
pub async fn decrypt_payload(
    store: &KeyStore,
    payload: Value,
) -> Result<DecryptedPayload, ServiceError> {
    if !is_encrypted_payload(&payload) {
        return Ok(DecryptedPayload::Passthrough(payload));
    }
    let envelope: EncryptedPayload =
        serde_json::from_value(payload).map_err(|_| ServiceError::DecryptionFailure)?;
    let (plaintext, session_key) = decrypt_envelope(store, &envelope).await?;
    Ok(DecryptedPayload::Decrypted {
        plaintext,
        session_key,
    })
}

/// Recover the plaintext body and session key from an envelope.
///
/// # Errors
///
/// Returns [`ServiceError::DecryptionFailure`] on any decode, unwrap,
/// authentication, or parse failure.
pub async fn decrypt_envelope(
    store: &KeyStore,
    envelope: &EncryptedPayload,
) -> Result<(Value, SessionKey), ServiceError> {
    let wrapped = BASE64
        .decode(&envelope.k)
        .map_err(|_| ServiceError::DecryptionFailure)?;
    let iv = BASE64
        .decode(&envelope.iv)
        .map_err(|_| ServiceError::DecryptionFailure)?;
    let data = BASE64
        .decode(&envelope.data)
        .map_err(|_| ServiceError::DecryptionFailure)?;
    let tag = BASE64
        .decode(&envelope.tag)
        .map_err(|_| ServiceError::DecryptionFailure)?;

    let key_bytes = store
        .unwrap_session_key(&wrapped)
        .await
        .map_err(key_error)?;
    let session_key =
        SessionKey::from_bytes(&key_bytes).ok_or(ServiceError::DecryptionFailure)?;

    let plaintext_bytes = aead::open(&data, &tag, &iv, session_key.as_bytes())
        .map_err(|_| ServiceError::DecryptionFailure)?;
    let plaintext: Value =
        serde_json::from_slice(&plaintext_bytes).map_err(|_| ServiceError::DecryptionFailure)?;

    Ok((plaintext, session_key))
}

/// Encrypt an outbound value under the session key recovered from the
/// matching request, with a fresh nonce.
///
/// An absent handler result (`None`) is coalesced to JSON `null` so the
/// exchange still produces valid ciphertext.
///
/// # Errors
///
/// Returns [`ServiceError::Internal`] if serialization or encryption fails;
/// these are server-side faults, never client errors.
pub fn encrypt_response<T: Serialize>(
    data: Option<&T>,
    session_key: &SessionKey,
) -> Result<EncryptedResponse, ServiceError> {
    let json =
        serde_json::to_string(&data).map_err(|e| ServiceError::Internal(e.to_string()))?;
    let sealed = aead::seal(json.as_bytes(), session_key.as_bytes())
        .map_err(|e| ServiceError::Internal(e.to_string()))?;

    Ok(EncryptedResponse {
        iv: BASE64.encode(sealed.nonce),
        data: BASE64.encode(&sealed.ciphertext),
        tag: BASE64.encode(sealed.tag),
    })
}

/// Run one request/response exchange under the route's encryption policy.
///
/// Decrypts the inbound body, invokes `handler` with the plaintext, and
/// encrypts the handler's output under the recovered session key. A plain
/// body on an [`EncryptionPolicy::Optional`] route runs the handler directly
/// and replies in plain JSON.
///
/// # Errors
///
/// Returns [`ServiceError::DecryptionFailure`] for a plain body on a
/// [`EncryptionPolicy::Required`] route or any envelope decryption failure,
/// and propagates handler errors unchanged.
pub async fn run_exchange<F, Fut>(
    store: &KeyStore,
    policy: EncryptionPolicy,
    body: Value,
    handler: F,
) -> Result<ExchangeReply, ServiceError>
where
    F: FnOnce(Value) -> Fut,
    Fut: Future<Output = Result<Value, ServiceError>>,
{
    match decrypt_payload(store, body).await? {
        DecryptedPayload::Passthrough(plain) => {
            if policy == EncryptionPolicy::Required {
                return Err(ServiceError::DecryptionFailure);
            }
            let result = handler(plain).await?;
            Ok(ExchangeReply::Plain(result))
        }
        DecryptedPayload::Decrypted {
            plaintext,
            session_key,
        } => {
            let result = handler(plaintext).await?;
            let envelope = encrypt_response(Some(&result), &session_key)?;
            Ok(ExchangeReply::Encrypted(envelope))
        }
    }
}

fn key_error(e: KeyError) -> ServiceError {
    match e {
        KeyError::Unwrap => ServiceError::DecryptionFailure,
        // Provisioning faults are server-side; do not disguise them as
        // client decryption failures.
        other => ServiceError::Internal(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::test_util::{
        flip_first_bit_b64, fresh_session_key, make_envelope, open_response, provisioned_store,
        wrap_session_key,
    };

    #[test]
    fn shape_rejects_non_envelopes() {
        assert!(!is_encrypted_payload(&json!({})));
        assert!(!is_encrypted_payload(&json!({"k": "a", "iv": "b", "data": "c"})));
        assert!(!is_encrypted_payload(&json!({"k": 1, "iv": "x", "data": "y", "tag": "z"})));
        assert!(!is_encrypted_payload(&Value::Null));
        assert!(!is_encrypted_payload(&json!([1, 2, 3])));
        assert!(!is_encrypted_payload(&json!("k iv data tag")));
    }

    #[test]
    fn shape_accepts_envelope() {
        assert!(is_encrypted_payload(
            &json!({"k": "a", "iv": "b", "data": "c", "tag": "d"})
        ));
        // Extra fields do not disqualify an otherwise well-formed envelope.
        assert!(is_encrypted_payload(
            &json!({"k": "a", "iv": "b", "data": "c", "tag": "d", "v": 2})
        ));
    }

    #[tokio::test]
    async fn non_envelope_passes_through_unchanged() {
        let (_dir, store) = provisioned_store().await;
        let body = json!({"name": "alice", "n": 3});
        match decrypt_payload(&store, body.clone()).await.unwrap() {
            DecryptedPayload::Passthrough(v) => assert_eq!(v, body),
            DecryptedPayload::Decrypted { .. } => panic!("plain body treated as envelope"),
        }
    }

    #[tokio::test]
    async fn end_to_end_exchange() {
        let (_dir, store) = provisioned_store().await;
        let session_key = fresh_session_key();
        let envelope = make_envelope(&store, &json!({"a": 1}), &session_key).await;
        let request_iv = envelope.iv.clone();

        let (plaintext, recovered) = decrypt_envelope(&store, &envelope).await.unwrap();
        assert_eq!(plaintext, json!({"a": 1}));
        assert_eq!(recovered.as_bytes(), session_key);

        let reply = encrypt_response(Some(&json!({"b": 2})), &recovered).unwrap();
        assert_ne!(reply.iv, request_iv);
        assert_eq!(open_response(&reply, &session_key), json!({"b": 2}));
    }

    #[tokio::test]
    async fn tampered_tag_yields_generic_error() {
        let (_dir, store) = provisioned_store().await;
        let session_key = fresh_session_key();
        let mut envelope = make_envelope(&store, &json!({"a": 1}), &session_key).await;
        envelope.tag = flip_first_bit_b64(&envelope.tag);

        let err = decrypt_envelope(&store, &envelope).await.unwrap_err();
        assert!(matches!(err, ServiceError::DecryptionFailure));
        assert_eq!(err.to_string(), "Failed to decrypt payload");
    }

    #[tokio::test]
    async fn tampered_data_yields_generic_error() {
        let (_dir, store) = provisioned_store().await;
        let session_key = fresh_session_key();
        let mut envelope = make_envelope(&store, &json!({"a": 1}), &session_key).await;
        envelope.data = flip_first_bit_b64(&envelope.data);

        let err = decrypt_envelope(&store, &envelope).await.unwrap_err();
        assert!(matches!(err, ServiceError::DecryptionFailure));
    }

    #[tokio::test]
    async fn tampered_wrapped_key_yields_generic_error() {
        let (_dir, store) = provisioned_store().await;
        let session_key = fresh_session_key();
        let mut envelope = make_envelope(&store, &json!({"a": 1}), &session_key).await;
        envelope.k = flip_first_bit_b64(&envelope.k);

        let err = decrypt_envelope(&store, &envelope).await.unwrap_err();
        assert!(matches!(err, ServiceError::DecryptionFailure));
        assert_eq!(err.to_string(), "Failed to decrypt payload");
    }

    #[tokio::test]
    async fn malformed_base64_yields_generic_error() {
        let (_dir, store) = provisioned_store().await;
        let session_key = fresh_session_key();
        let mut envelope = make_envelope(&store, &json!({"a": 1}), &session_key).await;
        envelope.data = "!!!not base64!!!".into();

        let err = decrypt_envelope(&store, &envelope).await.unwrap_err();
        assert!(matches!(err, ServiceError::DecryptionFailure));
    }

    #[tokio::test]
    async fn non_json_plaintext_yields_generic_error() {
        let (_dir, store) = provisioned_store().await;
        let session_key = fresh_session_key();
        let sealed = crate::crypto::aead::seal(b"not json at all", &session_key).unwrap();
        let envelope = EncryptedPayload {
            k: wrap_session_key(&store, &session_key).await,
            iv: BASE64.encode(sealed.nonce),
            data: BASE64.encode(&sealed.ciphertext),
            tag: BASE64.encode(sealed.tag),
        };

        let err = decrypt_envelope(&store, &envelope).await.unwrap_err();
        assert!(matches!(err, ServiceError::DecryptionFailure));
    }

    #[tokio::test]
    async fn wrapped_key_with_bad_length_rejected() {
        let (_dir, store) = provisioned_store().await;
        let session_key = fresh_session_key();
        let sealed = crate::crypto::aead::seal(b"{}", &session_key).unwrap();
        // Wrap only half the key; decryption must fail before the AEAD runs.
        let envelope = EncryptedPayload {
            k: wrap_session_key(&store, &session_key[..16]).await,
            iv: BASE64.encode(sealed.nonce),
            data: BASE64.encode(&sealed.ciphertext),
            tag: BASE64.encode(sealed.tag),
        };

        let err = decrypt_envelope(&store, &envelope).await.unwrap_err();
        assert!(matches!(err, ServiceError::DecryptionFailure));
    }

    #[test]
    fn absent_response_encrypts_as_null() {
        let session_key = fresh_session_key();
        let key = SessionKey::from_bytes(&session_key).unwrap();

        let reply = encrypt_response::<Value>(None, &key).unwrap();

        assert_eq!(open_response(&reply, &session_key), Value::Null);
    }

    #[tokio::test]
    async fn required_policy_rejects_plain_body() {
        let (_dir, store) = provisioned_store().await;
        let err = run_exchange(
            &store,
            EncryptionPolicy::Required,
            json!({"a": 1}),
            |v| async move { Ok(v) },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::DecryptionFailure));
    }

    #[tokio::test]
    async fn optional_policy_passes_plain_body_through() {
        let (_dir, store) = provisioned_store().await;
        let reply = run_exchange(
            &store,
            EncryptionPolicy::Optional,
            json!({"a": 1}),
            |v| async move { Ok(v) },
        )
        .await
        .unwrap();
        match reply {
            ExchangeReply::Plain(v) => assert_eq!(v, json!({"a": 1})),
            ExchangeReply::Encrypted(_) => panic!("plain exchange came back encrypted"),
        }
    }

    #[tokio::test]
    async fn required_policy_runs_encrypted_exchange() {
        let (_dir, store) = provisioned_store().await;
        let session_key = fresh_session_key();
        let envelope = make_envelope(&store, &json!({"a": 1}), &session_key).await;
        let body = serde_json::to_value(&envelope).unwrap();

        let reply = run_exchange(&store, EncryptionPolicy::Required, body, |v| async move {
            Ok(json!({"echo": v}))
        })
        .await
        .unwrap();

        match reply {
            ExchangeReply::Encrypted(response) => {
                assert_eq!(
                    open_response(&response, &session_key),
                    json!({"echo": {"a": 1}})
                );
            }
            ExchangeReply::Plain(_) => panic!("encrypted exchange came back plain"),
        }
    }

    #[tokio::test]
    async fn handler_errors_propagate_unchanged() {
        let (_dir, store) = provisioned_store().await;
        let session_key = fresh_session_key();
        let envelope = make_envelope(&store, &json!({"a": 1}), &session_key).await;
        let body = serde_json::to_value(&envelope).unwrap();

        let err = run_exchange(&store, EncryptionPolicy::Required, body, |_| async move {
            Err(ServiceError::BadRequest("unknown operation".into()))
        })
        .await
        .unwrap_err();

        assert!(matches!(err, ServiceError::BadRequest(_)));
    }
}
