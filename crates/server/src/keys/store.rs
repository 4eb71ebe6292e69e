//! [`KeyStore`]: single-flight provisioning and in-memory cache of the RSA keypair.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::info;

/// RSA modulus size in bits.
pub const RSA_BITS: usize = 2048;

/// File name of the PKCS8 PEM private key under the keys directory.
pub const PRIVATE_KEY_FILE: &str = "server_private.pem";

/// File name of the SPKI PEM public key under the keys directory.
pub const PUBLIC_KEY_FILE: &str = "server_public.pem";

/// Errors produced by the key layer.
#[derive(Debug, Error)]
pub enum KeyError {
    /// Reading or writing a PEM file failed.
    #[error("key file I/O failed for {path}: {source}")]
    Io {
        /// Path of the file being read or written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Generating a fresh RSA keypair failed.
    #[error("RSA keypair generation failed: {0}")]
    Generation(String),

    /// The private key could not be parsed or encoded.
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// The public key could not be parsed or encoded.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// RSA-OAEP unwrap of a wrapped session key failed.
    ///
    /// Carries no detail: padding failures must be indistinguishable from any
    /// other decryption failure by the time an error reaches a caller.
    #[error("session key unwrap failed")]
    Unwrap,
}

/// Cached key material: the parsed private key plus the public PEM as it
/// exists on disk (served verbatim so clients always see stable bytes).
struct KeyMaterial {
    private_key: RsaPrivateKey,
    public_pem: String,
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print private key material — not even in debug builds.
        f.write_str("KeyMaterial([REDACTED])")
    }
}

/// Process-wide store for the server's RSA keypair.
///
/// Lifecycle is `uninitialized → initializing → ready`, enforced by a
/// single-flight [`OnceCell`]: concurrent first callers share one
/// initialization, so exactly one keypair is ever generated or loaded even if
/// several requests race at process start. Once ready, all accessors are
/// in-memory reads; disk is never touched again on the request path.
#[derive(Clone, Debug)]
pub struct KeyStore {
    keys_dir: PathBuf,
    material: Arc<OnceCell<Arc<KeyMaterial>>>,
}

impl KeyStore {
    /// Create a store rooted at `keys_dir`. No I/O happens until first use.
    pub fn new(keys_dir: impl Into<PathBuf>) -> Self {
        Self {
            keys_dir: keys_dir.into(),
            material: Arc::new(OnceCell::new()),
        }
    }

    /// Returns `true` once the keypair is provisioned and cached.
    pub fn is_ready(&self) -> bool {
        self.material.initialized()
    }

    /// Ensure the keypair exists: load it from disk if both PEM files are
    /// present, otherwise generate a 2048-bit pair and persist it.
    ///
    /// Idempotent: a pre-existing valid pair is left byte-for-byte untouched,
    /// and concurrent callers share a single initialization.
    ///
    /// # Errors
    ///
    /// Returns an error if generation, persistence, or parsing fails. Callers
    /// at startup should treat this as fatal.
    pub async fn provision(&self) -> Result<(), KeyError> {
        self.material().await.map(|_| ())
    }

    /// The SPKI PEM public key, provisioning the keypair first if needed.
    ///
    /// Served openly so clients can wrap their ephemeral session keys; there
    /// is no authentication requirement on this accessor.
    pub async fn public_key_pem(&self) -> Result<String, KeyError> {
        Ok(self.material().await?.public_pem.clone())
    }

    /// Unwrap an RSA-OAEP(SHA-256)-wrapped session key with the private key.
    ///
    /// The private key itself never leaves the store.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Unwrap`] if the ciphertext does not decrypt under
    /// the current private key, with no further detail.
    pub async fn unwrap_session_key(&self, wrapped: &[u8]) -> Result<Vec<u8>, KeyError> {
        let material = self.material().await?;
        material
            .private_key
            .decrypt(Oaep::new::<Sha256>(), wrapped)
            .map_err(|_| KeyError::Unwrap)
    }

    async fn material(&self) -> Result<&Arc<KeyMaterial>, KeyError> {
        let keys_dir = self.keys_dir.clone();
        self.material
            .get_or_try_init(|| init_material(keys_dir))
            .await
    }
}

async fn init_material(keys_dir: PathBuf) -> Result<Arc<KeyMaterial>, KeyError> {
    let private_path = keys_dir.join(PRIVATE_KEY_FILE);
    let public_path = keys_dir.join(PUBLIC_KEY_FILE);

    if file_exists(&private_path).await && file_exists(&public_path).await {
        load_existing(&private_path, &public_path).await
    } else {
        generate_and_persist(&keys_dir, &private_path, &public_path).await
    }
}

async fn file_exists(path: &Path) -> bool {
    matches!(tokio::fs::try_exists(path).await, Ok(true))
}

async fn load_existing(
    private_path: &Path,
    public_path: &Path,
) -> Result<Arc<KeyMaterial>, KeyError> {
    let private_pem = read_pem(private_path).await?;
    let public_pem = read_pem(public_path).await?;

    let private_key = RsaPrivateKey::from_pkcs8_pem(&private_pem)
        .map_err(|e| KeyError::InvalidPrivateKey(e.to_string()))?;
    // Parse the public PEM to reject a corrupt file early, but keep serving
    // the on-disk bytes so the published key stays stable.
    RsaPublicKey::from_public_key_pem(&public_pem)
        .map_err(|e| KeyError::InvalidPublicKey(e.to_string()))?;

    info!(path = %private_path.display(), "loaded existing RSA keypair");
    Ok(Arc::new(KeyMaterial {
        private_key,
        public_pem,
    }))
}

async fn generate_and_persist(
    keys_dir: &Path,
    private_path: &Path,
    public_path: &Path,
) -> Result<Arc<KeyMaterial>, KeyError> {
    // Keygen is CPU-heavy (prime search); keep it off the async workers.
    let private_key = tokio::task::spawn_blocking(|| RsaPrivateKey::new(&mut OsRng, RSA_BITS))
        .await
        .map_err(|e| KeyError::Generation(e.to_string()))?
        .map_err(|e| KeyError::Generation(e.to_string()))?;

    let private_pem = private_key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| KeyError::InvalidPrivateKey(e.to_string()))?;
    let public_pem = RsaPublicKey::from(&private_key)
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| KeyError::InvalidPublicKey(e.to_string()))?;

    tokio::fs::create_dir_all(keys_dir)
        .await
        .map_err(|e| io_err(keys_dir, e))?;
    write_private_pem(private_path, private_pem.as_bytes())
        .await
        .map_err(|e| io_err(private_path, e))?;
    tokio::fs::write(public_path, public_pem.as_bytes())
        .await
        .map_err(|e| io_err(public_path, e))?;

    info!(path = %private_path.display(), "generated and persisted new RSA keypair");
    Ok(Arc::new(KeyMaterial {
        private_key,
        public_pem,
    }))
}

fn io_err(path: &Path, source: std::io::Error) -> KeyError {
    KeyError::Io {
        path: path.to_path_buf(),
        source,
    }
}

async fn read_pem(path: &Path) -> Result<String, KeyError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| io_err(path, e))
}

/// Write the private PEM with owner-only read/write permissions.
///
/// The file is created with mode 0600 up front; at no point does an
/// other-readable private key file exist on disk.
#[cfg(unix)]
async fn write_private_pem(path: &Path, pem: &[u8]) -> std::io::Result<()> {
    use tokio::io::AsyncWriteExt;

    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .await?;
    file.write_all(pem).await?;
    file.flush().await
}

#[cfg(not(unix))]
async fn write_private_pem(path: &Path, pem: &[u8]) -> std::io::Result<()> {
    tokio::fs::write(path, pem).await
}
