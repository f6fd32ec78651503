//! RS256 signing key lifecycle (C2): load one active keypair at startup and
//! expose its public JWK form. Grounded on the key-generation and
//! PEM/JWK-conversion shape used for JWT signing, adapted from a multi-key,
//! database-backed rotation scheme down to the single file/env-backed key
//! this spec calls for.

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};

use crate::error::CryptoError;

const KEY_BITS: usize = 2048;

/// Where the active signing keypair came from, so callers/tests can assert
/// on the load path taken without re-deriving it from the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Env,
    File,
    Generated,
    InMemory,
}

/// One RSA keypair plus its stable key id, ready to sign and to publish.
pub struct RsaKeyManager {
    private_key: RsaPrivateKey,
    public_key: RsaPublicKey,
    kid: String,
    source: KeySource,
}

/// The subset of RFC 7517 a single RS256 signing key publishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonWebKey {
    pub kty: String,
    #[serde(rename = "use")]
    pub usage: String,
    pub alg: String,
    pub kid: String,
    pub n: String,
    pub e: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwksResponse {
    pub keys: Vec<JsonWebKey>,
}

/// Where to look for configured key material, matching `config-engine`'s
/// `KeyMaterial` enum without creating a dependency from `crypto` on it.
pub enum KeySourceConfig {
    /// PEM text, possibly base64-wrapped, taken directly from an env var.
    Inline(String),
    /// A path to a PEM file on disk.
    Path(PathBuf),
}

impl RsaKeyManager {
    /// Loads the active signing key following spec §4.2's order: configured
    /// PEM (env or file), else generate a fresh keypair and persist it to
    /// `persist_dir` (mode 0600 for the private key, 0644 for the public),
    /// falling back to an in-memory key with a warning if the directory
    /// isn't writable.
    pub fn load(
        configured: Option<KeySourceConfig>,
        persist_dir: Option<&Path>,
    ) -> Result<Self, CryptoError> {
        if let Some(source) = configured {
            let (pem, source_kind) = match source {
                KeySourceConfig::Inline(pem) => (pem, KeySource::Env),
                KeySourceConfig::Path(path) => {
                    let pem = std::fs::read_to_string(&path).map_err(|e| {
                        CryptoError::KeyGenerationFailed(format!(
                            "failed to read key file {}: {e}",
                            path.display()
                        ))
                    })?;
                    (pem, KeySource::File)
                }
            };
            let private_key = RsaPrivateKey::from_pkcs1_pem(pem_body(&pem)?.as_str())
                .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))?;
            let public_key = RsaPublicKey::from(&private_key);
            let kid = stable_kid(persist_dir, &public_key)?;
            return Ok(Self {
                private_key,
                public_key,
                kid,
                source: source_kind,
            });
        }

        let (private_key, public_key) = generate_keypair()?;

        if let Some(dir) = persist_dir {
            match persist(dir, &private_key, &public_key) {
                Ok(kid) => {
                    tracing::info!(kid = %kid, "generated and persisted new RSA signing key");
                    return Ok(Self {
                        private_key,
                        public_key,
                        kid,
                        source: KeySource::Generated,
                    });
                }
                Err(err) => {
                    tracing::warn!(error = %err, "could not persist generated signing key, keeping it in memory only");
                }
            }
        }

        let kid = format!("kid-{}", uuid::Uuid::new_v4());
        Ok(Self {
            private_key,
            public_key,
            kid,
            source: KeySource::InMemory,
        })
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn source(&self) -> KeySource {
        self.source
    }

    /// PKCS#1 PEM of the private key, for handing to a JWT encoder.
    pub fn private_key_pem(&self) -> Result<String, CryptoError> {
        self.private_key
            .to_pkcs1_pem(LineEnding::LF)
            .map(|pem| pem.to_string())
            .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))
    }

    /// PKCS#1 PEM of the public key, for handing to a JWT decoder.
    pub fn public_key_pem(&self) -> Result<String, CryptoError> {
        use rsa::pkcs1::EncodeRsaPublicKey;
        self.public_key
            .to_pkcs1_pem(LineEnding::LF)
            .map(|pem| pem.to_string())
            .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))
    }

    /// The published JWKS, currently always a single active key (spec's
    /// rotation-to-multiple-keys extension point is documented, not built).
    pub fn jwks(&self) -> JwksResponse {
        JwksResponse {
            keys: vec![self.jwk()],
        }
    }

    fn jwk(&self) -> JsonWebKey {
        JsonWebKey {
            kty: "RSA".to_string(),
            usage: "sig".to_string(),
            alg: "RS256".to_string(),
            kid: self.kid.clone(),
            n: URL_SAFE_NO_PAD.encode(self.public_key.n().to_bytes_be()),
            e: URL_SAFE_NO_PAD.encode(self.public_key.e().to_bytes_be()),
        }
    }
}

fn generate_keypair() -> Result<(RsaPrivateKey, RsaPublicKey), CryptoError> {
    let mut rng = rand::thread_rng();
    let private_key = RsaPrivateKey::new(&mut rng, KEY_BITS)
        .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))?;
    let public_key = RsaPublicKey::from(&private_key);
    Ok((private_key, public_key))
}

/// Accepts PEM text that may have been base64-wrapped by the deploy
/// pipeline (a common way to pass multi-line PEM through a single-line env
/// var) — if it doesn't already look like PEM, base64-decode it first.
fn pem_body(raw: &str) -> Result<String, CryptoError> {
    if raw.trim_start().starts_with("-----BEGIN") {
        Ok(raw.to_string())
    } else {
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(raw.trim())
            .map_err(|_| CryptoError::InvalidFormat)?;
        String::from_utf8(decoded).map_err(|_| CryptoError::InvalidUtf8)
    }
}

fn persist(
    dir: &Path,
    private_key: &RsaPrivateKey,
    public_key: &RsaPublicKey,
) -> Result<String, CryptoError> {
    use rsa::pkcs1::EncodeRsaPublicKey;

    std::fs::create_dir_all(dir).map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))?;

    let private_pem = private_key
        .to_pkcs1_pem(LineEnding::LF)
        .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))?;
    let public_pem = public_key
        .to_pkcs1_pem(LineEnding::LF)
        .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))?;

    let kid = format!("kid-{}", uuid::Uuid::new_v4());

    let private_path = dir.join("jwt_private_key.pem");
    let public_path = dir.join("jwt_public_key.pem");
    let kid_path = dir.join("jwt_kid");

    std::fs::write(&private_path, private_pem.as_bytes())
        .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))?;
    std::fs::write(&public_path, &public_pem)
        .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))?;
    std::fs::write(&kid_path, &kid)
        .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&private_path, std::fs::Permissions::from_mode(0o600))
            .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))?;
        std::fs::set_permissions(&public_path, std::fs::Permissions::from_mode(0o644))
            .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))?;
    }

    Ok(kid)
}

/// A `kid` must survive restarts when the key itself does. When loading from
/// env/file, prefer a sibling `jwt_kid` file if one exists (written the first
/// time this key was generated); otherwise derive one deterministically from
/// the public key so repeated loads of the same key agree.
fn stable_kid(persist_dir: Option<&Path>, public_key: &RsaPublicKey) -> Result<String, CryptoError> {
    if let Some(dir) = persist_dir {
        let kid_path = dir.join("jwt_kid");
        if let Ok(existing) = std::fs::read_to_string(&kid_path) {
            return Ok(existing.trim().to_string());
        }
    }

    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(public_key.n().to_bytes_be());
    hasher.update(public_key.e().to_bytes_be());
    let digest = hasher.finalize();
    Ok(format!("kid-{}", hex::encode(&digest[..8])))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_in_memory_key_when_nothing_configured() {
        let manager = RsaKeyManager::load(None, None).unwrap();
        assert_eq!(manager.source(), KeySource::InMemory);
        assert!(!manager.kid().is_empty());
        assert!(manager.private_key_pem().unwrap().contains("BEGIN RSA PRIVATE KEY"));
    }

    #[test]
    fn jwks_contains_exactly_one_key() {
        let manager = RsaKeyManager::load(None, None).unwrap();
        let jwks = manager.jwks();
        assert_eq!(jwks.keys.len(), 1);
        assert_eq!(jwks.keys[0].kid, manager.kid());
        assert_eq!(jwks.keys[0].alg, "RS256");
    }

    #[test]
    fn loading_same_configured_pem_yields_same_kid() {
        let generated = RsaKeyManager::load(None, None).unwrap();
        let pem = generated.private_key_pem().unwrap();

        let a = RsaKeyManager::load(Some(KeySourceConfig::Inline(pem.clone())), None).unwrap();
        let b = RsaKeyManager::load(Some(KeySourceConfig::Inline(pem)), None).unwrap();
        assert_eq!(a.kid(), b.kid());
    }

    #[test]
    fn persists_and_reloads_from_disk_with_stable_kid() {
        let dir = std::env::temp_dir().join(format!("koauth-test-keys-{}", uuid::Uuid::new_v4()));
        let generated = RsaKeyManager::load(None, Some(&dir)).unwrap();
        assert_eq!(generated.source(), KeySource::Generated);

        let pem = std::fs::read_to_string(dir.join("jwt_private_key.pem")).unwrap();
        let reloaded =
            RsaKeyManager::load(Some(KeySourceConfig::Inline(pem)), Some(&dir)).unwrap();
        assert_eq!(reloaded.kid(), generated.kid());

        std::fs::remove_dir_all(&dir).ok();
    }
}
