//! Ed25519 server signing keys.
//!
//! Each configured domain owns an Ed25519 key pair used to sign the key
//! document served at `/_matrix/key/v2/server`. Remote servers verify
//! federation traffic using the public half published there.
//!
//! # Config format
//! Keys are written as `ed25519 <version> <seed>`, where `<seed>` is the
//! unpadded standard base64 encoding of the 32-byte private seed. The key ID
//! follows the Matrix convention `ed25519:<version>`.
//!
//! # Encodings
//! Public keys are published as unpadded standard base64. Signatures are
//! unpadded base64url.

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand_core::OsRng;

use crate::error::FederationError;

/// Algorithm tag accepted in signing key strings.
pub const KEY_ALGORITHM: &str = "ed25519";

/// The key shipped in example configs. It is never used for signing.
pub const EXAMPLE_SIGNING_KEY: &str = "ed25519 0 AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

// ─── Key pair ────────────────────────────────────────────────────────────────

/// An Ed25519 signing key pair plus its Matrix key ID.
pub struct ServerKeyPair {
    /// Key ID in the format `ed25519:<version>`.
    pub key_id: String,
    signing_key: SigningKey,
}

impl std::fmt::Debug for ServerKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerKeyPair").field("key_id", &self.key_id).finish_non_exhaustive()
    }
}

impl ServerKeyPair {
    /// Generate a brand-new random Ed25519 key pair.
    ///
    /// The version is the base64url encoding of the first 4 public key bytes.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let version = URL_SAFE_NO_PAD.encode(&signing_key.verifying_key().as_bytes()[..4]);
        Self { key_id: key_id_for(&version), signing_key }
    }

    /// Parse a `ed25519 <version> <seed>` config string.
    pub fn parse(config: &str) -> Result<Self, FederationError> {
        let parts: Vec<&str> = config.split(' ').collect();
        let [algorithm, version, seed] = parts.as_slice() else {
            return Err(FederationError::KeyLoad(format!(
                "expected 3 space-separated parts, got {}",
                parts.len()
            )));
        };
        if *algorithm != KEY_ALGORITHM {
            return Err(FederationError::KeyLoad(format!("unsupported algorithm '{algorithm}'")));
        }
        if version.is_empty() {
            return Err(FederationError::KeyLoad("empty key version".into()));
        }
        let seed = STANDARD_NO_PAD
            .decode(seed.trim_end_matches('='))
            .map_err(|e| FederationError::KeyLoad(e.to_string()))?;
        Self::from_seed(version, &seed)
    }

    /// Reconstruct a `ServerKeyPair` from a key version and raw 32-byte seed.
    pub fn from_seed(version: &str, seed: &[u8]) -> Result<Self, FederationError> {
        let bytes: [u8; 32] = seed
            .try_into()
            .map_err(|_| FederationError::KeyLoad("seed must be exactly 32 bytes".into()))?;
        Ok(Self { key_id: key_id_for(version), signing_key: SigningKey::from_bytes(&bytes) })
    }

    /// The part of the key ID after `ed25519:`.
    pub fn version(&self) -> &str {
        self.key_id.strip_prefix("ed25519:").unwrap_or(&self.key_id)
    }

    /// Return the 32-byte seed for persistence in config.
    pub fn seed_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Return the public verifying key.
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Return the public key as unpadded standard base64 (for `verify_keys`).
    pub fn public_key_base64(&self) -> String {
        STANDARD_NO_PAD.encode(self.signing_key.verifying_key().as_bytes())
    }

    /// Sign arbitrary bytes and return the base64url-encoded signature.
    pub fn sign_bytes(&self, bytes: &[u8]) -> String {
        let sig = self.signing_key.sign(bytes);
        URL_SAFE_NO_PAD.encode(sig.to_bytes())
    }

    /// Sign a canonical JSON string and return the base64url-encoded signature.
    pub fn sign_json(&self, canonical_json: &str) -> String {
        self.sign_bytes(canonical_json.as_bytes())
    }

    /// Render the key in the `ed25519 <version> <seed>` config format.
    pub fn to_config_string(&self) -> String {
        format!("{} {} {}", KEY_ALGORITHM, self.version(), STANDARD_NO_PAD.encode(self.seed_bytes()))
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn key_id_for(version: &str) -> String {
    format!("{}:{}", KEY_ALGORITHM, version)
}

/// Verify an Ed25519 signature.
///
/// * `pubkey_base64`: unpadded standard base64 32-byte verifying key
/// * `sig_base64`: unpadded base64url 64-byte signature
/// * `message`: original signed bytes
pub fn verify_signature(
    pubkey_base64: &str,
    sig_base64: &str,
    message: &[u8],
) -> Result<(), FederationError> {
    use ed25519_dalek::Verifier;

    let pubkey_bytes = STANDARD_NO_PAD
        .decode(pubkey_base64)
        .map_err(|_| FederationError::InvalidSignature)?;

    let sig_bytes = URL_SAFE_NO_PAD
        .decode(sig_base64)
        .map_err(|_| FederationError::InvalidSignature)?;

    let verifying_key = VerifyingKey::from_bytes(
        pubkey_bytes
            .as_slice()
            .try_into()
            .map_err(|_| FederationError::InvalidSignature)?,
    )
    .map_err(|_| FederationError::InvalidSignature)?;

    let signature = ed25519_dalek::Signature::from_bytes(
        sig_bytes
            .as_slice()
            .try_into()
            .map_err(|_| FederationError::InvalidSignature)?,
    );

    verifying_key.verify(message, &signature).map_err(|_| FederationError::InvalidSignature)
}
