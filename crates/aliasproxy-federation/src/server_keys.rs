//! Per-domain signing identities and the signed key documents built from them.
//!
//! Identities are loaded once from `server_keys` in the config. A key query for
//! a domain without its own identity falls back to the identity configured
//! under [`DEFAULT_IDENTITY`]. Documents are generated and signed on every
//! request; callers cache them according to `valid_until_ts`.

use std::collections::{BTreeMap, HashMap};

use aliasproxy_common::config::ServerKeyConfig;
use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::{
    error::FederationError,
    keys::{EXAMPLE_SIGNING_KEY, ServerKeyPair},
    signatures::sign_json,
    types::{KeyResponse, VerifyKey},
};

/// Sentinel `server_keys` entry used for domains without a dedicated identity.
pub const DEFAULT_IDENTITY: &str = "default";

/// How long a served key document stays valid.
const KEY_VALIDITY_HOURS: i64 = 24;

/// A configured signing identity.
#[derive(Debug)]
pub struct ServerIdentity {
    /// Name published as `server_name`. `None` means "the requested domain".
    pub server_name: Option<String>,
    pub key_pair: ServerKeyPair,
}

/// Signs key documents for every configured domain.
#[derive(Debug, Default)]
pub struct KeySigner {
    identities: HashMap<String, ServerIdentity>,
}

impl KeySigner {
    /// Build the identity table from config.
    ///
    /// The example key from the shipped config is skipped with a warning.
    /// Any other malformed key is an error.
    pub fn from_config(keys: &HashMap<String, ServerKeyConfig>) -> Result<Self, FederationError> {
        let mut identities = HashMap::with_capacity(keys.len());
        for (domain, cfg) in keys {
            if cfg.signing_key.trim() == EXAMPLE_SIGNING_KEY {
                warn!("Ignoring example server key for {}", domain);
                continue;
            }
            let key_pair = ServerKeyPair::parse(cfg.signing_key.trim()).map_err(|e| {
                FederationError::InvalidServerKey { domain: domain.clone(), reason: e.to_string() }
            })?;
            let server_name = cfg
                .server_name
                .clone()
                .filter(|name| !name.is_empty())
                .or_else(|| (domain != DEFAULT_IDENTITY).then(|| domain.clone()));
            info!("Loaded signing key {} for {}", key_pair.key_id, domain);
            identities.insert(domain.clone(), ServerIdentity { server_name, key_pair });
        }
        Ok(Self { identities })
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// The identity for `domain`, or the default identity.
    pub fn identity_for(&self, domain: &str) -> Option<&ServerIdentity> {
        self.identities.get(domain).or_else(|| self.identities.get(DEFAULT_IDENTITY))
    }

    /// Build and sign the key document for `domain`.
    pub fn server_key_for(&self, domain: &str) -> Result<KeyResponse, FederationError> {
        self.server_key_at(domain, Utc::now())
    }

    /// Build and sign the key document for `domain` as of `now`.
    pub fn server_key_at(
        &self,
        domain: &str,
        now: DateTime<Utc>,
    ) -> Result<KeyResponse, FederationError> {
        let identity = self
            .identity_for(domain)
            .ok_or_else(|| FederationError::KeyNotFound(domain.to_owned()))?;
        let server_name = identity.server_name.clone().unwrap_or_else(|| domain.to_owned());

        let mut verify_keys = BTreeMap::new();
        verify_keys.insert(
            identity.key_pair.key_id.clone(),
            VerifyKey { key: identity.key_pair.public_key_base64() },
        );
        let unsigned = KeyResponse {
            server_name: server_name.clone(),
            valid_until_ts: (now + Duration::hours(KEY_VALIDITY_HOURS)).timestamp_millis(),
            verify_keys,
            old_verify_keys: BTreeMap::new(),
            signatures: BTreeMap::new(),
        };

        let mut doc = serde_json::to_value(&unsigned)?;
        sign_json(&identity.key_pair, &server_name, &mut doc)?;
        Ok(serde_json::from_value(doc)?)
    }
}
