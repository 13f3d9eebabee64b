//! Room directory resolution with a TTL cache.
//!
//! Every target alias has at most one [`CacheEntry`]. Resolution works like
//! this:
//!
//! 1. A cached entry younger than the TTL is returned as-is, whether it
//!    records a room or a failed lookup.
//! 2. Otherwise the upstream is asked. Transport errors, non-2xx statuses,
//!    timeouts and undecodable bodies all count as a failed lookup.
//! 3. A failed lookup never replaces a cached room. The old entry is served
//!    and keeps its original `fetched_at`, so the next query retries.
//! 4. Anything else is stored with `fetched_at = now`.
//!
//! The cache lock is never held across the upstream call.

use std::{collections::HashMap, future::Future, time::Duration};

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::{client::HomeserverClient, error::FederationError, types::RoomDirectoryResponse};

/// Source of authoritative alias lookups.
pub trait Upstream: Send + Sync {
    fn lookup(
        &self,
        alias: &str,
    ) -> impl Future<Output = Result<RoomDirectoryResponse, FederationError>> + Send;
}

// ─── Cache ───────────────────────────────────────────────────────────────────

/// The last known resolution of a target alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub target_alias: String,
    pub room_id: String,
    pub servers: Vec<String>,
    /// Unix seconds of the attempt that produced this entry.
    pub fetched_at: i64,
    /// `false` marks a cached failed lookup.
    pub exists: bool,
}

impl CacheEntry {
    fn found(target_alias: &str, resp: RoomDirectoryResponse, now: i64) -> Self {
        Self {
            target_alias: target_alias.to_owned(),
            room_id: resp.room_id,
            servers: resp.servers,
            fetched_at: now,
            exists: true,
        }
    }

    fn missing(target_alias: &str, now: i64) -> Self {
        Self {
            target_alias: target_alias.to_owned(),
            room_id: String::new(),
            servers: Vec::new(),
            fetched_at: now,
            exists: false,
        }
    }

    fn is_fresh(&self, ttl: i64, now: i64) -> bool {
        self.fetched_at.saturating_add(ttl) > now
    }

    /// The federation response body, if this entry records a room.
    pub fn to_response(&self) -> Option<RoomDirectoryResponse> {
        self.exists.then(|| RoomDirectoryResponse {
            room_id: self.room_id.clone(),
            servers: self.servers.clone(),
        })
    }
}

// ─── Resolver ────────────────────────────────────────────────────────────────

/// Resolves target aliases through the cache and the upstream homeserver.
///
/// Shared between request handlers via `Arc`.
pub struct DirectoryResolver<U = HomeserverClient> {
    upstream: U,
    ttl_secs: i64,
    cache: RwLock<HashMap<String, CacheEntry>>,
}

impl<U: Upstream> DirectoryResolver<U> {
    pub fn new(upstream: U, ttl: Duration) -> Self {
        Self {
            upstream,
            ttl_secs: i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve `target_alias` as of the current time.
    pub async fn resolve(&self, target_alias: &str) -> CacheEntry {
        self.resolve_at(target_alias, Utc::now().timestamp()).await
    }

    /// Resolve `target_alias` as of `now` (unix seconds).
    pub async fn resolve_at(&self, target_alias: &str, now: i64) -> CacheEntry {
        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.get(target_alias) {
                if entry.is_fresh(self.ttl_secs, now) {
                    debug!("Directory cache hit: {} (exists: {})", target_alias, entry.exists);
                    return entry.clone();
                }
            }
        }

        let attempt = match self.upstream.lookup(target_alias).await {
            Ok(resp) => {
                info!(
                    "Successfully resolved {} -> {} with {} servers",
                    target_alias,
                    resp.room_id,
                    resp.servers.len()
                );
                CacheEntry::found(target_alias, resp, now)
            }
            Err(e) => {
                warn!("Failed to resolve {}: {}", target_alias, e);
                CacheEntry::missing(target_alias, now)
            }
        };

        let mut cache = self.cache.write().await;
        if !attempt.exists {
            if let Some(prior) = cache.get(target_alias).filter(|e| e.exists) {
                warn!("Using expired cached result for {} as new resolving failed", target_alias);
                return prior.clone();
            }
        }
        cache.insert(target_alias.to_owned(), attempt.clone());
        attempt
    }

    /// Current cache entry for `target_alias`, without touching the upstream.
    pub async fn cached(&self, target_alias: &str) -> Option<CacheEntry> {
        self.cache.read().await.get(target_alias).cloned()
    }
}
