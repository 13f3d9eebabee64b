//! Homeserver room directory client.
//!
//! [`HomeserverClient`] looks aliases up through the homeserver's client-server
//! API (`GET /_matrix/client/v3/directory/room/{alias}`). Only the scheme,
//! userinfo, host and port of the configured URL are used; reqwest turns URL
//! userinfo into basic auth.

use std::time::Duration;

use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::{directory::Upstream, error::FederationError, types::RoomDirectoryResponse};

const DIRECTORY_PATH: [&str; 5] = ["_matrix", "client", "v3", "directory", "room"];

/// Async HTTP client for the upstream homeserver.
#[derive(Debug, Clone)]
pub struct HomeserverClient {
    base_url: Url,
    http: Client,
}

impl HomeserverClient {
    /// Create a client for `base_url`. `timeout` bounds each lookup end to end;
    /// `None` waits indefinitely.
    pub fn new(base_url: Url, timeout: Option<Duration>) -> Result<Self, FederationError> {
        if base_url.cannot_be_a_base() {
            return Err(FederationError::InvalidHomeserver(base_url.to_string()));
        }
        let mut builder =
            Client::builder().user_agent(concat!("aliasproxy/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self { base_url, http: builder.build()? })
    }

    /// Build the directory URL for `alias`, percent-encoding it as a single
    /// path segment.
    pub fn directory_url(&self, alias: &str) -> Result<Url, FederationError> {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|_| FederationError::InvalidHomeserver(self.base_url.to_string()))?
            .clear()
            .extend(DIRECTORY_PATH)
            .push(alias);
        Ok(url)
    }
}

impl Upstream for HomeserverClient {
    async fn lookup(&self, alias: &str) -> Result<RoomDirectoryResponse, FederationError> {
        let url = self.directory_url(alias)?;
        debug!("Directory GET {}", url.path());

        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FederationError::RemoteStatus(alias.to_owned(), status.as_u16()));
        }
        let body: RoomDirectoryResponse = resp
            .json()
            .await
            .map_err(|e| FederationError::RemoteProtocol(alias.to_owned(), e.to_string()))?;
        if body.room_id.is_empty() {
            return Err(FederationError::RemoteProtocol(alias.to_owned(), "missing room_id".into()));
        }
        Ok(body)
    }
}
