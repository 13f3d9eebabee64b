pub mod discovery;
pub mod federation;
pub mod keys;

use aliasproxy_common::ProxyError;

/// Fallback for every path aliasproxy does not serve.
pub async fn not_found() -> ProxyError {
    ProxyError::UnknownEndpoint
}
