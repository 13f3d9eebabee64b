//! # aliasproxy-common
//!
//! Configuration and the HTTP error type shared by the aliasproxy crates.
//! No business logic lives here.

pub mod config;
pub mod error;

pub use config::AppConfig;
pub use error::{ProxyError, ProxyResult};
