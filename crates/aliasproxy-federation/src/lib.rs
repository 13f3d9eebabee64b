//! # aliasproxy-federation
//!
//! The federation logic behind aliasproxy.
//!
//! ```text
//!  remote server              aliasproxy                    homeserver
//!       │                          │                             │
//!       ├─ query/directory ──────► │ AliasMapper                 │
//!       │   #foo:old.example       │   → #foo:new.example        │
//!       │                          │ DirectoryResolver (cache) ─►│ GET /directory/room
//!       │ ◄── room_id, servers ────┤                             │
//!       │                          │                             │
//!       ├─ key/v2/server ────────► │ KeySigner (ed25519)         │
//!       │ ◄── signed key doc ──────┤                             │
//! ```
//!
//! ## Key concepts
//!
//! - **Alias mapping** (`aliases.rs`): static table, then ordered regex rules.
//! - **Directory resolution** (`directory.rs`): TTL cache in front of the
//!   homeserver that keeps serving the last good answer while lookups fail.
//! - **Homeserver client** (`client.rs`): reqwest client for the room directory.
//! - **Server keys** (`keys.rs`, `server_keys.rs`): per-domain Ed25519
//!   identities and signed `/_matrix/key/v2/server` documents.
//! - **Signatures** (`signatures.rs`): canonical JSON and Matrix JSON signing.

pub mod aliases;
pub mod client;
pub mod directory;
pub mod error;
pub mod keys;
pub mod server_keys;
pub mod signatures;
pub mod types;

pub use aliases::AliasMapper;
pub use client::HomeserverClient;
pub use directory::{CacheEntry, DirectoryResolver, Upstream};
pub use error::FederationError;
pub use keys::ServerKeyPair;
pub use server_keys::KeySigner;
pub use types::{KeyResponse, RoomDirectoryResponse};
