//! SQLite-backed store of named, versioned cache sets.
//!
//! This module provides the persistent request/response cache using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Cache sets addressed by `{prefix}-{purpose}-{version}` names
//! - Entries keyed by the SHA-256 of method and URL
//! - Whole-entry upserts (a stored response is never partially written)
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod names;
pub mod sets;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::StoredResponse;
pub use hash::RequestKey;
pub use names::{CacheNames, Purpose};
pub use sets::CacheSetInfo;
