//! Core types and shared functionality for shellcache.
//!
//! This crate provides:
//! - Cache store with SQLite backend (versioned cache sets of request/response entries)
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, CacheNames, CacheSetInfo, Purpose, RequestKey, StoredResponse};
pub use config::{AppConfig, AssetStrategy, ConfigError};
pub use error::Error;
