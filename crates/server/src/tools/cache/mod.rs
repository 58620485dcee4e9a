//! Cache-related MCP tools.
//!
//! This module provides read-only views of the cache sets.

pub mod list;
pub mod lookup;

pub use list::{CacheListParams, list_impl};
pub use lookup::{CacheMatchParams, match_impl};
