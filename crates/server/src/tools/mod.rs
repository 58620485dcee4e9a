//! MCP tool implementations.
//!
//! This module contains all tools exposed by the shellcache server.

pub mod cache;
pub mod fetch;

#[cfg(test)]
pub(crate) mod testing;
