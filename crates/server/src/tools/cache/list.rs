//! cache_list tool implementation.
//!
//! Lists every cache set in the store, current or stale.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::Worker;
use shellcache_core::Error;

/// Parameters for the cache_list tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheListParams {}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheSetSummary {
    pub name: String,
    pub created_at: String,
    pub entries: u64,
    /// Whether the set belongs to the running version.
    pub current: bool,
}

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    pub version: String,
    pub phase: String,
    pub sets: Vec<CacheSetSummary>,
}

/// Implementation of the cache_list tool.
pub async fn list_impl(worker: &Worker, _params: CacheListParams) -> Result<CallToolResult, McpError> {
    let names = worker.names();
    let sets = worker
        .db()
        .list_sets()
        .await?
        .into_iter()
        .map(|set| CacheSetSummary {
            current: names.is_current(&set.name),
            name: set.name,
            created_at: set.created_at,
            entries: set.entries,
        })
        .collect();

    let phase = serde_json::to_value(worker.phase())
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();

    let output = CacheListOutput { version: names.version().to_string(), phase, sets };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
