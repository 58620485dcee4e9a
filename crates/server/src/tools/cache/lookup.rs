//! cache_match tool implementation.
//!
//! Looks up a stored response across all cache sets. Never touches the network.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::{Worker, fetch::resolve};
use shellcache_core::{Error, RequestKey};

use crate::tools::fetch::parse_method;

/// Parameters for the cache_match tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheMatchParams {
    /// Absolute URL, or a path resolved against the application origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the cache_match tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheMatchOutput {
    /// Request key, `METHOD url`.
    pub key: String,
    /// Cache set holding the entry.
    pub cache_set: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub stored_at: String,
    pub body_bytes: usize,
}

/// Implementation of the cache_match tool.
pub async fn match_impl(worker: &Worker, params: CacheMatchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let url = resolve(&worker.options().origin, &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let method = parse_method(&params.method)?;
    let key = RequestKey::new(method.as_str(), &url);

    let (cache_set, stored) = worker
        .db()
        .match_all(&key)
        .await?
        .ok_or_else(|| Error::CacheMiss(key.to_string()))?;

    let output = CacheMatchOutput {
        key: key.to_string(),
        cache_set,
        status: stored.status,
        content_type: stored.content_type().map(str::to_string),
        body_bytes: stored.body.len(),
        stored_at: stored.stored_at,
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
