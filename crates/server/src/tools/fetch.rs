//! offline_fetch tool implementation.
//!
//! Routes one request through the worker exactly as the application would
//! issue it. Pass-through requests go straight to the network and never
//! touch the cache.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::{
    InterceptedRequest, Method, Outcome, PassReason, RequestMode, Response, ResponseSource, Worker, fetch::resolve,
};
use shellcache_core::Error;

/// Parameters for the offline_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OfflineFetchParams {
    /// Absolute URL, or a path resolved against the application origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Treat the request as a top-level page navigation.
    #[serde(default)]
    pub navigate: bool,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the offline_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OfflineFetchOutput {
    pub url: String,
    pub status: u16,
    /// "network", "cache" or "offline".
    pub source: String,
    /// Cache set the response was read from.
    pub cache_set: Option<String>,
    /// Set when the worker left the request to the network.
    pub pass_through: Option<String>,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8, lossy.
    pub body: String,
    pub body_bytes: usize,
}

pub(crate) fn parse_method(method: &str) -> Result<Method, Error> {
    Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| Error::InvalidInput(format!("invalid method: {method}")))
}

fn pass_reason_name(reason: PassReason) -> &'static str {
    match reason {
        PassReason::UnsafeMethod => "unsafe_method",
        PassReason::CrossOrigin => "cross_origin",
        PassReason::NotControlling => "not_controlling",
    }
}

fn to_output(request: &InterceptedRequest, response: Response, pass_through: Option<PassReason>) -> OfflineFetchOutput {
    let content_type = response.content_type().map(str::to_string);
    let (source, cache_set) = match response.source {
        ResponseSource::Network => ("network", None),
        ResponseSource::Cache { set } => ("cache", Some(set)),
        ResponseSource::Offline => ("offline", None),
    };

    OfflineFetchOutput {
        url: request.url.to_string(),
        status: response.status.as_u16(),
        source: source.into(),
        cache_set,
        pass_through: pass_through.map(|r| pass_reason_name(r).to_string()),
        content_type,
        body: String::from_utf8_lossy(&response.body).into_owned(),
        body_bytes: response.body.len(),
        headers: response.headers,
    }
}

/// Implementation of the offline_fetch tool.
pub async fn fetch_impl(worker: &Worker, params: OfflineFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let url = resolve(&worker.options().origin, &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let method = parse_method(&params.method)?;
    let mode = if params.navigate { RequestMode::Navigate } else { RequestMode::NoCors };
    let request = InterceptedRequest::new(method, url, mode);

    let output = match worker.handle(&request).await {
        Outcome::Served(response) => to_output(&request, response, None),
        Outcome::PassThrough(reason) => {
            tracing::debug!(url = %request.url, ?reason, "fetching pass-through request directly");
            let fetched = worker.network().fetch(&request.to_fetch()).await?;
            to_output(&request, Response::from_network(fetched), Some(reason))
        }
        Outcome::Failed(reason) => return Err(Error::Network(reason).into()),
    };

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{output_of, serving_worker};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn params(url: &str) -> OfflineFetchParams {
        OfflineFetchParams { url: url.into(), method: default_method(), navigate: false }
    }

    #[tokio::test]
    async fn test_fetch_empty_url() {
        let server = MockServer::start().await;
        let (worker, _db) = serving_worker(&server).await;

        let result = fetch_impl(&worker, params("  ")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_fetch_invalid_method() {
        let server = MockServer::start().await;
        let (worker, _db) = serving_worker(&server).await;

        let request = OfflineFetchParams { method: "BAD METHOD".into(), ..params("/") };
        assert!(fetch_impl(&worker, request).await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_serves_precached_shell() {
        let server = MockServer::start().await;
        let (worker, _db) = serving_worker(&server).await;

        let result = fetch_impl(&worker, params("/css/style.css")).await.unwrap();
        let output: OfflineFetchOutput = output_of(&result);

        assert_eq!(output.status, 200);
        assert_eq!(output.source, "cache");
        assert_eq!(output.body, "body{}");
        assert!(output.pass_through.is_none());
    }

    #[tokio::test]
    async fn test_fetch_pass_through_skips_cache() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/items"))
            .respond_with(ResponseTemplate::new(201).set_body_string("created"))
            .mount(&server)
            .await;
        let (worker, db) = serving_worker(&server).await;
        let sets_before = db.list_sets().await.unwrap();

        let request = OfflineFetchParams { method: "post".into(), ..params("/api/items") };
        let result = fetch_impl(&worker, request).await.unwrap();
        let output: OfflineFetchOutput = output_of(&result);

        assert_eq!(output.status, 201);
        assert_eq!(output.source, "network");
        assert_eq!(output.pass_through.as_deref(), Some("unsafe_method"));
        assert_eq!(db.list_sets().await.unwrap(), sets_before);
    }

    #[tokio::test]
    async fn test_fetch_navigation_falls_back_to_index() {
        let server = MockServer::start().await;
        let (worker, _db) = serving_worker(&server).await;
        drop(server);

        let request = OfflineFetchParams { navigate: true, ..params("/deep/link") };
        let result = fetch_impl(&worker, request).await.unwrap();
        let output: OfflineFetchOutput = output_of(&result);

        assert_eq!(output.status, 200);
        assert_eq!(output.source, "cache");
        assert_eq!(output.body, "<h1>index</h1>");
    }
}
