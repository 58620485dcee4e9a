//! Request interception: classification, caching strategies and the
//! synthesized offline document.
//!
//! ### Request lifecycle
//! `Intercepted -> Classified -> {NetworkAttempt | CacheLookup} -> [Store?] -> Responded`
//!
//! Every intercepted request ends in an [`Outcome`]: served content (from the
//! network, a cache set, or the offline document), an explicit failure, or a
//! pass-through for requests this layer does not own.

pub mod classify;
pub mod offline;
pub mod strategy;

pub use classify::{Classifier, PassReason, RequestClass, Route};
pub use strategy::{StrategyEngine, Tier};

use bytes::Bytes;
use reqwest::{Method, StatusCode, Url, header};
use serde::Serialize;
use shellcache_core::{RequestKey, StoredResponse};

use crate::fetch::{FetchRequest, FetchResponse};

/// Why a request was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestMode {
    /// Top-level document load or reload.
    Navigate,
    SameOrigin,
    Cors,
    NoCors,
}

impl RequestMode {
    /// Derive the mode from a `Sec-Fetch-Mode` header value.
    pub fn from_header(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "navigate" => RequestMode::Navigate,
            "same-origin" => RequestMode::SameOrigin,
            "cors" => RequestMode::Cors,
            _ => RequestMode::NoCors,
        }
    }
}

/// A request the application would have sent to the network.
#[derive(Debug, Clone)]
pub struct InterceptedRequest {
    pub method: Method,
    pub url: Url,
    pub mode: RequestMode,
    pub headers: header::HeaderMap,
}

impl InterceptedRequest {
    pub fn new(method: Method, url: Url, mode: RequestMode) -> Self {
        Self { method, url, mode, headers: header::HeaderMap::new() }
    }

    /// A sub-resource GET.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url, RequestMode::NoCors)
    }

    /// A top-level navigation.
    pub fn navigate(url: Url) -> Self {
        Self::new(Method::GET, url, RequestMode::Navigate)
    }

    /// Build a request from raw parts, taking the mode from `Sec-Fetch-Mode`.
    pub fn from_parts(method: Method, url: Url, headers: header::HeaderMap) -> Self {
        let mode = headers
            .get("sec-fetch-mode")
            .and_then(|v| v.to_str().ok())
            .map(RequestMode::from_header)
            .unwrap_or(RequestMode::NoCors);
        Self { method, url, mode, headers }
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    pub fn key(&self) -> RequestKey {
        RequestKey::new(self.method.as_str(), &self.url)
    }

    /// The network request equivalent to this intercepted request.
    pub fn to_fetch(&self) -> FetchRequest {
        FetchRequest::new(self.method.clone(), self.url.clone()).with_headers(self.headers.clone())
    }
}

/// Where a served response came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseSource {
    Network,
    Cache { set: String },
    Offline,
}

/// A response handed back to the application.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub source: ResponseSource,
}

impl Response {
    pub fn from_network(response: FetchResponse) -> Self {
        let headers = response
            .headers
            .iter()
            .map(|(name, value)| {
                // non-UTF-8 (obs-text) values are kept lossily
                let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
                (name.as_str().to_string(), value)
            })
            .collect();
        Self { status: response.status, headers, body: response.bytes, source: ResponseSource::Network }
    }

    pub fn from_cache(set: String, stored: StoredResponse) -> Self {
        let status = StatusCode::from_u16(stored.status).unwrap_or(StatusCode::OK);
        Self { status, headers: stored.headers, body: Bytes::from(stored.body), source: ResponseSource::Cache { set } }
    }

    /// Snapshot for storage under `key`.
    pub fn to_stored(&self, key: RequestKey) -> StoredResponse {
        StoredResponse::new(key, self.status.as_u16(), self.headers.clone(), self.body.to_vec())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Terminal state of one intercepted request.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Not handled here; the request goes to the network untouched.
    PassThrough(PassReason),
    /// A response was produced.
    Served(Response),
    /// Every tier failed; surfaced to the caller as a failed fetch.
    Failed(String),
}

impl Outcome {
    pub fn into_response(self) -> Option<Response> {
        match self {
            Outcome::Served(response) => Some(response),
            _ => None,
        }
    }
}
