//! Network fetch primitive.
//!
//! ### Contract
//! - A transport failure (DNS, connect, reset, timeout) is an `Err`.
//! - Any HTTP status, including 4xx/5xx, is an `Ok` response; callers decide
//!   what counts as success.
//! - `CacheMode::Reload` asks intermediaries to revalidate with the origin.
//!
//! ### Limits
//! - Max redirects: 5
//! - Max body bytes: configurable (default 20MB)
//! - Timeout: inherited from configuration; no extra timeout is layered on top.

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Method, StatusCode, Url, header};
use std::time::{Duration, Instant};

pub use self::url::{UrlError, canonicalize, resolve, same_origin};

use shellcache_core::{AppConfig, Error};

/// How the fetch interacts with HTTP caches between us and the origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheMode {
    /// Normal request semantics.
    #[default]
    Default,
    /// Bypass intermediate caches and revalidate with the origin.
    Reload,
}

/// A request handed to the network.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
    pub headers: header::HeaderMap,
    pub cache_mode: CacheMode,
}

impl FetchRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url, headers: header::HeaderMap::new(), cache_mode: CacheMode::Default }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn with_cache_mode(mut self, cache_mode: CacheMode) -> Self {
        self.cache_mode = cache_mode;
        self
    }

    pub fn with_headers(mut self, headers: header::HeaderMap) -> Self {
        self.headers = headers;
        self
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The original URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: header::HeaderMap,
    /// Response body bytes
    pub bytes: Bytes,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }
}

/// The network as seen by the interception engine.
///
/// Implemented by [`FetchClient`] for real traffic; tests substitute scripted
/// networks to simulate offline conditions.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "shellcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 20MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "shellcache/0.1".to_string(),
            max_bytes: 20 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// HTTP fetch client backed by reqwest.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        let start = Instant::now();
        let url = request.url.clone();

        let mut builder = self
            .http
            .request(request.method.clone(), url.as_str())
            .headers(request.headers.clone());
        if request.cache_mode == CacheMode::Reload {
            builder = builder
                .header(header::CACHE_CONTROL, "no-cache")
                .header(header::PRAGMA, "no-cache");
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::FetchTimeout(format!("{url}: {e}"))
            } else {
                Error::Network(format!("{url}: {e}"))
            }
        })?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                Error::FetchTimeout(format!("{url}: {e}"))
            } else {
                Error::Network(format!("failed to read response from {url}: {e}"))
            }
        })?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            method = %request.method,
            status = status.as_u16(),
            fetch_ms,
            bytes = bytes.len(),
            "fetched {} -> {}",
            url,
            final_url
        );

        Ok(FetchResponse { url, final_url, status, headers, bytes, fetch_ms })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header as header_matcher, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> FetchClient {
        FetchClient::new(FetchConfig { max_bytes: 1024, ..Default::default() }).unwrap()
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "shellcache/0.1");
        assert_eq!(config.max_bytes, 20 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { user_agent: "custom/1.0".into(), timeout_ms: 500, ..Default::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.user_agent, "custom/1.0");
        assert_eq!(config.timeout, Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/css/style.css"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/css")
                    .set_body_string("body{}"),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/css/style.css", server.uri())).unwrap();
        let response = client().fetch(&FetchRequest::get(url)).await.unwrap();

        assert!(response.is_success());
        assert_eq!(response.content_type(), Some("text/css"));
        assert_eq!(&response.bytes[..], b"body{}");
    }

    #[tokio::test]
    async fn test_fetch_error_status_is_ok() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/index.html", server.uri())).unwrap();
        let response = client().fetch(&FetchRequest::get(url)).await.unwrap();

        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn test_reload_sends_no_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header_matcher("cache-control", "no-cache"))
            .and(header_matcher("pragma", "no-cache"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/", server.uri())).unwrap();
        let request = FetchRequest::get(url).with_cache_mode(CacheMode::Reload);
        let response = client().fetch(&request).await.unwrap();

        assert!(response.is_success());
    }

    #[tokio::test]
    async fn test_fetch_too_large() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'x'; 4096]))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/doc.pdf", server.uri())).unwrap();
        let result = client().fetch(&FetchRequest::get(url)).await;

        assert!(matches!(result, Err(Error::FetchTooLarge(_))));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        let server = MockServer::start().await;
        let url = Url::parse(&format!("{}/", server.uri())).unwrap();
        drop(server);

        let result = client().fetch(&FetchRequest::get(url)).await;
        assert!(matches!(result, Err(ref e) if e.is_network()));
    }
}
