//! Scripted network used by unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{StatusCode, Url};
use shellcache_core::Error;

use crate::fetch::{CacheMode, FetchRequest, FetchResponse, Network};

/// In-process network answering from a route table.
///
/// Unknown URLs answer 404. While offline every fetch fails with
/// `Error::Network`. Every attempt is recorded, online or not.
#[derive(Default)]
pub(crate) struct ScriptedNetwork {
    routes: Mutex<HashMap<String, (u16, &'static str, Bytes)>>,
    failing: Mutex<Vec<String>>,
    offline: AtomicBool,
    calls: Mutex<Vec<(String, CacheMode)>>,
}

impl ScriptedNetwork {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn route(&self, url: &str, status: u16, content_type: &'static str, body: &'static [u8]) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), (status, content_type, Bytes::from_static(body)));
    }

    /// Make a single URL fail at the transport level.
    pub(crate) fn fail(&self, url: &str) {
        self.failing.lock().unwrap().push(url.to_string());
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    pub(crate) fn modes(&self) -> Vec<CacheMode> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, mode)| *mode)
            .collect()
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        let url = request.url.to_string();
        self.calls
            .lock()
            .unwrap()
            .push((url.clone(), request.cache_mode));

        if self.offline.load(Ordering::SeqCst) || self.failing.lock().unwrap().contains(&url) {
            return Err(Error::Network(format!("{url}: connection refused")));
        }

        let (status, content_type, body) = self
            .routes
            .lock()
            .unwrap()
            .get(&url)
            .cloned()
            .unwrap_or((404, "text/plain", Bytes::from_static(b"not found")));

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));

        Ok(FetchResponse {
            url: request.url.clone(),
            final_url: request.url.clone(),
            status: StatusCode::from_u16(status).unwrap(),
            headers,
            bytes: body,
            fetch_ms: 1,
        })
    }
}

pub(crate) fn app_url(path: &str) -> Url {
    Url::parse("https://app.example.com").unwrap().join(path).unwrap()
}
