//! Request classification.
//!
//! Rules are evaluated in order and the first match wins:
//! 1. non-GET requests pass through
//! 2. cross-origin requests pass through
//! 3. navigations
//! 4. paths ending in an on-demand extension
//! 5. everything else is a versioned asset

use reqwest::{Method, Url};
use serde::Serialize;

use super::InterceptedRequest;
use crate::fetch::same_origin;

/// Class of an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestClass {
    Navigation,
    OnDemand,
    Asset,
}

/// Why a request is left to the network untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassReason {
    UnsafeMethod,
    CrossOrigin,
    /// The worker has not reached the serving phase yet.
    NotControlling,
}

/// Routing decision for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    PassThrough(PassReason),
    Intercept(RequestClass),
}

#[derive(Debug, Clone)]
pub struct Classifier {
    origin: Url,
    on_demand_extensions: Vec<String>,
}

impl Classifier {
    pub fn new(origin: Url, on_demand_extensions: Vec<String>) -> Self {
        let on_demand_extensions = on_demand_extensions
            .into_iter()
            .map(|ext| ext.to_ascii_lowercase())
            .collect();
        Self { origin, on_demand_extensions }
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn classify(&self, request: &InterceptedRequest) -> Route {
        if request.method != Method::GET {
            return Route::PassThrough(PassReason::UnsafeMethod);
        }
        if !same_origin(&self.origin, &request.url) {
            return Route::PassThrough(PassReason::CrossOrigin);
        }
        if request.is_navigation() {
            return Route::Intercept(RequestClass::Navigation);
        }
        if self.is_on_demand(request.url.path()) {
            return Route::Intercept(RequestClass::OnDemand);
        }
        Route::Intercept(RequestClass::Asset)
    }

    fn is_on_demand(&self, path: &str) -> bool {
        let path = path.to_ascii_lowercase();
        self.on_demand_extensions
            .iter()
            .any(|ext| path.ends_with(ext.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intercept::RequestMode;

    fn classifier() -> Classifier {
        Classifier::new(Url::parse("https://app.example.com").unwrap(), vec![".pdf".into()])
    }

    fn url(path: &str) -> Url {
        Url::parse("https://app.example.com").unwrap().join(path).unwrap()
    }

    #[test]
    fn test_non_get_passes_through() {
        for method in [Method::POST, Method::PUT, Method::DELETE, Method::HEAD] {
            let request = InterceptedRequest::new(method, url("/api/save"), RequestMode::Cors);
            assert_eq!(classifier().classify(&request), Route::PassThrough(PassReason::UnsafeMethod));
        }
    }

    #[test]
    fn test_non_get_navigation_still_passes_through() {
        let request = InterceptedRequest::new(Method::POST, url("/login"), RequestMode::Navigate);
        assert_eq!(classifier().classify(&request), Route::PassThrough(PassReason::UnsafeMethod));
    }

    #[test]
    fn test_cross_origin_passes_through() {
        let request = InterceptedRequest::get(Url::parse("https://cdn.example.com/lib.js").unwrap());
        assert_eq!(classifier().classify(&request), Route::PassThrough(PassReason::CrossOrigin));

        let request = InterceptedRequest::navigate(Url::parse("https://other.example.com/").unwrap());
        assert_eq!(classifier().classify(&request), Route::PassThrough(PassReason::CrossOrigin));
    }

    #[test]
    fn test_navigation() {
        let request = InterceptedRequest::navigate(url("/"));
        assert_eq!(classifier().classify(&request), Route::Intercept(RequestClass::Navigation));
    }

    #[test]
    fn test_navigation_wins_over_extension() {
        let request = InterceptedRequest::navigate(url("/docs/manual.pdf"));
        assert_eq!(classifier().classify(&request), Route::Intercept(RequestClass::Navigation));
    }

    #[test]
    fn test_on_demand_extension() {
        let request = InterceptedRequest::get(url("/docs/doc.pdf"));
        assert_eq!(classifier().classify(&request), Route::Intercept(RequestClass::OnDemand));

        let request = InterceptedRequest::get(url("/docs/DOC.PDF"));
        assert_eq!(classifier().classify(&request), Route::Intercept(RequestClass::OnDemand));
    }

    #[test]
    fn test_query_does_not_affect_extension() {
        let request = InterceptedRequest::get(url("/doc.pdf?download=1"));
        assert_eq!(classifier().classify(&request), Route::Intercept(RequestClass::OnDemand));

        let request = InterceptedRequest::get(url("/viewer?file=doc.pdf"));
        assert_eq!(classifier().classify(&request), Route::Intercept(RequestClass::Asset));
    }

    #[test]
    fn test_assets() {
        for path in ["/css/style.css", "/js/app.js", "/images/capa.jpg", "/manifest.json"] {
            let request = InterceptedRequest::get(url(path));
            assert_eq!(classifier().classify(&request), Route::Intercept(RequestClass::Asset), "{path}");
        }
    }
}
