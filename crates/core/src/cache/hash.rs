//! Request keys and their storage hashes.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use url::Url;

/// Identity of a cacheable entry: method plus absolute URL (query included).
///
/// Keys compare by exact string equality. The fragment is never part of a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RequestKey {
    pub method: String,
    pub url: String,
}

impl RequestKey {
    /// Build a key from a method and an already-parsed URL.
    pub fn new(method: &str, url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self { method: method.to_string(), url: url.into() }
    }

    /// Key for a GET of `url`.
    pub fn get(url: &Url) -> Self {
        Self::new("GET", url)
    }

    /// Hex-encoded SHA-256 used as the storage key.
    pub fn hash(&self) -> String {
        compute_request_hash(&self.method, &self.url)
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Compute the storage hash for a method and URL pair.
pub fn compute_request_hash(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_hash_stability() {
        let k1 = RequestKey::get(&url("https://example.com/css/style.css"));
        let k2 = RequestKey::get(&url("https://example.com/css/style.css"));
        assert_eq!(k1, k2);
        assert_eq!(k1.hash(), k2.hash());
    }

    #[test]
    fn test_hash_different_method() {
        let get = RequestKey::new("GET", &url("https://example.com/a"));
        let head = RequestKey::new("HEAD", &url("https://example.com/a"));
        assert_ne!(get.hash(), head.hash());
    }

    #[test]
    fn test_query_is_part_of_key() {
        let a = RequestKey::get(&url("https://example.com/a?v=1"));
        let b = RequestKey::get(&url("https://example.com/a?v=2"));
        assert_ne!(a, b);
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_path_is_case_sensitive() {
        let a = RequestKey::get(&url("https://example.com/Doc.pdf"));
        let b = RequestKey::get(&url("https://example.com/doc.pdf"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_fragment_dropped() {
        let key = RequestKey::get(&url("https://example.com/page#top"));
        assert_eq!(key.url, "https://example.com/page");
    }

    #[test]
    fn test_hash_format() {
        let hash = RequestKey::get(&url("https://example.com")).hash();
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
