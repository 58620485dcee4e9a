//! Synthesized document for navigations with neither network nor cache.

use bytes::Bytes;
use reqwest::StatusCode;

use super::{Response, ResponseSource};

pub const OFFLINE_CONTENT_TYPE: &str = "text/html; charset=utf-8";

pub const OFFLINE_DOCUMENT: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Offline</title>
<style>
body{font-family:system-ui,sans-serif;display:flex;min-height:100vh;margin:0;align-items:center;justify-content:center;text-align:center;padding:1.5rem;box-sizing:border-box}
button{font:inherit;padding:.6rem 1.4rem;border-radius:.5rem;border:1px solid currentColor;background:none;cursor:pointer}
</style>
</head>
<body>
<main>
<h1>You are offline</h1>
<p>This page has not been saved for offline use yet. Check your connection and try again.</p>
<button type="button" onclick="location.reload()">Retry</button>
</main>
</body>
</html>
"#;

impl Response {
    /// The inline offline page: status 200, HTML, with a retry control.
    pub fn offline_document() -> Self {
        Self {
            status: StatusCode::OK,
            headers: vec![
                ("content-type".to_string(), OFFLINE_CONTENT_TYPE.to_string()),
                ("cache-control".to_string(), "no-store".to_string()),
            ],
            body: Bytes::from_static(OFFLINE_DOCUMENT.as_bytes()),
            source: ResponseSource::Offline,
        }
    }
}
