//! Helpers shared by tool tests.

use std::sync::Arc;

use rmcp::model::CallToolResult;
use serde::de::DeserializeOwned;
use shellcache_client::{FetchClient, FetchConfig, Worker, WorkerOptions};
use shellcache_core::{AppConfig, CacheDb};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A serving worker whose origin is `server`, with a three-entry shell.
pub(crate) async fn serving_worker(server: &MockServer) -> (Worker, CacheDb) {
    for (route, body, content_type) in [
        ("/", "<h1>root</h1>", "text/html"),
        ("/index.html", "<h1>index</h1>", "text/html"),
        ("/css/style.css", "body{}", "text/css"),
    ] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, content_type))
            .mount(server)
            .await;
    }

    let config = AppConfig {
        origin: server.uri(),
        cache_prefix: "app".into(),
        manifest: vec!["/".into(), "/index.html".into(), "/css/style.css".into()],
        ..Default::default()
    };
    let options = WorkerOptions::from_config(&config).unwrap();
    let network = FetchClient::new(FetchConfig::from(&config)).unwrap();
    let db = CacheDb::open_in_memory().await.unwrap();

    let worker = Worker::new(db.clone(), Arc::new(network), options);
    worker.start().await.unwrap();
    (worker, db)
}

/// Decode the JSON text payload of a successful tool call.
pub(crate) fn output_of<T: DeserializeOwned>(result: &CallToolResult) -> T {
    let content = serde_json::to_value(&result.content[0]).unwrap();
    let text = content
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
