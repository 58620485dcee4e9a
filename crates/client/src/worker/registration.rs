//! Idempotent worker registration.
//!
//! Registering again while a worker is already registered returns the
//! existing worker and does not install a second one.

use std::future::Future;
use std::sync::{Arc, OnceLock};

use shellcache_core::{AppConfig, Error};
use tokio::sync::OnceCell;

use super::Worker;

/// Holds at most one started worker.
#[derive(Default)]
pub struct Registration {
    worker: OnceCell<Arc<Worker>>,
}

impl Registration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and start a worker unless one is already registered.
    ///
    /// Concurrent callers wait for the same initialization. If it fails the
    /// registration stays empty and a later call may try again.
    pub async fn register<F, Fut>(&self, init: F) -> Result<Arc<Worker>, Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Worker, Error>>,
    {
        self.worker
            .get_or_try_init(|| async {
                let worker = init().await?;
                let (installed, activated) = worker.start().await?;
                tracing::info!(
                    version = worker.names().version(),
                    stored = installed.stored.len(),
                    failed = installed.failed.len(),
                    deleted = activated.deleted.len(),
                    "worker registered"
                );
                Ok(Arc::new(worker))
            })
            .await
            .cloned()
    }

    pub fn get(&self) -> Option<Arc<Worker>> {
        self.worker.get().cloned()
    }

    pub fn is_registered(&self) -> bool {
        self.worker.initialized()
    }
}

static GLOBAL: OnceLock<Registration> = OnceLock::new();

fn global_registration() -> &'static Registration {
    GLOBAL.get_or_init(Registration::new)
}

/// Register the process-wide worker from configuration.
pub async fn register_global(config: &AppConfig) -> Result<Arc<Worker>, Error> {
    global_registration()
        .register(|| Worker::from_config(config))
        .await
}

/// The process-wide worker, if registered.
pub fn global() -> Option<Arc<Worker>> {
    global_registration().get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedNetwork, app_url};
    use crate::worker::{Phase, WorkerOptions};
    use shellcache_core::CacheDb;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn options() -> WorkerOptions {
        let config = AppConfig {
            origin: "https://app.example.com".into(),
            cache_prefix: "app".into(),
            manifest: vec!["/index.html".into()],
            ..Default::default()
        };
        WorkerOptions::from_config(&config).unwrap()
    }

    fn network() -> Arc<ScriptedNetwork> {
        let network = Arc::new(ScriptedNetwork::new());
        network.route(app_url("/index.html").as_str(), 200, "text/html", b"index");
        network
    }

    #[tokio::test]
    async fn test_register_starts_worker() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let registration = Registration::new();
        assert!(!registration.is_registered());

        let worker = registration
            .register(|| async { Ok(Worker::new(db.clone(), network(), options())) })
            .await
            .unwrap();

        assert_eq!(worker.phase(), Phase::Serving);
        assert!(registration.is_registered());
        assert_eq!(db.keys("app-shell-v1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_register_is_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let registration = Registration::new();
        let builds = AtomicUsize::new(0);

        let first = registration
            .register(|| async {
                builds.fetch_add(1, Ordering::SeqCst);
                Ok(Worker::new(db.clone(), network(), options()))
            })
            .await
            .unwrap();
        let second = registration
            .register(|| async {
                builds.fetch_add(1, Ordering::SeqCst);
                Ok(Worker::new(db.clone(), network(), options()))
            })
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_registration_can_retry() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let registration = Registration::new();

        let failed = registration
            .register(|| async { Err(Error::InvalidInput("bad origin".into())) })
            .await;
        assert!(failed.is_err());
        assert!(registration.get().is_none());

        let worker = registration
            .register(|| async { Ok(Worker::new(db.clone(), network(), options())) })
            .await
            .unwrap();
        assert_eq!(worker.phase(), Phase::Serving);
    }

    #[tokio::test]
    async fn test_register_global_returns_same_worker() {
        let config = AppConfig {
            origin: "http://127.0.0.1:9".into(),
            db_path: ":memory:".into(),
            manifest: Vec::new(),
            ..Default::default()
        };
        let bumped = AppConfig { version: "v2".into(), ..config.clone() };

        let first = register_global(&config).await.unwrap();
        let second = register_global(&bumped).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.names().version(), "v1");
        assert!(Arc::ptr_eq(&first, &global().unwrap()));
        assert_eq!(first.phase(), Phase::Serving);
    }
}
