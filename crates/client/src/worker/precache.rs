//! Bootstrap pre-population of the shell cache set.
//!
//! Manifest entries are fetched independently with bounded concurrency and
//! forced revalidation. A failed entry is logged and reported; it never stops
//! the others from being stored and never fails the install.

use std::sync::Arc;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use shellcache_core::CacheDb;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::fetch::{CacheMode, FetchRequest, Network, resolve};
use crate::intercept::{InterceptedRequest, Response};

/// Fixed, ordered list of paths that must be in the shell set after install.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    paths: Vec<String>,
}

impl Manifest {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { paths: paths.into_iter().map(Into::into).collect() }
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// A manifest entry that could not be stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrecacheFailure {
    pub path: String,
    pub reason: String,
}

/// Result of pre-populating the shell set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    /// Paths stored, in manifest order.
    pub stored: Vec<String>,
    /// Paths that failed, in manifest order.
    pub failed: Vec<PrecacheFailure>,
}

impl InstallReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Fetch every manifest entry and store the successes in `shell_set`.
pub(crate) async fn precache(
    db: &CacheDb, network: Arc<dyn Network>, origin: &Url, shell_set: &str, manifest: &Manifest,
    max_concurrency: usize,
) -> InstallReport {
    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut join_set = JoinSet::new();

    for (index, path) in manifest.paths().iter().enumerate() {
        let semaphore = semaphore.clone();
        let network = network.clone();
        let db = db.clone();
        let origin = origin.clone();
        let shell_set = shell_set.to_string();
        let path = path.clone();

        join_set.spawn(async move {
            let result = match semaphore.acquire_owned().await {
                // NOTE: Hold permit for task duration to enforce concurrency limit
                Ok(_permit) => precache_one(&db, network.as_ref(), &origin, &shell_set, &path).await,
                Err(e) => Err(e.to_string()),
            };
            (index, result)
        });
    }

    let mut outcomes: Vec<Option<Result<(), String>>> = vec![None; manifest.len()];
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((index, result)) => outcomes[index] = Some(result),
            Err(e) => tracing::warn!(error = %e, "pre-population task aborted"),
        }
    }

    let mut report = InstallReport::default();
    for (path, outcome) in manifest.paths().iter().zip(outcomes) {
        match outcome.unwrap_or_else(|| Err("task aborted".to_string())) {
            Ok(()) => report.stored.push(path.clone()),
            Err(reason) => {
                tracing::warn!(%path, %reason, "failed to pre-populate manifest entry");
                report.failed.push(PrecacheFailure { path: path.clone(), reason });
            }
        }
    }

    report
}

async fn precache_one(
    db: &CacheDb, network: &dyn Network, origin: &Url, shell_set: &str, path: &str,
) -> Result<(), String> {
    let url = resolve(origin, path).map_err(|e| e.to_string())?;
    let request = FetchRequest::get(url.clone()).with_cache_mode(CacheMode::Reload);

    let fetched = network.fetch(&request).await.map_err(|e| e.to_string())?;
    if !fetched.is_success() {
        return Err(format!("status {}", fetched.status.as_u16()));
    }

    let key = InterceptedRequest::get(url).key();
    let stored = Response::from_network(fetched).to_stored(key);
    db.put(shell_set, &stored).await.map_err(|e| e.to_string())?;

    tracing::debug!(%path, shell_set, "pre-populated manifest entry");
    Ok(())
}
