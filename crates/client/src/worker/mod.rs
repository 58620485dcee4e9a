//! Worker lifecycle: `Registered -> Installing -> Installed -> Activating -> Serving`.
//!
//! ### Install
//! Opens the shell set for the current version and pre-populates it from the
//! manifest. Completes even when entries fail, then moves straight on without
//! waiting for clients of an older version to go away.
//!
//! ### Activate
//! Deletes every cache set whose name is not one of the current version's
//! names, then starts intercepting for every client, including ones loaded
//! before activation. Deletion is irreversible.
//!
//! ### Serving
//! Each request is handled independently; any number may be in flight. The
//! cache store is the only shared state.

pub mod precache;
pub mod registration;

use std::sync::Arc;

use reqwest::Url;
use serde::Serialize;
use shellcache_core::{AppConfig, AssetStrategy, CacheDb, CacheNames, Error};
use tokio::sync::watch;

pub use precache::{InstallReport, Manifest, PrecacheFailure};
pub use registration::{Registration, global, register_global};

use crate::fetch::{FetchClient, FetchConfig, Network, resolve};
use crate::intercept::{Classifier, InterceptedRequest, Outcome, PassReason, Route, StrategyEngine};

/// Lifecycle phase of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Registered,
    Installing,
    Installed,
    Activating,
    Serving,
}

/// Result of activation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivateReport {
    /// Stale cache sets deleted, in creation order.
    pub deleted: Vec<String>,
}

/// Everything a worker needs besides its store and network.
#[derive(Debug, Clone)]
pub struct WorkerOptions {
    pub origin: Url,
    pub names: CacheNames,
    pub manifest: Manifest,
    pub on_demand_extensions: Vec<String>,
    pub navigation_fallback: Url,
    pub asset_strategy: AssetStrategy,
    pub precache_concurrency: usize,
}

impl WorkerOptions {
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        config.validate().map_err(|e| Error::InvalidInput(e.to_string()))?;
        let origin = config
            .origin_url()
            .map_err(|e| Error::InvalidInput(e.to_string()))?;
        let navigation_fallback =
            resolve(&origin, &config.navigation_fallback).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        Ok(Self {
            names: config.cache_names(),
            manifest: Manifest::new(config.manifest.iter().cloned()),
            on_demand_extensions: config.on_demand_extensions.clone(),
            navigation_fallback,
            asset_strategy: config.asset_strategy,
            precache_concurrency: config.precache_concurrency,
            origin,
        })
    }
}

/// The interception layer for one deployment version.
pub struct Worker {
    db: CacheDb,
    network: Arc<dyn Network>,
    options: WorkerOptions,
    classifier: Classifier,
    engine: StrategyEngine,
    phase: watch::Sender<Phase>,
}

impl Worker {
    pub fn new(db: CacheDb, network: Arc<dyn Network>, options: WorkerOptions) -> Self {
        let classifier = Classifier::new(options.origin.clone(), options.on_demand_extensions.clone());
        let engine = StrategyEngine::new(
            db.clone(),
            network.clone(),
            options.names.clone(),
            options.asset_strategy,
            options.navigation_fallback.clone(),
        );
        let (phase, _) = watch::channel(Phase::Registered);
        Self { db, network, options, classifier, engine, phase }
    }

    /// Build a worker from configuration: SQLite store at `db_path`, reqwest network.
    pub async fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let options = WorkerOptions::from_config(config)?;
        let db = CacheDb::open(&config.db_path).await?;
        let network = FetchClient::new(FetchConfig::from(config))?;
        Ok(Self::new(db, Arc::new(network), options))
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Watch phase transitions.
    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    pub fn network(&self) -> &Arc<dyn Network> {
        &self.network
    }

    pub fn names(&self) -> &CacheNames {
        &self.options.names
    }

    pub fn options(&self) -> &WorkerOptions {
        &self.options
    }

    fn transition(&self, from: &[Phase], to: Phase) -> Result<Phase, Error> {
        let mut previous = None;
        self.phase.send_if_modified(|phase| {
            if from.contains(phase) {
                previous = Some(*phase);
                *phase = to;
                true
            } else {
                false
            }
        });
        previous.ok_or_else(|| Error::InvalidState(format!("cannot move to {to:?} from {:?}", self.phase())))
    }

    /// Open the shell set and pre-populate it from the manifest.
    ///
    /// Individual manifest failures are reported, not returned as errors.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.transition(&[Phase::Registered], Phase::Installing)?;
        tracing::info!(version = self.options.names.version(), "installing");

        let shell = self.options.names.shell();
        if let Err(e) = self.db.open_set(shell).await {
            self.phase.send_replace(Phase::Registered);
            return Err(e);
        }

        let report = precache::precache(
            &self.db,
            self.network.clone(),
            &self.options.origin,
            shell,
            &self.options.manifest,
            self.options.precache_concurrency,
        )
        .await;

        self.phase.send_replace(Phase::Installed);
        tracing::info!(
            version = self.options.names.version(),
            stored = report.stored.len(),
            failed = report.failed.len(),
            "installed"
        );
        Ok(report)
    }

    /// Delete every cache set that does not belong to the current version.
    ///
    /// Running it again without a version change deletes nothing.
    pub async fn reconcile(&self) -> Result<Vec<String>, Error> {
        let mut deleted = Vec::new();
        for name in self.db.set_names().await? {
            if self.options.names.is_current(&name) {
                continue;
            }
            if self.db.delete_set(&name).await? {
                tracing::info!(cache = %name, "deleted stale cache set");
                deleted.push(name);
            }
        }
        Ok(deleted)
    }

    /// Reconcile cache sets and take control of all clients.
    ///
    /// Activating a worker that is already serving only reconciles again and
    /// keeps serving throughout.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        if self.phase() == Phase::Serving {
            let deleted = self.reconcile().await?;
            return Ok(ActivateReport { deleted });
        }

        self.transition(&[Phase::Installed], Phase::Activating)?;
        tracing::info!(version = self.options.names.version(), "activating");

        match self.reconcile().await {
            Ok(deleted) => {
                self.phase.send_replace(Phase::Serving);
                tracing::info!(version = self.options.names.version(), deleted = deleted.len(), "serving");
                Ok(ActivateReport { deleted })
            }
            Err(e) => {
                self.phase.send_replace(Phase::Installed);
                Err(e)
            }
        }
    }

    /// Install then activate.
    pub async fn start(&self) -> Result<(InstallReport, ActivateReport), Error> {
        let installed = self.install().await?;
        let activated = self.activate().await?;
        Ok((installed, activated))
    }

    /// Routing decision for a request, ignoring the lifecycle phase.
    pub fn classify(&self, request: &InterceptedRequest) -> Route {
        self.classifier.classify(request)
    }

    /// Handle one intercepted request.
    ///
    /// Before the worker is serving, every request passes through.
    pub async fn handle(&self, request: &InterceptedRequest) -> Outcome {
        if self.phase() != Phase::Serving {
            return Outcome::PassThrough(PassReason::NotControlling);
        }
        match self.classify(request) {
            Route::PassThrough(reason) => {
                tracing::debug!(method = %request.method, url = %request.url, ?reason, "pass-through");
                Outcome::PassThrough(reason)
            }
            Route::Intercept(class) => {
                tracing::debug!(url = %request.url, ?class, "intercepted");
                self.engine.respond(class, request).await
            }
        }
    }
}
