//! Caching strategies expressed as ordered fallback plans.
//!
//! Each request class maps to a list of [`Tier`]s. Tiers run in order and the
//! first one that produces a response wins:
//!
//! | class      | plan                                                        |
//! |------------|-------------------------------------------------------------|
//! | navigation | network → cached request → cached fallback page → offline   |
//! | on-demand  | network → cached request                                    |
//! | asset      | cached request → network (or network → cached request)      |
//!
//! Network results: 2xx is stored then served, other non-5xx statuses are
//! served without storing, 5xx is held back and only served when no later
//! tier answers. Cache write failures never affect the response, and a
//! version whose shell set has been deleted stops writing altogether.

use std::sync::Arc;

use reqwest::Url;
use shellcache_core::{AssetStrategy, CacheDb, CacheNames, Purpose, RequestKey};

use super::{InterceptedRequest, Outcome, RequestClass, Response};
use crate::fetch::Network;

/// One step of a fallback plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tier {
    /// Fetch from the network; successful responses are stored in `store`.
    Network { store: Purpose },
    /// Look up the request's own key in `search`, in order.
    Cached { search: Vec<Purpose> },
    /// Look up a GET of `url` in `search`, in order.
    CachedUrl { url: Url, search: Vec<Purpose> },
    /// Answer with the inline offline page.
    OfflineDocument,
}

enum Attempt {
    Served(Response),
    /// A response not good enough to stop at, kept as a last resort.
    Deferred(Response),
    Miss(String),
}

/// Executes fallback plans against the cache store and the network.
#[derive(Clone)]
pub struct StrategyEngine {
    db: CacheDb,
    network: Arc<dyn Network>,
    names: CacheNames,
    asset_strategy: AssetStrategy,
    navigation_fallback: Url,
}

impl StrategyEngine {
    pub fn new(
        db: CacheDb, network: Arc<dyn Network>, names: CacheNames, asset_strategy: AssetStrategy,
        navigation_fallback: Url,
    ) -> Self {
        Self { db, network, names, asset_strategy, navigation_fallback }
    }

    /// The ordered tiers used for a request class.
    pub fn plan(&self, class: RequestClass) -> Vec<Tier> {
        match class {
            RequestClass::Navigation => vec![
                Tier::Network { store: Purpose::Runtime },
                Tier::Cached { search: vec![Purpose::Runtime, Purpose::Shell] },
                Tier::CachedUrl { url: self.navigation_fallback.clone(), search: vec![Purpose::Shell, Purpose::Runtime] },
                Tier::OfflineDocument,
            ],
            RequestClass::OnDemand => vec![
                Tier::Network { store: Purpose::OnDemand },
                Tier::Cached { search: vec![Purpose::OnDemand, Purpose::Shell] },
            ],
            RequestClass::Asset => {
                let network = Tier::Network { store: Purpose::Runtime };
                let cached = Tier::Cached { search: vec![Purpose::Runtime, Purpose::Shell] };
                match self.asset_strategy {
                    AssetStrategy::CacheFirst => vec![cached, network],
                    AssetStrategy::NetworkFirst => vec![network, cached],
                }
            }
        }
    }

    /// Run the plan for `class`.
    pub async fn respond(&self, class: RequestClass, request: &InterceptedRequest) -> Outcome {
        let plan = self.plan(class);
        self.execute(&plan, request).await
    }

    /// Run tiers in order until one produces a response.
    pub async fn execute(&self, plan: &[Tier], request: &InterceptedRequest) -> Outcome {
        let mut deferred = None;
        let mut misses = Vec::new();

        for tier in plan {
            match self.attempt(tier, request).await {
                Attempt::Served(response) => {
                    tracing::debug!(url = %request.url, ?tier, source = ?response.source, "served");
                    return Outcome::Served(response);
                }
                Attempt::Deferred(response) => {
                    tracing::debug!(url = %request.url, ?tier, status = response.status.as_u16(), "deferred");
                    misses.push(format!("status {}", response.status.as_u16()));
                    deferred.get_or_insert(response);
                }
                Attempt::Miss(reason) => {
                    tracing::debug!(url = %request.url, ?tier, %reason, "tier missed");
                    misses.push(reason);
                }
            }
        }

        match deferred {
            Some(response) => Outcome::Served(response),
            None => {
                let reason = if misses.is_empty() { "empty plan".to_string() } else { misses.join("; ") };
                tracing::warn!(url = %request.url, %reason, "request failed in every tier");
                Outcome::Failed(reason)
            }
        }
    }

    async fn attempt(&self, tier: &Tier, request: &InterceptedRequest) -> Attempt {
        match tier {
            Tier::Network { store } => self.from_network(*store, request).await,
            Tier::Cached { search } => self.from_cache(&request.key(), search).await,
            Tier::CachedUrl { url, search } => self.from_cache(&RequestKey::get(url), search).await,
            Tier::OfflineDocument => Attempt::Served(Response::offline_document()),
        }
    }

    async fn from_network(&self, store: Purpose, request: &InterceptedRequest) -> Attempt {
        let fetched = match self.network.fetch(&request.to_fetch()).await {
            Ok(fetched) => fetched,
            Err(e) => return Attempt::Miss(e.to_string()),
        };

        let response = Response::from_network(fetched);
        if response.status.is_server_error() {
            return Attempt::Deferred(response);
        }
        if response.is_success() {
            self.store(store, request.key(), &response).await;
        }
        Attempt::Served(response)
    }

    async fn from_cache(&self, key: &RequestKey, search: &[Purpose]) -> Attempt {
        let sets: Vec<&str> = search.iter().map(|p| self.names.name(*p)).collect();
        match self.db.match_any(key, &sets).await {
            Ok(Some((set, stored))) => Attempt::Served(Response::from_cache(set, stored)),
            Ok(None) => Attempt::Miss(format!("no cached entry for {key}")),
            Err(e) => {
                tracing::warn!(%key, error = %e, "cache lookup failed");
                Attempt::Miss(e.to_string())
            }
        }
    }

    /// Writes are anchored on this version's shell set. Once a newer version
    /// has activated and deleted it, nothing is stored, so stale sets are
    /// never recreated.
    async fn store(&self, purpose: Purpose, key: RequestKey, response: &Response) {
        let set = self.names.name(purpose);
        match self
            .db
            .put_anchored(self.names.shell(), set, &response.to_stored(key.clone()))
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(%key, set, version = self.names.version(), "superseded version, response not stored")
            }
            Err(e) => tracing::warn!(%key, set, error = %e, "failed to store response; serving it anyway"),
        }
    }
}
