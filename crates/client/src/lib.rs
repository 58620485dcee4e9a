//! Request interception engine for shellcache.
//!
//! This crate provides the network fetch primitive, the request classifier,
//! the caching strategies and the worker lifecycle (install, activate, serve)
//! shared by the server and any embedding application.

pub mod fetch;
pub mod intercept;
pub mod worker;

#[cfg(test)]
mod testing;

pub use reqwest::{Method, StatusCode, Url};

pub use fetch::{CacheMode, FetchClient, FetchConfig, FetchRequest, FetchResponse, Network};
pub use intercept::{
    Classifier, InterceptedRequest, Outcome, PassReason, RequestClass, RequestMode, Response, ResponseSource, Route,
    StrategyEngine, Tier,
};
pub use worker::{
    ActivateReport, InstallReport, Manifest, Phase, PrecacheFailure, Registration, Worker, WorkerOptions, global,
    register_global,
};
