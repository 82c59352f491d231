//! Civic events API server library.
//!
//! Exposes config, state, error handling, auth extractors and routes so the
//! binary entrypoint and integration tests build the exact same app.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod profiler;
pub mod query;
pub mod report;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
