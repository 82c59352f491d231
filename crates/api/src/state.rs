use std::sync::Arc;

use civic_core::assets::{AssetUrlResolver, CdnUrlResolver};
use civic_db::repositories::{PgPointAwardQueue, PgTransactionRecorder};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: civic_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Turns stored asset keys into public URLs.
    pub assets: Arc<dyn AssetUrlResolver>,
    /// Ledger written to when an event is published.
    pub recorder: Arc<PgTransactionRecorder>,
    /// Queue drained by the point-award worker.
    pub point_queue: Arc<PgPointAwardQueue>,
}

impl AppState {
    /// Wire the default collaborators around `pool`.
    pub fn new(pool: civic_db::DbPool, config: ServerConfig) -> Self {
        Self {
            assets: Arc::new(CdnUrlResolver::new(config.asset_base_url.clone())),
            recorder: Arc::new(PgTransactionRecorder::new(pool.clone())),
            point_queue: Arc::new(PgPointAwardQueue::new(pool.clone())),
            config: Arc::new(config),
            pool,
        }
    }
}
