//! Route definitions for the public event endpoints.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::client;
use crate::state::AppState;

/// Routes mounted at `/client/events`.
///
/// ```text
/// POST   /map     -> map_events
/// GET    /{id}    -> get_client_event
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/map", post(client::map_events))
        .route("/{id}", get(client::get_client_event))
}
