//! Route definitions for the administrative event endpoints.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::events;
use crate::state::AppState;

/// Routes mounted at `/events`.
///
/// ```text
/// POST   /              -> create_event
/// POST   /search        -> search_events
/// GET    /summary       -> summarize_events
/// POST   /top           -> top_events
/// POST   /report        -> export_events
/// GET    /{id}          -> get_event
/// PUT    /{id}          -> save_event
/// PATCH  /{id}          -> update_event
/// DELETE /{id}          -> delete_event
/// POST   /{id}/points   -> add_points
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(events::create_event))
        .route("/search", post(events::search_events))
        .route("/summary", get(events::summarize_events))
        .route("/top", post(events::top_events))
        .route("/report", post(events::export_events))
        .route(
            "/{id}",
            get(events::get_event)
                .put(events::save_event)
                .patch(events::update_event)
                .delete(events::delete_event),
        )
        .route("/{id}/points", post(events::add_points))
}
