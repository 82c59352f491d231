pub mod client;
pub mod events;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /events                          create (admin)
/// /events/search                   filtered, paginated listing (admin)
/// /events/summary                  area count and charts (admin)
/// /events/top                      check-in ranking (admin)
/// /events/report                   CSV export (admin)
/// /events/{id}                     get, save, update, delete (admin)
/// /events/{id}/points              queue a point award (admin)
///
/// /client/events/map               map listing (public)
/// /client/events/{id}              single published event (public)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/events", events::router())
        .nest("/client/events", client::router())
}
