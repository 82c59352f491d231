//! Public event endpoints used by the resident-facing app.
//!
//! No authentication. Only active, published events are ever returned, and
//! a hidden event is indistinguishable from a missing one.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use civic_core::error::CoreError;
use civic_core::filter::FilterExpr;
use civic_core::permission::ensure_client_visible;
use civic_core::time_window::MapSelection;
use civic_core::types::DbId;
use civic_db::repositories::EventRepo;

use super::event_view::{present_detail, present_map_events};
use crate::error::AppResult;
use crate::profiler::profile_and_notify;
use crate::query::MapRequest;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/client/events/{id}
pub async fn get_client_event(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let event = EventRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::OccurredError)?;
    ensure_client_visible(event.status, event.progress)?;

    let detail = present_detail(&state, event).await?;
    Ok(Json(DataResponse { data: detail }))
}

/// POST /api/v1/client/events/map
///
/// Coordinates select events within the proximity radius, nearest first;
/// otherwise `year` + `month` select a calendar month; otherwise events
/// currently on the map.
pub async fn map_events(
    State(state): State<AppState>,
    Json(input): Json<MapRequest>,
) -> AppResult<impl IntoResponse> {
    let filter = FilterExpr::parse(&input.q)?;
    let selection =
        MapSelection::resolve(input.lat, input.lng, input.year, input.month, Utc::now())?;

    let rows = profile_and_notify(
        "events.aggregate_by_location",
        state.config.slow_call_threshold(),
        EventRepo::list_for_map(&state.pool, &selection, &filter),
    )
    .await?;

    tracing::debug!(count = rows.len(), "Map events loaded");

    let events = present_map_events(&state, rows).await?;
    Ok(Json(DataResponse { data: events }))
}
