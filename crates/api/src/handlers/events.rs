//! Handlers for the administrative event endpoints.
//!
//! Every endpoint requires an `admin` or `system_admin` token. Single-event
//! operations run the area permission check before touching the row; list
//! operations narrow area-bound admins to their own area.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use civic_core::chart::EventSummary;
use civic_core::error::CoreError;
use civic_core::event::{EventChanges, EventFields};
use civic_core::filter::{
    clamp_limit, clamp_offset, FilterExpr, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT, TOP_EVENT_LIMIT,
};
use civic_core::lifecycle::run_publish_hook;
use civic_core::permission::{authorize_event_access, Requester};
use civic_core::points::{PointAward, PointAwardQueue};
use civic_core::relation_check::{NestedAttributes, RelationValidator};
use civic_core::types::DbId;
use civic_db::models::aggregate::EventPage;
use civic_db::models::event::Event;
use civic_db::repositories::{ChartRepo, ChartSource, EventRelationRepo, EventRepo};
use serde::Serialize;

use super::event_view::{present_detail, present_events};
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::profiler::profile_and_notify;
use crate::query::{AddPointsRequest, FilterParams, SaveEventRequest, SearchRequest, SummaryParams};
use crate::report::render_csv;
use crate::response::DataResponse;
use crate::state::AppState;

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity: "Event", id })
}

/// Load an event and check the caller may act on it.
async fn load_authorized(state: &AppState, requester: &Requester, id: DbId) -> AppResult<Event> {
    let event = EventRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    authorize_event_access(requester, event.active_area_id)?;
    Ok(event)
}

/// Area-bound admins only ever list events in their own area.
fn scope_for(requester: &Requester, filter: FilterExpr) -> FilterExpr {
    if requester.is_area_restricted() {
        filter.scoped_to_area(requester.active_area_id)
    } else {
        filter
    }
}

// ---------------------------------------------------------------------------
// Write path
// ---------------------------------------------------------------------------

/// Merge `changes` onto the stored event (or a fresh one), persist it and any
/// nested rows in one transaction, then run the publish hook.
async fn write_event(
    state: &AppState,
    requester: &Requester,
    id: Option<DbId>,
    changes: &EventChanges,
    nested: Option<&NestedAttributes>,
) -> AppResult<Event> {
    let mut tx = state.pool.begin().await?;

    let (previous, mut fields) = match id {
        Some(id) => {
            let current = EventRepo::find_for_update(&mut *tx, id)
                .await?
                .ok_or_else(|| not_found(id))?;
            authorize_event_access(requester, current.active_area_id)?;
            (Some(current.progress), current.fields())
        }
        None => (
            None,
            EventFields {
                user_id: Some(requester.user_id),
                ..Default::default()
            },
        ),
    };

    fields.merge(changes);
    // Moving an event out of the caller's area is as forbidden as reading it.
    authorize_event_access(requester, fields.active_area_id)?;
    fields.validate_for_save()?;

    let event = match id {
        Some(id) => EventRepo::update(&mut *tx, id, &fields)
            .await?
            .ok_or_else(|| not_found(id))?,
        None => EventRepo::create(&mut *tx, &fields).await?,
    };

    if let Some(nested) = nested {
        EventRelationRepo::apply_nested(&mut *tx, event.id, nested).await?;
    }

    tx.commit().await?;

    tracing::info!(
        event_id = event.id,
        user_id = requester.user_id,
        progress = %event.progress,
        "Event saved",
    );

    let published = run_publish_hook(
        state.recorder.as_ref(),
        Some(requester.user_id),
        event.id,
        previous,
        event.progress,
    )
    .await?;
    if published {
        tracing::info!(event_id = event.id, "Event published");
    }

    Ok(event)
}

/// The full save: permission check, nested payload checks, then the write.
async fn save_with_relations(
    state: &AppState,
    requester: &Requester,
    id: Option<DbId>,
    input: &SaveEventRequest,
) -> AppResult<Event> {
    if let Some(id) = id {
        load_authorized(state, requester, id).await?;
    }

    input.nested.validate_new_rows()?;

    let pool = &state.pool;
    RelationValidator::check(&input.nested, move |relation| async move {
        match id {
            Some(id) => EventRelationRepo::owned_ids(pool, relation, id)
                .await
                .map_err(AppError::from),
            // A record that does not exist yet owns nothing.
            None => Ok(Vec::new()),
        }
    })
    .await?;

    write_event(state, requester, id, &input.attributes, Some(&input.nested)).await
}

/// POST /api/v1/events
pub async fn create_event(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<SaveEventRequest>,
) -> AppResult<impl IntoResponse> {
    let event = profile_and_notify(
        "events.save",
        state.config.slow_call_threshold(),
        save_with_relations(&state, &admin, None, &input),
    )
    .await?;

    let detail = present_detail(&state, event).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: detail })))
}

/// PUT /api/v1/events/{id}
///
/// Update attributes and apply nested relation payloads.
pub async fn save_event(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<SaveEventRequest>,
) -> AppResult<impl IntoResponse> {
    let event = profile_and_notify(
        "events.save",
        state.config.slow_call_threshold(),
        save_with_relations(&state, &admin, Some(id), &input),
    )
    .await?;

    let detail = present_detail(&state, event).await?;
    Ok(Json(DataResponse { data: detail }))
}

/// PATCH /api/v1/events/{id}
///
/// Attributes only; nested relations are left alone.
pub async fn update_event(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(changes): Json<EventChanges>,
) -> AppResult<impl IntoResponse> {
    let event = profile_and_notify(
        "events.update",
        state.config.slow_call_threshold(),
        write_event(&state, &admin, Some(id), &changes, None),
    )
    .await?;

    let detail = present_detail(&state, event).await?;
    Ok(Json(DataResponse { data: detail }))
}

/// GET /api/v1/events/{id}
pub async fn get_event(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let event = load_authorized(&state, &admin, id).await?;
    let detail = present_detail(&state, event).await?;
    Ok(Json(DataResponse { data: detail }))
}

/// DELETE /api/v1/events/{id}
///
/// Irreversible; removes every row the event owns.
pub async fn delete_event(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    load_authorized(&state, &admin, id).await?;

    if !EventRepo::delete(&state.pool, id).await? {
        return Err(not_found(id));
    }

    tracing::info!(event_id = id, user_id = admin.user_id, "Event deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

/// POST /api/v1/events/search
pub async fn search_events(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<SearchRequest>,
) -> AppResult<impl IntoResponse> {
    let filter = scope_for(&admin, input.params.filter()?);
    let sort = input.params.sort()?;
    let limit = clamp_limit(input.limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT);
    let offset = clamp_offset(input.offset);

    let page = profile_and_notify(
        "events.aggregate",
        state.config.slow_call_threshold(),
        EventRepo::search(&state.pool, &filter, &sort, limit, offset),
    )
    .await?;

    let items = present_events(&state, page.items).await?;
    Ok(Json(DataResponse {
        data: EventPage {
            items,
            total_count: page.total_count,
        },
    }))
}

/// GET /api/v1/events/summary
///
/// Event count and created-per-period charts for one active area.
pub async fn summarize_events(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<SummaryParams>,
) -> AppResult<impl IntoResponse> {
    let area = params
        .active_area_id
        .or(admin.active_area_id)
        .ok_or_else(|| AppError::BadRequest("active_area_id is required".into()))?;
    authorize_event_access(&admin, Some(area))?;

    let args = params.chart_args();
    args.validate()?;

    let pool = &state.pool;
    let tz = state.config.chart_timezone.as_str();
    let (total_count, event_chart, checkin_chart, exchange_chart) = tokio::try_join!(
        EventRepo::count_in_area(pool, area),
        ChartRepo::series(pool, ChartSource::Events, area, &args, tz),
        ChartRepo::series(pool, ChartSource::Checkins, area, &args, tz),
        ChartRepo::series(pool, ChartSource::PointExchanges, area, &args, tz),
    )?;

    Ok(Json(DataResponse {
        data: EventSummary {
            total_count,
            period: args.period,
            event_chart,
            checkin_chart,
            exchange_chart,
        },
    }))
}

/// POST /api/v1/events/top
///
/// The most checked-in events matching the filter.
pub async fn top_events(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(params): Json<FilterParams>,
) -> AppResult<impl IntoResponse> {
    let filter = scope_for(&admin, params.filter()?);
    let top = EventRepo::top_by_checkins(&state.pool, &filter, TOP_EVENT_LIMIT).await?;
    Ok(Json(DataResponse { data: top }))
}

/// POST /api/v1/events/report
///
/// Every matching event as a CSV download.
pub async fn export_events(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(params): Json<FilterParams>,
) -> AppResult<impl IntoResponse> {
    let filter = scope_for(&admin, params.filter()?);
    let sort = params.sort()?;
    let events = EventRepo::list_all(&state.pool, &filter, &sort).await?;

    tracing::info!(rows = events.len(), user_id = admin.user_id, "Event report generated");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"events.csv\"",
            ),
        ],
        render_csv(&events),
    ))
}

// ---------------------------------------------------------------------------
// Points
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct PointAwardAccepted {
    pub job_id: DbId,
}

/// POST /api/v1/events/{id}/points
///
/// Queues the award and answers 202; the worker applies it later.
pub async fn add_points(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<AddPointsRequest>,
) -> AppResult<impl IntoResponse> {
    let award = PointAward::new(id, input.active_area_id, input.point)?;
    load_authorized(&state, &admin, id).await?;
    // The credited area is scoped too, not only the event's own area.
    authorize_event_access(&admin, Some(input.active_area_id))?;

    let job_id = state.point_queue.enqueue(award).await?;

    tracing::info!(
        event_id = id,
        job_id,
        amount = input.point,
        user_id = admin.user_id,
        "Point award queued",
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: PointAwardAccepted { job_id },
        }),
    ))
}
