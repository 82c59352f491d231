//! Request bodies and query parameter types for the event handlers.
//!
//! Filter expressions arrive as raw JSON under `q` and are parsed into a
//! typed [`FilterExpr`] before they reach the repositories.

use civic_core::chart::{ChartArgs, ChartPeriod};
use civic_core::error::CoreError;
use civic_core::event::EventChanges;
use civic_core::filter::{FilterExpr, SortSpec};
use civic_core::relation_check::NestedAttributes;
use civic_core::types::{DbId, Timestamp};
use serde::Deserialize;

/// Body of `POST /events` and `PUT /events/{id}`: event attributes plus the
/// nested relation payloads, side by side.
#[derive(Debug, Default, Deserialize)]
pub struct SaveEventRequest {
    #[serde(flatten)]
    pub attributes: EventChanges,
    #[serde(flatten)]
    pub nested: NestedAttributes,
}

/// Filter and sort shared by the listing endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct FilterParams {
    #[serde(default)]
    pub q: serde_json::Value,
    pub sort_column: Option<String>,
    pub sort_direction: Option<String>,
}

impl FilterParams {
    pub fn filter(&self) -> Result<FilterExpr, CoreError> {
        FilterExpr::parse(&self.q)
    }

    pub fn sort(&self) -> Result<SortSpec, CoreError> {
        SortSpec::parse(self.sort_column.as_deref(), self.sort_direction.as_deref())
    }
}

/// Body of `POST /events/search`.
#[derive(Debug, Default, Deserialize)]
pub struct SearchRequest {
    #[serde(flatten)]
    pub params: FilterParams,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Query string of `GET /events/summary`.
///
/// `active_area_id` falls back to the caller's own area.
#[derive(Debug, Default, Deserialize)]
pub struct SummaryParams {
    pub active_area_id: Option<DbId>,
    pub period: Option<ChartPeriod>,
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
}

impl SummaryParams {
    pub fn chart_args(&self) -> ChartArgs {
        ChartArgs {
            period: self.period.unwrap_or_default(),
            from: self.from,
            to: self.to,
        }
    }
}

/// Body of `POST /client/events/map`.
#[derive(Debug, Default, Deserialize)]
pub struct MapRequest {
    #[serde(default)]
    pub q: serde_json::Value,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub year: Option<i32>,
    pub month: Option<u32>,
}

/// Body of `POST /events/{id}/points`.
#[derive(Debug, Deserialize)]
pub struct AddPointsRequest {
    pub active_area_id: DbId,
    pub point: i32,
}
