//! Read models produced by aggregate queries.

use civic_core::types::DbId;
use serde::Serialize;
use sqlx::FromRow;

/// One entry of the check-in ranking.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TopEvent {
    pub id: DbId,
    pub name: Option<String>,
    /// The event's `town`.
    pub address: Option<String>,
    pub check_in_count: i64,
}

/// A page of events plus the unpaginated match count.
#[derive(Debug, Clone, Serialize)]
pub struct EventPage<T> {
    pub items: Vec<T>,
    pub total_count: i64,
}
