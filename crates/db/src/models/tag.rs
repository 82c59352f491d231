//! Area tag model.

use civic_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `active_area_tags` table. Events point at one via `event_tag`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ActiveAreaTag {
    pub id: DbId,
    pub active_area_id: DbId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
