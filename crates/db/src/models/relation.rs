//! Rows owned by an event.

use civic_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `event_images` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EventImage {
    pub id: DbId,
    pub event_id: DbId,
    pub image: String,
    pub position: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `event_sdgs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EventSdg {
    pub id: DbId,
    pub event_id: DbId,
    pub sdg_id: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `event_point_exchanges` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EventPointExchange {
    pub id: DbId,
    pub event_id: DbId,
    pub name: String,
    pub point: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `event_checkins` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EventCheckin {
    pub id: DbId,
    pub event_id: DbId,
    pub user_id: DbId,
    pub created_at: Timestamp,
}
