//! Ledger entry model.

use civic_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `transactions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Transaction {
    pub id: DbId,
    pub event_id: Option<DbId>,
    pub user_id: Option<DbId>,
    pub transactionable_type: String,
    pub transactionable_id: DbId,
    pub kind: String,
    pub point: i32,
    pub active_area_id: Option<DbId>,
    pub created_at: Timestamp,
}

/// DTO for writing a ledger entry.
#[derive(Debug, Clone)]
pub struct CreateTransaction<'a> {
    pub event_id: Option<DbId>,
    pub user_id: Option<DbId>,
    pub transactionable_type: &'a str,
    pub transactionable_id: DbId,
    pub kind: &'a str,
    pub point: i32,
    pub active_area_id: Option<DbId>,
}
