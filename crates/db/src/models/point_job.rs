//! Point-award job model.

use civic_core::points::{PointAward, PointJobStatus};
use civic_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `point_award_jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PointAwardJob {
    pub id: DbId,
    pub event_id: DbId,
    pub active_area_id: DbId,
    pub amount: i32,
    #[sqlx(try_from = "i16")]
    pub status: PointJobStatus,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub run_after: Timestamp,
    pub claimed_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PointAwardJob {
    pub fn award(&self) -> PointAward {
        PointAward {
            event_id: self.event_id,
            active_area_id: self.active_area_id,
            amount: self.amount,
        }
    }
}

/// Result of applying a claimed award.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwardOutcome {
    Applied {
        event_point: i32,
        dashboard_point: i32,
    },
    /// The job was no longer running; nothing was written.
    AlreadyApplied,
    /// The event no longer exists; nothing was written.
    EventMissing,
}
