//! Point awards and their background job lifecycle.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

/// A job is marked failed after this many unsuccessful attempts.
pub const MAX_AWARD_ATTEMPTS: i32 = 5;

/// Largest amount a single award may grant.
pub const MAX_AWARD_AMOUNT: i32 = 1_000_000;

/// A validated request to add points to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointAward {
    pub event_id: DbId,
    pub active_area_id: DbId,
    pub amount: i32,
}

impl PointAward {
    pub fn new(event_id: DbId, active_area_id: DbId, amount: i32) -> Result<Self, CoreError> {
        if amount <= 0 {
            return Err(CoreError::Validation(
                "point must be greater than 0".to_string(),
            ));
        }
        if amount > MAX_AWARD_AMOUNT {
            return Err(CoreError::Validation(format!(
                "point must be less than or equal to {MAX_AWARD_AMOUNT}"
            )));
        }
        Ok(Self {
            event_id,
            active_area_id,
            amount,
        })
    }
}

/// Accepts awards for asynchronous execution.
pub trait PointAwardQueue: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Enqueue the award and return the job id.
    fn enqueue(&self, award: PointAward) -> impl Future<Output = Result<DbId, Self::Error>> + Send;
}

/// Status of a row in `point_award_jobs`.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointJobStatus {
    Pending = 1,
    Running = 2,
    Completed = 3,
    Failed = 4,
}

impl PointJobStatus {
    pub fn id(self) -> i16 {
        self as i16
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PointJobStatus::Completed | PointJobStatus::Failed)
    }
}

impl TryFrom<i16> for PointJobStatus {
    type Error = CoreError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(PointJobStatus::Pending),
            2 => Ok(PointJobStatus::Running),
            3 => Ok(PointJobStatus::Completed),
            4 => Ok(PointJobStatus::Failed),
            other => Err(CoreError::Validation(format!("Unknown job status id {other}"))),
        }
    }
}

/// Status a job moves to after an attempt fails.
///
/// `attempts` counts the attempt that just failed.
pub fn status_after_failure(attempts: i32) -> PointJobStatus {
    if attempts >= MAX_AWARD_ATTEMPTS {
        PointJobStatus::Failed
    } else {
        PointJobStatus::Pending
    }
}

/// Seconds to wait before the next attempt, doubling from 2s up to a minute.
pub fn retry_backoff_secs(attempts: i32) -> i64 {
    let exp = attempts.clamp(1, 6) as u32;
    (1_i64 << exp).min(60)
}
