//! Background worker that applies queued point awards.
//!
//! The API only enqueues awards. This loop claims due jobs one at a time,
//! applies each in its own transaction, and records failures with backoff
//! until the attempt limit is reached.

use std::time::Duration;

use civic_core::points::PointJobStatus;
use civic_core::types::DbId;
use civic_db::models::point_job::AwardOutcome;
use civic_db::repositories::PointAwardJobRepo;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

/// Default pause between polls when the queue is empty.
const DEFAULT_POLL_SECS: u64 = 2;

/// Default age after which a running job is assumed abandoned.
const DEFAULT_STALE_AFTER_SECS: i64 = 300;

/// Worker settings, loaded from the environment.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub poll_interval: Duration,
    pub stale_after_secs: i64,
}

impl WorkerConfig {
    /// | Env Var                    | Default |
    /// |----------------------------|---------|
    /// | `POINT_WORKER_POLL_SECS`   | `2`     |
    /// | `POINT_WORKER_STALE_SECS`  | `300`   |
    pub fn from_env() -> Self {
        let poll_secs: u64 = std::env::var("POINT_WORKER_POLL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_POLL_SECS);

        let stale_after_secs: i64 = std::env::var("POINT_WORKER_STALE_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_STALE_AFTER_SECS);

        Self {
            poll_interval: Duration::from_secs(poll_secs),
            stale_after_secs,
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_POLL_SECS),
            stale_after_secs: DEFAULT_STALE_AFTER_SECS,
        }
    }
}

/// What happened to the job handled by [`process_next`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobResult {
    Applied { job_id: DbId, event_point: i32 },
    /// Another delivery already applied it.
    Skipped { job_id: DbId },
    /// Attempt failed; the job is pending again or failed for good.
    Failed { job_id: DbId, status: PointJobStatus },
}

/// Claim and apply the next due job. Returns `None` when nothing is due.
pub async fn process_next(pool: &PgPool) -> Result<Option<JobResult>, sqlx::Error> {
    let Some(job) = PointAwardJobRepo::claim_next(pool).await? else {
        return Ok(None);
    };

    let result = match PointAwardJobRepo::apply(pool, &job).await {
        Ok(AwardOutcome::Applied {
            event_point,
            dashboard_point,
        }) => {
            tracing::info!(
                job_id = job.id,
                event_id = job.event_id,
                amount = job.amount,
                event_point,
                dashboard_point,
                "Point award applied",
            );
            JobResult::Applied {
                job_id: job.id,
                event_point,
            }
        }
        Ok(AwardOutcome::AlreadyApplied) => {
            tracing::debug!(job_id = job.id, "Point award already applied");
            JobResult::Skipped { job_id: job.id }
        }
        Ok(AwardOutcome::EventMissing) => {
            // Retrying cannot bring the event back.
            PointAwardJobRepo::mark_failed(pool, job.id, "event not found").await?;
            tracing::warn!(job_id = job.id, event_id = job.event_id, "Point award target missing");
            JobResult::Failed {
                job_id: job.id,
                status: PointJobStatus::Failed,
            }
        }
        Err(e) => {
            let status = PointAwardJobRepo::record_failure(pool, &job, &e.to_string()).await?;
            if status == PointJobStatus::Failed {
                tracing::error!(
                    job_id = job.id,
                    attempts = job.attempts,
                    error = %e,
                    "Point award failed permanently",
                );
            } else {
                tracing::warn!(
                    job_id = job.id,
                    attempts = job.attempts,
                    error = %e,
                    "Point award attempt failed, will retry",
                );
            }
            JobResult::Failed {
                job_id: job.id,
                status,
            }
        }
    };

    Ok(Some(result))
}

/// Requeue abandoned jobs, then drain everything currently due.
async fn tick(pool: &PgPool, config: &WorkerConfig, cancel: &CancellationToken) {
    match PointAwardJobRepo::requeue_stale(pool, config.stale_after_secs).await {
        Ok(0) => {}
        Ok(requeued) => tracing::warn!(requeued, "Requeued stale point award jobs"),
        Err(e) => tracing::error!(error = %e, "Failed to requeue stale point award jobs"),
    }

    while !cancel.is_cancelled() {
        match process_next(pool).await {
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "Point award queue poll failed");
                break;
            }
        }
    }
}

/// Run the worker loop until `cancel` is triggered.
pub async fn run(pool: PgPool, config: WorkerConfig, cancel: CancellationToken) {
    tracing::info!(
        poll_secs = config.poll_interval.as_secs(),
        stale_after_secs = config.stale_after_secs,
        "Point award worker started"
    );

    let mut interval = tokio::time::interval(config.poll_interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Point award worker stopping");
                break;
            }
            _ = interval.tick() => {
                tick(&pool, &config, &cancel).await;
            }
        }
    }
}
