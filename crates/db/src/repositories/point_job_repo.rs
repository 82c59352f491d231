//! Repository for the `point_award_jobs` queue.

use civic_core::event::{EVENT_ENTITY_TYPE, RECEIVE_TYPE};
use civic_core::points::{
    retry_backoff_secs, status_after_failure, PointAward, PointAwardQueue, PointJobStatus,
};
use civic_core::types::DbId;
use sqlx::PgPool;

use crate::models::point_job::{AwardOutcome, PointAwardJob};
use crate::models::transaction::CreateTransaction;
use crate::repositories::{DashboardEventRepo, EventRepo, TransactionRepo};

const COLUMNS: &str = "id, event_id, active_area_id, amount, status, attempts, last_error, \
    run_after, claimed_at, completed_at, created_at, updated_at";

pub struct PointAwardJobRepo;

impl PointAwardJobRepo {
    /// Queue an award, returning the pending job.
    pub async fn enqueue(pool: &PgPool, award: &PointAward) -> Result<PointAwardJob, sqlx::Error> {
        let query = format!(
            "INSERT INTO point_award_jobs (event_id, active_area_id, amount, status) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PointAwardJob>(&query)
            .bind(award.event_id)
            .bind(award.active_area_id)
            .bind(award.amount)
            .bind(PointJobStatus::Pending.id())
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<PointAwardJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM point_award_jobs WHERE id = $1");
        sqlx::query_as::<_, PointAwardJob>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Atomically claim the oldest due pending job and count the attempt.
    ///
    /// Uses `SELECT FOR UPDATE SKIP LOCKED` so concurrent workers never
    /// claim the same job.
    pub async fn claim_next(pool: &PgPool) -> Result<Option<PointAwardJob>, sqlx::Error> {
        let query = format!(
            "UPDATE point_award_jobs \
             SET status = $1, claimed_at = NOW(), attempts = attempts + 1, updated_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM point_award_jobs \
                 WHERE status = $2 AND run_after <= NOW() \
                 ORDER BY id \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PointAwardJob>(&query)
            .bind(PointJobStatus::Running.id())
            .bind(PointJobStatus::Pending.id())
            .fetch_optional(pool)
            .await
    }

    /// Apply a claimed award in one transaction.
    ///
    /// The job is marked completed in the same transaction as the point
    /// increment, dashboard rollup, and `receive` ledger row, so a job that
    /// is already completed is never applied again.
    pub async fn apply(pool: &PgPool, job: &PointAwardJob) -> Result<AwardOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let marked: Option<DbId> = sqlx::query_scalar(
            "UPDATE point_award_jobs \
             SET status = $2, completed_at = NOW(), last_error = NULL, updated_at = NOW() \
             WHERE id = $1 AND status = $3 \
             RETURNING id",
        )
        .bind(job.id)
        .bind(PointJobStatus::Completed.id())
        .bind(PointJobStatus::Running.id())
        .fetch_optional(&mut *tx)
        .await?;
        if marked.is_none() {
            return Ok(AwardOutcome::AlreadyApplied);
        }

        let Some(event_point) = EventRepo::add_points(&mut tx, job.event_id, job.amount).await?
        else {
            return Ok(AwardOutcome::EventMissing);
        };

        let dashboard_point =
            DashboardEventRepo::add_points(&mut tx, job.event_id, job.active_area_id, job.amount)
                .await?;

        TransactionRepo::create(
            &mut tx,
            &CreateTransaction {
                event_id: Some(job.event_id),
                user_id: None,
                transactionable_type: EVENT_ENTITY_TYPE,
                transactionable_id: job.event_id,
                kind: RECEIVE_TYPE,
                point: job.amount,
                active_area_id: Some(job.active_area_id),
            },
        )
        .await?;

        tx.commit().await?;
        Ok(AwardOutcome::Applied {
            event_point,
            dashboard_point,
        })
    }

    /// Record a failed attempt: back to pending with backoff, or failed for
    /// good once the attempt limit is reached.
    pub async fn record_failure(
        pool: &PgPool,
        job: &PointAwardJob,
        error: &str,
    ) -> Result<PointJobStatus, sqlx::Error> {
        let status = status_after_failure(job.attempts);
        sqlx::query(
            "UPDATE point_award_jobs \
             SET status = $2, last_error = $3, claimed_at = NULL, \
                 run_after = NOW() + make_interval(secs => $4), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(job.id)
        .bind(status.id())
        .bind(error)
        .bind(retry_backoff_secs(job.attempts) as f64)
        .execute(pool)
        .await?;
        Ok(status)
    }

    /// Fail a job permanently, regardless of remaining attempts.
    pub async fn mark_failed(pool: &PgPool, job_id: DbId, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE point_award_jobs \
             SET status = $2, last_error = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(job_id)
        .bind(PointJobStatus::Failed.id())
        .bind(error)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Return jobs stuck in running (e.g. after a worker crash) to pending.
    pub async fn requeue_stale(pool: &PgPool, older_than_secs: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE point_award_jobs \
             SET status = $1, claimed_at = NULL, updated_at = NOW() \
             WHERE status = $2 AND claimed_at < NOW() - make_interval(secs => $3)",
        )
        .bind(PointJobStatus::Pending.id())
        .bind(PointJobStatus::Running.id())
        .bind(older_than_secs as f64)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}

/// [`PointAwardQueue`] backed by the `point_award_jobs` table.
#[derive(Clone)]
pub struct PgPointAwardQueue {
    pool: PgPool,
}

impl PgPointAwardQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl PointAwardQueue for PgPointAwardQueue {
    type Error = sqlx::Error;

    async fn enqueue(&self, award: PointAward) -> Result<DbId, sqlx::Error> {
        let job = PointAwardJobRepo::enqueue(&self.pool, &award).await?;
        tracing::debug!(job_id = job.id, event_id = award.event_id, "Point award queued");
        Ok(job.id)
    }
}
