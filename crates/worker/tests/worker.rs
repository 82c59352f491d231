//! Integration tests for the point-award worker loop.

use std::time::Duration;

use assert_matches::assert_matches;
use civic_core::points::{PointAward, PointJobStatus};
use civic_core::types::DbId;
use civic_db::repositories::PointAwardJobRepo;
use civic_worker::{process_next, run, JobResult, WorkerConfig};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

async fn create_event(pool: &PgPool) -> (DbId, DbId) {
    let area: DbId = sqlx::query_scalar("INSERT INTO active_areas (name) VALUES ('Kita') RETURNING id")
        .fetch_one(pool)
        .await
        .unwrap();
    let event: DbId = sqlx::query_scalar(
        "INSERT INTO events (name, active_area_id) VALUES ('Cleanup', $1) RETURNING id",
    )
    .bind(area)
    .fetch_one(pool)
    .await
    .unwrap();
    (event, area)
}

async fn event_point(pool: &PgPool, event_id: DbId) -> i32 {
    sqlx::query_scalar("SELECT point FROM events WHERE id = $1")
        .bind(event_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_empty_queue_is_idle(pool: PgPool) {
    assert_eq!(process_next(&pool).await.unwrap(), None);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_process_next_applies_award(pool: PgPool) {
    let (event_id, area) = create_event(&pool).await;
    let job = PointAwardJobRepo::enqueue(&pool, &PointAward::new(event_id, area, 40).unwrap())
        .await
        .unwrap();

    let result = process_next(&pool).await.unwrap();
    assert_eq!(
        result,
        Some(JobResult::Applied {
            job_id: job.id,
            event_point: 40,
        })
    );
    assert_eq!(event_point(&pool, event_id).await, 40);

    let receives: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM transactions WHERE event_id = $1 AND kind = 'receive'",
    )
    .bind(event_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(receives, 1);

    // Completed jobs are never claimed again.
    assert_eq!(process_next(&pool).await.unwrap(), None);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_failed_attempt_is_rescheduled(pool: PgPool) {
    let (event_id, area) = create_event(&pool).await;
    let job = PointAwardJobRepo::enqueue(&pool, &PointAward::new(event_id, area, 5).unwrap())
        .await
        .unwrap();

    // Force the dashboard upsert to fail inside the award transaction.
    sqlx::query(
        "ALTER TABLE dashboard_events ADD CONSTRAINT ck_test_reject CHECK (point < 0) NOT VALID",
    )
    .execute(&pool)
    .await
    .unwrap();

    let result = process_next(&pool).await.unwrap();
    assert_matches!(
        result,
        Some(JobResult::Failed { job_id, status: PointJobStatus::Pending }) if job_id == job.id
    );

    // Rolled back; the job is pending again with the error.
    assert_eq!(event_point(&pool, event_id).await, 0);
    let stored = PointAwardJobRepo::find_by_id(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(stored.status, PointJobStatus::Pending);
    assert!(stored.last_error.is_some());
    assert_eq!(stored.attempts, 1);

    // Backed off, so not due yet.
    assert_eq!(process_next(&pool).await.unwrap(), None);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_run_drains_queue_and_stops_on_cancel(pool: PgPool) {
    let (event_id, area) = create_event(&pool).await;
    for amount in [3, 4] {
        PointAwardJobRepo::enqueue(&pool, &PointAward::new(event_id, area, amount).unwrap())
            .await
            .unwrap();
    }

    let cancel = CancellationToken::new();
    let config = WorkerConfig {
        poll_interval: Duration::from_millis(20),
        stale_after_secs: 300,
    };
    let handle = tokio::spawn(run(pool.clone(), config, cancel.clone()));

    let mut total = 0;
    for _ in 0..100 {
        total = event_point(&pool, event_id).await;
        if total == 7 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(total, 7);

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("worker stops after cancel")
        .unwrap();
}
