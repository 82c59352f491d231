//! Repository for the per-area `dashboard_events` rollup.

use civic_core::types::DbId;
use sqlx::PgConnection;

pub struct DashboardEventRepo;

impl DashboardEventRepo {
    /// Add `amount` to the event's rollup for an area, creating it if needed.
    /// Returns the new rollup total.
    pub async fn add_points(
        conn: &mut PgConnection,
        event_id: DbId,
        active_area_id: DbId,
        amount: i32,
    ) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO dashboard_events (event_id, active_area_id, point) \
             VALUES ($1, $2, $3) \
             ON CONFLICT ON CONSTRAINT uq_dashboard_events_event_area \
             DO UPDATE SET point = dashboard_events.point + EXCLUDED.point, updated_at = NOW() \
             RETURNING point",
        )
        .bind(event_id)
        .bind(active_area_id)
        .bind(amount)
        .fetch_one(conn)
        .await
    }
}
