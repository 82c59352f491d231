//! Repository for rows owned by an event through nested payloads.

use civic_core::relation_check::{EventRelation, NestedAttributes};
use civic_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::relation::{EventImage, EventPointExchange, EventSdg};

/// Reads and nested writes for `event_sdgs`, `event_images` and
/// `event_point_exchanges`.
pub struct EventRelationRepo;

impl EventRelationRepo {
    /// Ids of the rows in `relation` currently owned by `event_id`.
    pub async fn owned_ids(
        pool: &PgPool,
        relation: EventRelation,
        event_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let query = format!(
            "SELECT id FROM {} WHERE event_id = $1 ORDER BY id",
            relation.table()
        );
        sqlx::query_scalar(&query)
            .bind(event_id)
            .fetch_all(pool)
            .await
    }

    /// Apply nested payloads inside the caller's transaction.
    ///
    /// Rows without an id are inserted, rows with an id are updated, and
    /// rows flagged `_destroy` are deleted. Updates and deletes are scoped
    /// to `event_id`, so an id owned by another event never matches.
    pub async fn apply_nested(
        conn: &mut PgConnection,
        event_id: DbId,
        payload: &NestedAttributes,
    ) -> Result<(), sqlx::Error> {
        for row in payload.event_sdgs_attributes.iter().flatten() {
            match (row.id, row.destroy) {
                (Some(id), true) => {
                    sqlx::query("DELETE FROM event_sdgs WHERE id = $1 AND event_id = $2")
                        .bind(id)
                        .bind(event_id)
                        .execute(&mut *conn)
                        .await?;
                }
                (Some(id), false) => {
                    sqlx::query(
                        "UPDATE event_sdgs SET sdg_id = COALESCE($3, sdg_id), updated_at = NOW() \
                         WHERE id = $1 AND event_id = $2",
                    )
                    .bind(id)
                    .bind(event_id)
                    .bind(row.sdg_id)
                    .execute(&mut *conn)
                    .await?;
                }
                (None, false) => {
                    if let Some(sdg_id) = row.sdg_id {
                        sqlx::query(
                            "INSERT INTO event_sdgs (event_id, sdg_id) VALUES ($1, $2) \
                             ON CONFLICT ON CONSTRAINT uq_event_sdgs_event_sdg DO NOTHING",
                        )
                        .bind(event_id)
                        .bind(sdg_id)
                        .execute(&mut *conn)
                        .await?;
                    }
                }
                (None, true) => {}
            }
        }

        for row in payload.event_images_attributes.iter().flatten() {
            match (row.id, row.destroy) {
                (Some(id), true) => {
                    sqlx::query("DELETE FROM event_images WHERE id = $1 AND event_id = $2")
                        .bind(id)
                        .bind(event_id)
                        .execute(&mut *conn)
                        .await?;
                }
                (Some(id), false) => {
                    sqlx::query(
                        "UPDATE event_images SET \
                            image = COALESCE($3, image), \
                            position = COALESCE($4, position), \
                            updated_at = NOW() \
                         WHERE id = $1 AND event_id = $2",
                    )
                    .bind(id)
                    .bind(event_id)
                    .bind(&row.image)
                    .bind(row.position)
                    .execute(&mut *conn)
                    .await?;
                }
                (None, false) => {
                    if let Some(image) = &row.image {
                        sqlx::query(
                            "INSERT INTO event_images (event_id, image, position) \
                             VALUES ($1, $2, COALESCE($3, 0))",
                        )
                        .bind(event_id)
                        .bind(image)
                        .bind(row.position)
                        .execute(&mut *conn)
                        .await?;
                    }
                }
                (None, true) => {}
            }
        }

        for row in payload.event_point_exchanges_attributes.iter().flatten() {
            match (row.id, row.destroy) {
                (Some(id), true) => {
                    sqlx::query("DELETE FROM event_point_exchanges WHERE id = $1 AND event_id = $2")
                        .bind(id)
                        .bind(event_id)
                        .execute(&mut *conn)
                        .await?;
                }
                (Some(id), false) => {
                    sqlx::query(
                        "UPDATE event_point_exchanges SET \
                            name = COALESCE($3, name), \
                            point = COALESCE($4, point), \
                            updated_at = NOW() \
                         WHERE id = $1 AND event_id = $2",
                    )
                    .bind(id)
                    .bind(event_id)
                    .bind(&row.name)
                    .bind(row.point)
                    .execute(&mut *conn)
                    .await?;
                }
                (None, false) => {
                    if let Some(name) = &row.name {
                        sqlx::query(
                            "INSERT INTO event_point_exchanges (event_id, name, point) \
                             VALUES ($1, $2, COALESCE($3, 0))",
                        )
                        .bind(event_id)
                        .bind(name)
                        .bind(row.point)
                        .execute(&mut *conn)
                        .await?;
                    }
                }
                (None, true) => {}
            }
        }

        Ok(())
    }

    pub async fn list_sdgs(pool: &PgPool, event_id: DbId) -> Result<Vec<EventSdg>, sqlx::Error> {
        sqlx::query_as::<_, EventSdg>(
            "SELECT id, event_id, sdg_id, created_at, updated_at \
             FROM event_sdgs WHERE event_id = $1 ORDER BY id",
        )
        .bind(event_id)
        .fetch_all(pool)
        .await
    }

    pub async fn list_images(pool: &PgPool, event_id: DbId) -> Result<Vec<EventImage>, sqlx::Error> {
        sqlx::query_as::<_, EventImage>(
            "SELECT id, event_id, image, position, created_at, updated_at \
             FROM event_images WHERE event_id = $1 ORDER BY position, id",
        )
        .bind(event_id)
        .fetch_all(pool)
        .await
    }

    pub async fn list_point_exchanges(
        pool: &PgPool,
        event_id: DbId,
    ) -> Result<Vec<EventPointExchange>, sqlx::Error> {
        sqlx::query_as::<_, EventPointExchange>(
            "SELECT id, event_id, name, point, created_at, updated_at \
             FROM event_point_exchanges WHERE event_id = $1 ORDER BY id",
        )
        .bind(event_id)
        .fetch_all(pool)
        .await
    }
}
