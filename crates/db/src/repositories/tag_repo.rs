//! Repository for the `active_area_tags` table.

use civic_core::types::DbId;
use sqlx::PgPool;

use crate::models::tag::ActiveAreaTag;

const COLUMNS: &str = "id, active_area_id, name, created_at, updated_at";

pub struct TagRepo;

impl TagRepo {
    /// Find a tag by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ActiveAreaTag>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM active_area_tags WHERE id = $1");
        sqlx::query_as::<_, ActiveAreaTag>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find several tags at once, for decorating a page of events.
    pub async fn find_by_ids(pool: &PgPool, ids: &[DbId]) -> Result<Vec<ActiveAreaTag>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!("SELECT {COLUMNS} FROM active_area_tags WHERE id = ANY($1)");
        sqlx::query_as::<_, ActiveAreaTag>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }
}
