//! Repository for the `transactions` ledger.

use civic_core::event::EVENT_ENTITY_TYPE;
use civic_core::lifecycle::{LedgerEntry, TransactionRecorder};
use civic_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::transaction::{CreateTransaction, Transaction};

const COLUMNS: &str = "id, event_id, user_id, transactionable_type, transactionable_id, \
    kind, point, active_area_id, created_at";

pub struct TransactionRepo;

impl TransactionRepo {
    /// Insert a ledger entry, returning the created row.
    pub async fn create(
        conn: &mut PgConnection,
        input: &CreateTransaction<'_>,
    ) -> Result<Transaction, sqlx::Error> {
        let query = format!(
            "INSERT INTO transactions \
                (event_id, user_id, transactionable_type, transactionable_id, kind, point, active_area_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Transaction>(&query)
            .bind(input.event_id)
            .bind(input.user_id)
            .bind(input.transactionable_type)
            .bind(input.transactionable_id)
            .bind(input.kind)
            .bind(input.point)
            .bind(input.active_area_id)
            .fetch_one(conn)
            .await
    }

    /// Ledger entries for an event, oldest first.
    pub async fn list_for_event(pool: &PgPool, event_id: DbId) -> Result<Vec<Transaction>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM transactions WHERE event_id = $1 ORDER BY id");
        sqlx::query_as::<_, Transaction>(&query)
            .bind(event_id)
            .fetch_all(pool)
            .await
    }
}

/// [`TransactionRecorder`] writing to the `transactions` table.
#[derive(Clone)]
pub struct PgTransactionRecorder {
    pool: PgPool,
}

impl PgTransactionRecorder {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl TransactionRecorder for PgTransactionRecorder {
    type Error = sqlx::Error;

    async fn record(&self, entry: LedgerEntry) -> Result<(), sqlx::Error> {
        let event_id = (entry.entity_type == EVENT_ENTITY_TYPE).then_some(entry.entity_id);
        let mut conn = self.pool.acquire().await?;
        TransactionRepo::create(
            &mut conn,
            &CreateTransaction {
                event_id,
                user_id: entry.actor_id,
                transactionable_type: entry.entity_type,
                transactionable_id: entry.entity_id,
                kind: entry.kind,
                point: 0,
                active_area_id: None,
            },
        )
        .await?;
        Ok(())
    }
}
