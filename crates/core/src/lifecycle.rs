//! Publication side effects.
//!
//! The hook runs after the event write has committed and is handed the
//! progress before and after the save explicitly.

use std::future::Future;

use crate::event::{EventProgress, EVENT_ENTITY_TYPE, PUBLISH_TYPE};
use crate::types::DbId;

/// A ledger row to be written by a [`TransactionRecorder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    /// User who caused the entry, if known.
    pub actor_id: Option<DbId>,
    pub entity_type: &'static str,
    pub entity_id: DbId,
    pub kind: &'static str,
}

/// Writes financial/activity ledger rows.
pub trait TransactionRecorder: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn record(&self, entry: LedgerEntry) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Whether a save moved the event into published progress.
///
/// `previous` is `None` for a newly created record.
pub fn became_published(previous: Option<EventProgress>, current: EventProgress) -> bool {
    current == EventProgress::Published && previous != Some(EventProgress::Published)
}

/// Record one publish entry when the save published the event.
///
/// Returns whether an entry was written.
pub async fn run_publish_hook<R: TransactionRecorder>(
    recorder: &R,
    actor_id: Option<DbId>,
    event_id: DbId,
    previous: Option<EventProgress>,
    current: EventProgress,
) -> Result<bool, R::Error> {
    if !became_published(previous, current) {
        return Ok(false);
    }
    recorder
        .record(LedgerEntry {
            actor_id,
            entity_type: EVENT_ENTITY_TYPE,
            entity_id: event_id,
            kind: PUBLISH_TYPE,
        })
        .await?;
    Ok(true)
}
