//! Single-event access rules for admins and public clients.

use crate::error::CoreError;
use crate::event::{EventProgress, EventStatus};
use crate::roles::{AREA_RESTRICTED_EVENT_PERMISSIONS, ROLE_ADMIN};
use crate::types::DbId;

/// The caller of an admin operation, as carried by its access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub user_id: DbId,
    pub role: String,
    pub permission_code: Option<String>,
    pub active_area_id: Option<DbId>,
}

impl Requester {
    /// Whether this requester may only see events in their own active area.
    pub fn is_area_restricted(&self) -> bool {
        self.role == ROLE_ADMIN
            && self
                .permission_code
                .as_deref()
                .is_some_and(|code| AREA_RESTRICTED_EVENT_PERMISSIONS.contains(&code))
    }
}

/// Reject area-restricted admins reaching outside their active area.
///
/// Every other role and permission combination passes.
pub fn authorize_event_access(
    requester: &Requester,
    event_active_area_id: Option<DbId>,
) -> Result<(), CoreError> {
    if requester.is_area_restricted() && event_active_area_id != requester.active_area_id {
        return Err(CoreError::PermissionDenied { resource: "event" });
    }
    Ok(())
}

/// Whether an event may be shown to unauthenticated clients.
pub fn is_client_visible(status: EventStatus, progress: EventProgress) -> bool {
    matches!(
        (status, progress),
        (EventStatus::Active, EventProgress::Published)
    )
}

/// Client lookups fail with the same opaque error whether the event is
/// missing or merely hidden.
pub fn ensure_client_visible(
    status: EventStatus,
    progress: EventProgress,
) -> Result<(), CoreError> {
    if is_client_visible(status, progress) {
        Ok(())
    } else {
        Err(CoreError::OccurredError)
    }
}
