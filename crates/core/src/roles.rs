//! Well-known role and permission code constants.
//!
//! Role names must match the `role` claim issued by the identity service.
//! Permission codes narrow what an `admin` may touch.

pub const ROLE_SYSTEM_ADMIN: &str = "system_admin";
pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

/// Event administrator bound to a single active area.
pub const PERMISSION_ADMIN_EVENT: &str = "AD_EVT";

/// Delegated support administrator for events, bound to a single active area.
pub const PERMISSION_ADMIN_DELEGATE_SUPPORT_EVENT: &str = "AD_DLC_SPT_EVT";

/// Permission codes whose holders may only access events in their own area.
pub const AREA_RESTRICTED_EVENT_PERMISSIONS: &[&str] =
    &[PERMISSION_ADMIN_EVENT, PERMISSION_ADMIN_DELEGATE_SUPPORT_EVENT];

/// Whether the role may use the administrative event endpoints.
pub fn is_admin_role(role: &str) -> bool {
    role == ROLE_ADMIN || role == ROLE_SYSTEM_ADMIN
}
