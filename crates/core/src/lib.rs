//! Civic event domain logic.
//!
//! Pure rules with no database or HTTP dependencies:
//!
//! - [`event`] — lifecycle enums, writable attributes and their validation.
//! - [`relation_check`] — nested-payload ownership checks.
//! - [`time_window`] — map/listing visibility windows and proximity.
//! - [`permission`] — single-event access rules.
//! - [`filter`] — typed filter and sort expressions.
//! - [`chart`], [`points`], [`lifecycle`], [`assets`] — aggregation and
//!   collaborator contracts.

pub mod assets;
pub mod chart;
pub mod error;
pub mod event;
pub mod filter;
pub mod lifecycle;
pub mod permission;
pub mod points;
pub mod relation_check;
pub mod roles;
pub mod time_window;
pub mod types;
