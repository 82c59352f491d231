pub mod aggregate;
pub mod event;
pub mod point_job;
pub mod relation;
pub mod tag;
pub mod transaction;
