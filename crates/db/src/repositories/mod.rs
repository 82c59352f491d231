pub mod chart_repo;
pub mod dashboard_repo;
pub mod event_repo;
pub mod point_job_repo;
pub mod relation_repo;
pub mod tag_repo;
pub mod transaction_repo;

pub use chart_repo::{ChartRepo, ChartSource};
pub use dashboard_repo::DashboardEventRepo;
pub use event_repo::EventRepo;
pub use point_job_repo::{PgPointAwardQueue, PointAwardJobRepo};
pub use relation_repo::EventRelationRepo;
pub use tag_repo::TagRepo;
pub use transaction_repo::{PgTransactionRecorder, TransactionRepo};
