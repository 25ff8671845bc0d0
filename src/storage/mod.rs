// storage/mod.rs
// Result store: tracked links and scheduler executions in SQLite

mod migrations;
mod models;
mod pool;
mod store;

// Re-export commonly used items
pub use migrations::run_migrations;
pub use models::{
    ExecutionStatus, PassSummary, TaskExecution, TrackedLink, TrackedLinkSummary, TrackedStatus,
};
pub use pool::init_db_pool_with_path;
pub use store::ResultStore;
