pub mod app_config;
pub mod catalog_repo;
pub mod database;
mod error;
pub mod flight_locks;
pub mod ledger_repo;
pub mod report_repo;
pub mod seed;
pub mod user_repo;

pub use catalog_repo::SqliteCatalog;
pub use database::DbClient;
pub use ledger_repo::SqliteLedger;
pub use report_repo::SqliteReports;
pub use user_repo::SqliteUsers;
