// jobsync Infrastructure - SQLite Adapter
// Implements: PostingRepository, ErrorLog

mod connection;
mod error;
mod error_log;
mod migration;
mod posting_repository;

pub use connection::create_pool;
pub use error_log::SqliteErrorLog;
pub use migration::run_migrations;
pub use posting_repository::SqlitePostingRepository;
