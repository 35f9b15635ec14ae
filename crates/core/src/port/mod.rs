// Port Layer - Interfaces for external dependencies

pub mod error_log;
pub mod id_provider; // For deterministic testing
pub mod network_probe;
pub mod posting_repository;
pub mod source;
pub mod time_provider;

// Re-exports
pub use error_log::{ErrorLog, ErrorLogEntry};
pub use id_provider::IdProvider;
pub use network_probe::NetworkProbe;
pub use posting_repository::{PostingChanges, PostingFilter, PostingRepository, StatusCounts};
pub use source::{FetchError, JobSource, ListingError, NormalizeContext};
pub use time_provider::TimeProvider;
