// Domain Layer - Pure business logic and entities

pub mod error;
pub mod listing;
pub mod posting;
pub mod run;
pub mod task;

// Re-exports
pub use error::DomainError;
pub use listing::{FieldValue, RawListing};
pub use posting::{EmploymentType, JobPosting, PostingId, PostingStatus, MS_PER_DAY};
pub use run::{RunResult, SourceFailure, SourceStats};
pub use task::TaskKind;
