// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Unknown posting status: {0}")]
    UnknownStatus(String),

    #[error("Unknown task kind: {0}")]
    UnknownTaskKind(String),
}
