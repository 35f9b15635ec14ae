// Scheduled Task Kinds

use serde::{Deserialize, Serialize};

/// The five independently scheduled task kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Scrape,
    Cleanup,
    StatusUpdate,
    HealthCheck,
    ErrorTrim,
}

impl TaskKind {
    pub const ALL: [TaskKind; 5] = [
        TaskKind::Scrape,
        TaskKind::Cleanup,
        TaskKind::StatusUpdate,
        TaskKind::HealthCheck,
        TaskKind::ErrorTrim,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Scrape => "scrape",
            TaskKind::Cleanup => "cleanup",
            TaskKind::StatusUpdate => "status_update",
            TaskKind::HealthCheck => "health_check",
            TaskKind::ErrorTrim => "error_trim",
        }
    }

}

impl std::str::FromStr for TaskKind {
    type Err = crate::domain::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| crate::domain::DomainError::UnknownTaskKind(s.to_string()))
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
