// Network Probe Port
// Outbound reachability check used by the HealthMonitor.

use async_trait::async_trait;

/// Lightweight check against a known-good external endpoint
#[async_trait]
pub trait NetworkProbe: Send + Sync {
    /// `Ok(())` when the endpoint answered, otherwise a human-readable reason
    async fn check(&self) -> Result<(), String>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// Probe with a switchable outcome
    pub struct MockNetworkProbe {
        outcome: Mutex<Result<(), String>>,
    }

    impl MockNetworkProbe {
        pub fn reachable() -> Self {
            Self {
                outcome: Mutex::new(Ok(())),
            }
        }

        pub fn unreachable(reason: impl Into<String>) -> Self {
            Self {
                outcome: Mutex::new(Err(reason.into())),
            }
        }

        pub fn set_reachable(&self, reachable: bool) {
            *self.outcome.lock().unwrap() = if reachable {
                Ok(())
            } else {
                Err("network unreachable".to_string())
            };
        }
    }

    #[async_trait]
    impl NetworkProbe for MockNetworkProbe {
        async fn check(&self) -> Result<(), String> {
            self.outcome.lock().unwrap().clone()
        }
    }
}
