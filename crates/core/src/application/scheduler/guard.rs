// Per-task-kind in-flight guard

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Atomic "in-flight" flag for one task kind
///
/// Process-local only. Exclusivity across replicas needs an external lock.
#[derive(Debug, Clone, Default)]
pub struct TaskGuard {
    running: Arc<AtomicBool>,
}

impl TaskGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the guard, or `None` if a run is already in flight
    pub fn try_acquire(&self) -> Option<TaskToken> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| TaskToken {
                running: Arc::clone(&self.running),
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Proof of a claimed guard; releases it on drop (including unwinding)
#[derive(Debug)]
pub struct TaskToken {
    running: Arc<AtomicBool>,
}

impl Drop for TaskToken {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_rejected_until_release() {
        let guard = TaskGuard::new();

        let token = guard.try_acquire();
        assert!(token.is_some());
        assert!(guard.is_running());
        assert!(guard.try_acquire().is_none());

        drop(token);
        assert!(!guard.is_running());
        assert!(guard.try_acquire().is_some());
    }

    #[test]
    fn test_token_released_on_panic() {
        let guard = TaskGuard::new();
        let cloned = guard.clone();

        let result = std::panic::catch_unwind(move || {
            let _token = cloned.try_acquire();
            panic!("boom");
        });

        assert!(result.is_err());
        assert!(!guard.is_running());
    }
}
