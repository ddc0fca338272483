use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;

/// One-way liveness flag of a connection.
///
/// Starts healthy and flips to unhealthy exactly once, on the first
/// unrecoverable transport or framing failure; it is never reset. Cheap to
/// clone; all clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct Health(Arc<HealthState>);

#[derive(Debug, Default)]
struct HealthState {
    flipped: AtomicBool,
    token: CancellationToken,
}

impl Health {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_healthy(&self) -> bool {
        !self.0.token.is_cancelled()
    }

    /// Flips the flag to unhealthy. Returns true only for the caller that
    /// performed the transition, so first-failure cleanup runs once.
    pub(crate) fn fail(&self) -> bool {
        let first = self
            .0
            .flipped
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        self.0.token.cancel();
        first
    }

    /// Resolves when the connection becomes unhealthy. Resolves immediately
    /// if it already is.
    pub async fn unhealthy(&self) {
        self.0.token.cancelled().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_flips_once() {
        let health = Health::new();
        assert!(health.is_healthy());

        let observer = health.clone();
        let handle = tokio::spawn(async move {
            observer.unhealthy().await;
            observer.is_healthy()
        });

        assert!(health.fail());
        assert!(!health.fail());
        assert!(!health.is_healthy());
        assert!(!handle.await.unwrap());

        // still unhealthy, immediately
        health.unhealthy().await;
        assert!(!health.is_healthy());
    }
}
