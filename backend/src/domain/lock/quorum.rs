//! Redlock-style lock across independent nodes.
//!
//! The lock is held when a majority of nodes accept the same token and the
//! remaining validity (TTL minus the time spent acquiring minus a clock drift
//! allowance) is still positive. A failed attempt releases whatever it took.
//! A quorum whose validity ran out while acquiring is reported as unavailable,
//! since no other process holds the lock.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use tokio::time::{Instant, timeout};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::ports::{DistributedLock, LockError, LockHandle, LockNode};

/// Fraction of the TTL reserved for clock drift between nodes.
pub const DEFAULT_DRIFT_FACTOR: f64 = 0.01;
/// Fixed drift allowance added to the proportional one.
pub const DRIFT_FLOOR: Duration = Duration::from_millis(2);
/// Default per-node call timeout.
pub const DEFAULT_NODE_TIMEOUT: Duration = Duration::from_millis(250);

/// Lock strategy backed by a quorum of nodes.
pub struct QuorumLock {
    nodes: Vec<Arc<dyn LockNode>>,
    node_timeout: Duration,
    drift_factor: f64,
}

impl QuorumLock {
    /// Build a quorum lock over `nodes`.
    pub fn new(nodes: Vec<Arc<dyn LockNode>>) -> Self {
        Self {
            nodes,
            node_timeout: DEFAULT_NODE_TIMEOUT,
            drift_factor: DEFAULT_DRIFT_FACTOR,
        }
    }

    /// Override the per-node timeout.
    #[must_use]
    pub const fn with_node_timeout(mut self, node_timeout: Duration) -> Self {
        self.node_timeout = node_timeout;
        self
    }

    /// Nodes that must agree.
    #[must_use]
    pub const fn quorum(&self) -> usize {
        self.nodes.len() / 2 + 1
    }

    fn drift(&self, ttl: Duration) -> Duration {
        ttl.mul_f64(self.drift_factor) + DRIFT_FLOOR
    }

    async fn release_all(&self, resource: &str, token: &str) -> usize {
        let releases = self.nodes.iter().map(|node| async move {
            timeout(self.node_timeout, node.release_if_owner(resource, token)).await
        });
        join_all(releases)
            .await
            .into_iter()
            .filter(|outcome| matches!(outcome, Ok(Ok(_))))
            .count()
    }
}

#[async_trait]
impl DistributedLock for QuorumLock {
    async fn try_acquire(
        &self,
        resource: &str,
        ttl: Duration,
    ) -> Result<Option<LockHandle>, LockError> {
        if self.nodes.is_empty() {
            return Err(LockError::unavailable("no lock nodes configured"));
        }
        let token = Uuid::new_v4().to_string();
        let started = Instant::now();

        let attempts = self.nodes.iter().map(|node| {
            let token = token.as_str();
            async move { timeout(self.node_timeout, node.set_if_absent(resource, token, ttl)).await }
        });
        let mut granted = 0_usize;
        let mut failed = 0_usize;
        for outcome in join_all(attempts).await {
            match outcome {
                Ok(Ok(true)) => granted += 1,
                Ok(Ok(false)) => {}
                Ok(Err(error)) => {
                    debug!(resource, %error, "lock node refused acquisition");
                    failed += 1;
                }
                Err(_) => {
                    debug!(resource, "lock node timed out during acquisition");
                    failed += 1;
                }
            }
        }

        let elapsed = started.elapsed();
        let validity = ttl.checked_sub(elapsed + self.drift(ttl));
        let quorum = self.quorum();
        if granted >= quorum {
            if let Some(validity) = validity.filter(|validity| !validity.is_zero()) {
                return Ok(Some(LockHandle::new(resource, token, validity)));
            }
        }

        self.release_all(resource, &token).await;
        if granted >= quorum {
            warn!(
                resource,
                elapsed_ms = elapsed.as_millis(),
                "lock validity expired while acquiring"
            );
            return Err(LockError::unavailable(
                "lock validity expired during acquisition",
            ));
        }
        if failed >= quorum {
            warn!(
                resource,
                failed,
                nodes = self.nodes.len(),
                "lock quorum unreachable"
            );
            return Err(LockError::unavailable(format!(
                "{failed} of {} lock nodes failed",
                self.nodes.len()
            )));
        }
        debug!(resource, granted, quorum, "lock quorum not reached");
        Ok(None)
    }

    async fn release(&self, handle: LockHandle) -> Result<(), LockError> {
        let released = self.release_all(handle.resource(), handle.token()).await;
        if released == 0 {
            return Err(LockError::unavailable("no lock node accepted the release"));
        }
        Ok(())
    }
}
