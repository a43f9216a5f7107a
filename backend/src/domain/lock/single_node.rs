//! Lock held on one node with `SET NX PX` semantics.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{DistributedLock, LockError, LockHandle, LockNode};

/// Lock strategy backed by a single node.
pub struct SingleNodeLock {
    node: Arc<dyn LockNode>,
}

impl SingleNodeLock {
    /// Wrap a node.
    pub fn new(node: Arc<dyn LockNode>) -> Self {
        Self { node }
    }
}

#[async_trait]
impl DistributedLock for SingleNodeLock {
    async fn try_acquire(
        &self,
        resource: &str,
        ttl: Duration,
    ) -> Result<Option<LockHandle>, LockError> {
        let token = Uuid::new_v4().to_string();
        let acquired = self
            .node
            .set_if_absent(resource, &token, ttl)
            .await
            .map_err(|error| LockError::unavailable(error.to_string()))?;
        Ok(acquired.then(|| LockHandle::new(resource, token, ttl)))
    }

    async fn release(&self, handle: LockHandle) -> Result<(), LockError> {
        let released = self
            .node
            .release_if_owner(handle.resource(), handle.token())
            .await
            .map_err(|error| LockError::unavailable(error.to_string()))?;
        if !released {
            debug!(
                resource = handle.resource(),
                "lock already expired or reassigned"
            );
        }
        Ok(())
    }
}
