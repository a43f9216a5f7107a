//! Port for one independent node able to hold expiring ownership keys.
//!
//! Lock strategies in `domain::lock` are built on top of this primitive: a
//! single-node lock talks to one node, a quorum lock to several.
use std::time::Duration;

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors surfaced by a lock node.
    pub enum LockNodeError {
        /// The node could not be reached or rejected the command.
        Unavailable { message: String } => "lock node unavailable: {message}",
        /// The node did not answer in time.
        Timeout { message: String } => "lock node timeout: {message}",
    }
}

/// Atomic set-if-absent and compare-and-delete on a single node.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LockNode: Send + Sync {
    /// Set `resource` to `token` with expiry `ttl` unless it already exists.
    /// Returns `true` when this call created the key.
    async fn set_if_absent(
        &self,
        resource: &str,
        token: &str,
        ttl: Duration,
    ) -> Result<bool, LockNodeError>;

    /// Delete `resource` only if it still holds `token`. Returns `true` when
    /// a key was deleted.
    async fn release_if_owner(&self, resource: &str, token: &str) -> Result<bool, LockNodeError>;
}
