//! Port for cluster-wide mutual exclusion around an upstream fetch.
use std::time::Duration;

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors surfaced by lock strategies.
    pub enum LockError {
        /// Too few lock nodes answered to decide ownership.
        Unavailable { message: String } => "lock backend unavailable: {message}",
    }
}

/// Exclusive ownership of a resource until released or expired.
///
/// The handle is consumed by [`DistributedLock::release`], so a holder cannot
/// release twice through the same handle.
#[derive(Debug, PartialEq, Eq)]
pub struct LockHandle {
    resource: String,
    token: String,
    validity: Duration,
}

impl LockHandle {
    /// Build a handle.
    pub fn new(resource: impl Into<String>, token: impl Into<String>, validity: Duration) -> Self {
        Self {
            resource: resource.into(),
            token: token.into(),
            validity,
        }
    }

    /// Locked resource key.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Unique owner token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Time the holder may assume exclusivity, measured from acquisition.
    #[must_use]
    pub const fn validity(&self) -> Duration {
        self.validity
    }
}

/// Strategy for acquiring and releasing a named lock.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DistributedLock: Send + Sync {
    /// Try once to take `resource` for `ttl`.
    ///
    /// `Ok(None)` means another owner holds it.
    async fn try_acquire(
        &self,
        resource: &str,
        ttl: Duration,
    ) -> Result<Option<LockHandle>, LockError>;

    /// Release a handle. Releasing a lock that has since expired or been
    /// taken by someone else is a successful no-op.
    async fn release(&self, handle: LockHandle) -> Result<(), LockError>;
}
