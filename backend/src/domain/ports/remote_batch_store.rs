//! Port for the shared remote cache holding encoded place batches.
use std::time::Duration;

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors surfaced by the remote cache adapter.
    pub enum RemoteStoreError {
        /// Cache backend is unavailable or returned an error.
        Backend { message: String } => "remote cache backend failure: {message}",
        /// Cache call exceeded its timeout.
        Timeout { message: String } => "remote cache timeout: {message}",
    }
}

/// Key/value store shared between process instances.
///
/// Payloads are opaque strings; encoding is the caller's concern.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteBatchStore: Send + Sync {
    /// Read the payload stored under `key`.
    async fn load(&self, key: &str) -> Result<Option<String>, RemoteStoreError>;

    /// Store `payload` under `key` for `ttl`, replacing any previous value.
    async fn store(&self, key: &str, payload: &str, ttl: Duration)
    -> Result<(), RemoteStoreError>;
}
