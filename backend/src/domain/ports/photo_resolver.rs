//! Port for turning a media file reference into a thumbnail URL.
use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors surfaced while resolving photos.
    pub enum PhotoResolverError {
        /// Network transport failed.
        Transport { message: String } => "photo lookup transport failed: {message}",
        /// The lookup response could not be decoded.
        Decode { message: String } => "photo lookup decode failed: {message}",
    }
}

/// Resolves a Wikimedia Commons file reference such as `File:Fuji.jpg`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PhotoResolver: Send + Sync {
    /// Thumbnail URL for `file_reference`, or `None` when the file is unknown.
    async fn thumbnail_url(&self, file_reference: &str)
    -> Result<Option<String>, PhotoResolverError>;
}

/// Resolver that never finds a photo; used when lookups are disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledPhotoResolver;

#[async_trait]
impl PhotoResolver for DisabledPhotoResolver {
    async fn thumbnail_url(
        &self,
        _file_reference: &str,
    ) -> Result<Option<String>, PhotoResolverError> {
        Ok(None)
    }
}
