//! Blob storage abstraction.
//!
//! Uploaded documents are written to a [`BlobStore`] before analysis. The
//! provider never receives the bytes directly; it is handed a
//! time-limited access URL instead.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// A stored object together with the content type it was uploaded with.
#[derive(Debug, Clone, PartialEq)]
pub struct BlobObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Object storage used by the orchestration service.
///
/// Names are `/`-separated relative paths, for example
/// `"<document_id>/invoice.pdf"`.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `name`, replacing any existing object, and
    /// return the object's URL.
    async fn upload(&self, name: &str, bytes: &[u8], content_type: &str) -> Result<String>;

    /// Return a URL granting read access to `name` for `ttl`.
    async fn temporary_access_url(&self, name: &str, ttl: Duration) -> Result<String>;

    async fn exists(&self, name: &str) -> Result<bool>;

    /// Remove `name`. Fails with `NotFound` when it does not exist.
    async fn delete(&self, name: &str) -> Result<()>;

    async fn read(&self, name: &str) -> Result<BlobObject>;

    /// Recover the blob name from a URL previously returned by
    /// [`upload`](Self::upload). Input that is not such a URL is returned
    /// unchanged.
    fn blob_name_for(&self, url: &str) -> String;
}
