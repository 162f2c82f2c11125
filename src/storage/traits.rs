//! Object store trait
//!
//! The narrow interface the cache and routes need from remote storage.

use async_trait::async_trait;

use crate::error::Result;

use super::types::{ListOptions, ObjectList, ObjectMetadata, StorageObject};

/// Read-only access to a bucket of objects
///
/// Implementations map a missing key to
/// [`StorageError::ObjectNotFound`](crate::error::StorageError::ObjectNotFound)
/// and every other failure to another storage error.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Metadata-only lookup (HEAD request)
    async fn head_object(&self, key: &str) -> Result<ObjectMetadata>;

    /// Whole-object download
    async fn get_object(&self, key: &str) -> Result<StorageObject>;

    /// List one page of objects
    async fn list_objects(&self, options: ListOptions) -> Result<ObjectList>;
}
