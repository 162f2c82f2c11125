//! In-memory object store
//!
//! Backs tests and local development without an S3 endpoint. Every write
//! produces a fresh revision tag, and download counts are tracked so
//! callers can assert on transfer behaviour.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};

use crate::error::{Result, StorageError};

use super::traits::ObjectStore;
use super::types::{ListOptions, ObjectList, ObjectMetadata, StorageObject};

struct StoredObject {
    data: Vec<u8>,
    etag: String,
}

/// Object store kept in a sorted map
#[derive(Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
    revisions: AtomicU64,
    downloads: AtomicUsize,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with objects
    pub fn with_objects(
        objects: impl IntoIterator<Item = (impl Into<String>, impl Into<Vec<u8>>)>,
    ) -> Self {
        let store = Self::new();
        for (key, data) in objects {
            store.put(key, data);
        }
        store
    }

    /// Insert or replace an object, returning its new revision tag
    pub fn put(&self, key: impl Into<String>, data: impl Into<Vec<u8>>) -> String {
        let data = data.into();
        let key = key.into();

        // Tags change on every write, even when the bytes do not
        let revision = self.revisions.fetch_add(1, Ordering::SeqCst) + 1;
        let digest = Sha256::digest(&data);
        let etag = format!("{}-{}", hex::encode(&digest[..8]), revision);

        self.objects.write().insert(
            key,
            StoredObject {
                data,
                etag: etag.clone(),
            },
        );
        etag
    }

    pub fn remove(&self, key: &str) {
        self.objects.write().remove(key);
    }

    /// Number of whole-object downloads served so far
    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    /// Make every call fail as if the remote were unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::ConnectionFailed("memory store unavailable".to_string()).into());
        }
        Ok(())
    }

    fn metadata(key: &str, object: &StoredObject) -> ObjectMetadata {
        ObjectMetadata {
            key: key.to_string(),
            size: object.data.len() as i64,
            last_modified: None,
            content_type: None,
            etag: Some(object.etag.clone()),
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn head_object(&self, key: &str) -> Result<ObjectMetadata> {
        self.check_available()?;
        let objects = self.objects.read();
        let object = objects
            .get(key)
            .ok_or_else(|| StorageError::ObjectNotFound(key.to_string()))?;
        Ok(Self::metadata(key, object))
    }

    async fn get_object(&self, key: &str) -> Result<StorageObject> {
        self.check_available()?;
        let objects = self.objects.read();
        let object = objects
            .get(key)
            .ok_or_else(|| StorageError::ObjectNotFound(key.to_string()))?;
        self.downloads.fetch_add(1, Ordering::SeqCst);
        Ok(StorageObject {
            metadata: Self::metadata(key, object),
            data: object.data.clone(),
        })
    }

    async fn list_objects(&self, options: ListOptions) -> Result<ObjectList> {
        self.check_available()?;
        let objects = self.objects.read();
        let limit = options.max_keys.map(|m| m.max(0) as usize).unwrap_or(1000);

        let matching: Vec<ObjectMetadata> = objects
            .iter()
            .filter(|(key, _)| {
                options
                    .prefix
                    .as_deref()
                    .map(|p| key.starts_with(p))
                    .unwrap_or(true)
            })
            .map(|(key, object)| Self::metadata(key, object))
            .collect();

        let is_truncated = matching.len() > limit;
        Ok(ObjectList {
            objects: matching.into_iter().take(limit).collect(),
            is_truncated,
        })
    }
}
