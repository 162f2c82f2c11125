//! Local EPUB cache validated by remote revision tags
//!
//! Each remote key owns a slot directory named by the SHA-256 of the key:
//!
//! ```text
//! <root>/<sha256(key)>/etag                 current revision tag
//! <root>/<sha256(key)>/<sha256(etag)>.epub  content of that revision
//! ```
//!
//! Revision files are written once and never modified, and the tag file is
//! published only after its content file exists. Both are renamed into place
//! from a temporary file, so readers never observe partial writes. Once a
//! new tag is published the older revision files of the slot are removed.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use crate::error::{AppError, Result};
use crate::storage::ObjectStore;

const ETAG_FILE: &str = "etag";

/// A cached copy of a remote object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: String,
    pub path: PathBuf,
    pub etag: String,
}

/// Result of bringing a key up to date
#[derive(Debug, Clone)]
pub struct CacheLookup {
    pub entry: CacheEntry,
    /// Whether the content was downloaded by this call
    pub refetched: bool,
}

/// Content-addressed file cache in front of an [`ObjectStore`]
#[derive(Clone)]
pub struct ContentCache {
    inner: Arc<ContentCacheInner>,
}

struct ContentCacheInner {
    root: PathBuf,
    store: Arc<dyn ObjectStore>,
    timeout: Duration,
}

impl ContentCache {
    /// Create a cache rooted at `root`; the directory is created lazily
    pub fn new(root: impl Into<PathBuf>, store: Arc<dyn ObjectStore>, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(ContentCacheInner {
                root: root.into(),
                store,
                timeout,
            }),
        }
    }

    /// Slot directory for a remote key
    pub fn slot_dir(&self, key: &str) -> PathBuf {
        self.inner.root.join(digest_hex(key.as_bytes()))
    }

    /// Make sure the local copy of `key` matches the remote revision
    ///
    /// Fails with a not-found storage error when the object does not exist;
    /// any other storage error is passed through.
    pub async fn ensure_current(&self, key: &str) -> Result<CacheLookup> {
        let slot = self.slot_dir(key);

        let head = self
            .with_timeout("head", key, self.inner.store.head_object(key))
            .await?;

        if let Some(etag) = head.etag.as_deref() {
            if let Some(path) = current_revision(&slot, etag).await {
                tracing::debug!("Cache hit for {} (etag {})", key, etag);
                return Ok(CacheLookup {
                    entry: CacheEntry {
                        key: key.to_string(),
                        path,
                        etag: etag.to_string(),
                    },
                    refetched: false,
                });
            }
        }

        tracing::info!("Fetching {} into cache", key);

        // The download runs detached so an aborted request still fills the cache
        let cache = self.clone();
        let owned_key = key.to_string();
        let head_etag = head.etag;
        let fetch = tokio::spawn(async move { cache.fetch(&owned_key, head_etag).await });

        let entry = match tokio::time::timeout(self.inner.timeout, fetch).await {
            Ok(Ok(result)) => result?,
            Ok(Err(e)) => return Err(AppError::Internal(format!("Cache fetch task failed: {}", e))),
            Err(_) => {
                return Err(AppError::Timeout(format!(
                    "fetching {} took longer than {:?}",
                    key, self.inner.timeout
                )))
            }
        };

        Ok(CacheLookup {
            entry,
            refetched: true,
        })
    }

    /// Download `key` and publish it into its slot
    async fn fetch(&self, key: &str, head_etag: Option<String>) -> Result<CacheEntry> {
        let object = self.inner.store.get_object(key).await?;
        let etag = object.metadata.etag.or(head_etag);
        let slot = self.slot_dir(key);

        let Some(etag) = etag else {
            // Untagged objects cannot be validated later, so keep them out of the slot's index
            tracing::warn!("Object {} has no revision tag; it will be refetched every time", key);
            let path = slot.join("untagged.epub");
            let data = object.data;
            let target = path.clone();
            run_blocking(move || publish(&target, &data)).await?;
            return Ok(CacheEntry {
                key: key.to_string(),
                path,
                etag: String::new(),
            });
        };

        let path = revision_path(&slot, &etag);
        let data = object.data;
        let (content_target, etag_target, tag) = (path.clone(), slot.join(ETAG_FILE), etag.clone());
        run_blocking(move || {
            publish(&content_target, &data)?;
            publish(&etag_target, tag.as_bytes())?;
            prune_revisions(&content_target)
        })
        .await?;

        tracing::debug!("Cached {} at {} (etag {})", key, path.display(), etag);

        Ok(CacheEntry {
            key: key.to_string(),
            path,
            etag,
        })
    }

    async fn with_timeout<T>(
        &self,
        operation: &str,
        key: &str,
        future: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::time::timeout(self.inner.timeout, future)
            .await
            .map_err(|_| {
                AppError::Timeout(format!(
                    "{} {} took longer than {:?}",
                    operation, key, self.inner.timeout
                ))
            })?
    }
}

fn digest_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn revision_path(slot: &Path, etag: &str) -> PathBuf {
    slot.join(format!("{}.epub", digest_hex(etag.as_bytes())))
}

/// Path of the cached content when the slot's tag equals `etag`
async fn current_revision(slot: &Path, etag: &str) -> Option<PathBuf> {
    let stored = tokio::fs::read_to_string(slot.join(ETAG_FILE)).await.ok()?;
    if stored.trim() != etag {
        return None;
    }

    let path = revision_path(slot, etag);
    match tokio::fs::try_exists(&path).await {
        Ok(true) => Some(path),
        _ => None,
    }
}

/// Atomically replace `path` with `data`
fn publish(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no parent"))?;
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Remove every revision file in the slot other than `keep`
fn prune_revisions(keep: &Path) -> std::io::Result<()> {
    let Some(slot) = keep.parent() else {
        return Ok(());
    };

    for entry in std::fs::read_dir(slot)? {
        let path = entry?.path();
        if path == keep || path.extension().and_then(|e| e.to_str()) != Some("epub") {
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => tracing::debug!("Removed stale revision {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

async fn run_blocking<F>(f: F) -> Result<()>
where
    F: FnOnce() -> std::io::Result<()> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("Cache write task failed: {}", e)))?
        .map_err(AppError::from)
}
