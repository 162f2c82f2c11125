//! Per-request metadata and cover extraction
//!
//! Every call brings the local copy of the book up to date, then opens it
//! on the blocking pool. Parsed documents are never kept between calls.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::ContentCache;
use crate::epub::{extract_metadata, resolve_cover, BookMetadata, CoverImage, ParsedDocument};
use crate::error::{AppError, Result};
use crate::storage::{ListOptions, ObjectStore};

/// Largest page the object listing will return
pub const MAX_LIST_LIMIT: usize = 1000;

/// Serves book records out of the content cache
#[derive(Clone)]
pub struct LibraryService {
    store: Arc<dyn ObjectStore>,
    cache: ContentCache,
    parse_timeout: Duration,
}

impl LibraryService {
    pub fn new(store: Arc<dyn ObjectStore>, cache: ContentCache, parse_timeout: Duration) -> Self {
        Self {
            store,
            cache,
            parse_timeout,
        }
    }

    /// Keys of up to `limit` objects in the bucket
    pub async fn list(&self, limit: usize) -> Result<Vec<String>> {
        let limit = limit.min(MAX_LIST_LIMIT);
        let listing = self
            .store
            .list_objects(ListOptions::new().with_max_keys(limit as i32))
            .await?;

        Ok(listing
            .objects
            .into_iter()
            .take(limit)
            .map(|object| object.key)
            .collect())
    }

    /// Bibliographic record of the book stored under `key`
    pub async fn metadata(&self, key: &str) -> Result<BookMetadata> {
        let metadata = self
            .with_document(key, |doc| Ok(extract_metadata(&doc)))
            .await?;

        tracing::info!(
            "Extracted metadata for {} (title: {:?}, isbn: {:?})",
            key,
            metadata.title,
            metadata.isbn
        );
        Ok(metadata)
    }

    /// Cover image of the book stored under `key`, if it has one
    pub async fn cover(&self, key: &str) -> Result<Option<CoverImage>> {
        let cover = self
            .with_document(key, |doc| resolve_cover(&doc).map_err(AppError::from))
            .await?;

        match &cover {
            Some(image) => tracing::debug!("Resolved cover for {} ({})", key, image.media_type),
            None => tracing::debug!("No cover found for {}", key),
        }
        Ok(cover)
    }

    /// Bytes of the current revision of `key`
    ///
    /// A newer revision may prune the file between lookup and read; the
    /// lookup is then repeated once.
    async fn read_current(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.cache.ensure_current(key).await?.entry.path;
        match tokio::fs::read(&path).await {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Revision {} was replaced while reading", path.display());
                let path = self.cache.ensure_current(key).await?.entry.path;
                Ok(tokio::fs::read(&path).await?)
            }
            result => Ok(result?),
        }
    }

    /// Open the current copy of `key` and run `extract` on it
    async fn with_document<T, F>(&self, key: &str, extract: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(ParsedDocument) -> Result<T> + Send + 'static,
    {
        let bytes = self.read_current(key).await?;

        let task = tokio::task::spawn_blocking(move || {
            let doc = ParsedDocument::parse(bytes)?;
            extract(doc)
        });

        match tokio::time::timeout(self.parse_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(AppError::Internal(format!("Extraction task failed: {}", e))),
            Err(_) => Err(AppError::Timeout(format!(
                "extracting {} took longer than {:?}",
                key, self.parse_timeout
            ))),
        }
    }
}
