//! Application state management

use std::sync::Arc;

use crate::auth::IdentityValidator;
use crate::cache::ContentCache;
use crate::config::Config;
use crate::library::LibraryService;
use crate::storage::ObjectStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    library: LibraryService,
    validator: Arc<dyn IdentityValidator>,
}

impl AppState {
    /// Wire the cache and library around `store`
    pub fn new(
        config: &Config,
        store: Arc<dyn ObjectStore>,
        validator: Arc<dyn IdentityValidator>,
    ) -> Self {
        let cache = ContentCache::new(&config.cache.dir, store.clone(), config.storage.timeout());
        let library = LibraryService::new(store, cache, config.cache.parse_timeout());

        Self {
            inner: Arc::new(AppStateInner {
                library,
                validator,
            }),
        }
    }

    /// Get the library service
    pub fn library(&self) -> &LibraryService {
        &self.inner.library
    }

    /// Get the bearer token validator
    pub fn validator(&self) -> &dyn IdentityValidator {
        self.inner.validator.as_ref()
    }
}
