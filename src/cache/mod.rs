//! On-disk cache of remote EPUB files

mod content;

pub use content::{CacheEntry, CacheLookup, ContentCache};
