//! Library access
//!
//! Ties the content cache to the EPUB extractors.

mod service;

pub use service::LibraryService;
