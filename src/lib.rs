//! Estante Server
//!
//! Serves bibliographic metadata and cover images for EPUB files kept in
//! an S3-compatible bucket. Books are cached locally and revalidated
//! against the bucket's entity tags on every request.
//!
//! # Modules
//!
//! - `epub`: container parsing, ISBN discovery and cover resolution
//! - `cache`: entity-tag validated local copies of remote objects
//! - `storage`: object store trait with S3 and in-memory backends
//! - `auth`: bearer token validation against GitHub
//! - `routes`: the HTTP API

pub mod auth;
pub mod cache;
pub mod config;
pub mod epub;
pub mod error;
pub mod library;
pub mod routes;
pub mod state;
pub mod storage;
