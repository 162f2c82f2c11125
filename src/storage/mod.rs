//! Storage module for S3-compatible backends
//!
//! Supports MinIO, Cloudflare R2, Backblaze B2, and AWS S3 through
//! [`S3Client`], plus an in-memory [`MemoryStore`] for tests.

mod memory;
mod s3_client;
mod traits;
mod types;

pub use memory::MemoryStore;
pub use s3_client::S3Client;
pub use traits::ObjectStore;
pub use types::*;
