//! EPUB parsing module
//!
//! Opens EPUB containers and extracts the bibliographic record, the
//! edition's ISBN and the cover image.

mod cover;
mod isbn;
mod metadata;
mod parser;
mod types;

#[cfg(test)]
pub(crate) mod fixture;

pub use cover::{find_cover_item, resolve_cover};
pub use isbn::{extract_isbn, find_candidates, format_isbn, is_copyright_page, IsbnCandidate};
pub use metadata::extract_metadata;
pub use parser::{FormatError, ParsedDocument};
pub use types::{BookMetadata, CoverImage, ManifestItem, MetadataEntry, Namespace};
