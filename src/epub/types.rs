//! EPUB types
//!
//! Data structures for parsed EPUB packages and the metadata record
//! returned by the API.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Metadata vocabularies found in a package document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Dublin Core elements (`dc:title`, `dc:creator`, ...)
    Dc,
    /// Package-level `<meta>` declarations, keyed by `name` or `property`
    Opf,
}

/// One declarative metadata value with its attributes
///
/// Attribute keys are stored by local name, so `opf:scheme` becomes `scheme`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataEntry {
    pub value: String,
    pub attributes: HashMap<String, String>,
}

impl MetadataEntry {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// Manifest item from the package document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    pub id: Option<String>,
    /// Href as declared in the manifest, percent-decoded
    pub name: Option<String>,
    pub media_type: String,
    pub properties: Option<String>,
    /// Location of the item inside the archive
    pub(crate) path: String,
}

impl ManifestItem {
    /// Archive path the item's content is read from
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }

    /// XHTML or HTML content documents
    pub fn is_html(&self) -> bool {
        matches!(
            self.media_type.as_str(),
            "application/xhtml+xml" | "text/html"
        )
    }

    pub fn has_property(&self, property: &str) -> bool {
        self.properties
            .as_deref()
            .map(|props| props.split_whitespace().any(|p| p == property))
            .unwrap_or(false)
    }

    /// Lower-cased id, empty when absent
    pub(crate) fn id_lower(&self) -> String {
        self.id.as_deref().unwrap_or_default().to_lowercase()
    }

    /// Lower-cased name, empty when absent
    pub(crate) fn name_lower(&self) -> String {
        self.name.as_deref().unwrap_or_default().to_lowercase()
    }
}

/// Normalized bibliographic record for one book
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookMetadata {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    pub publisher: Option<String>,
    pub date: Option<String>,
    /// Scheme (lower-cased) to value; later declarations win
    pub identifiers: BTreeMap<String, String>,
    pub subjects: Vec<String>,
    pub rights: Option<String>,
    /// Hyphenated ISBN-13 or ISBN-10; omitted from JSON when unknown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
}

/// Cover image bytes and their media type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverImage {
    pub data: Vec<u8>,
    pub media_type: String,
}
