//! Bibliographic record assembly
//!
//! Maps Dublin Core declarations onto [`BookMetadata`] and fills in the
//! ISBN from the copyright pages, falling back to the declared identifiers.

use super::isbn::{extract_isbn, format_isbn};
use super::parser::ParsedDocument;
use super::types::{BookMetadata, MetadataEntry, Namespace};

/// Build the metadata record for an opened book
pub fn extract_metadata(doc: &ParsedDocument) -> BookMetadata {
    let first = |field: &str| doc.first_value(Namespace::Dc, field).map(str::to_string);
    let all = |field: &str| {
        doc.metadata(Namespace::Dc, field)
            .iter()
            .map(|entry| entry.value.clone())
            .collect::<Vec<_>>()
    };

    let mut metadata = BookMetadata {
        title: first("title"),
        authors: all("creator"),
        description: first("description"),
        language: first("language"),
        publisher: first("publisher"),
        date: first("date"),
        subjects: all("subject"),
        rights: first("rights"),
        ..Default::default()
    };

    for entry in doc.metadata(Namespace::Dc, "identifier") {
        let (scheme, value) = split_identifier(entry);
        metadata.identifiers.insert(scheme, value);
    }

    metadata.isbn = match extract_isbn(doc) {
        Some(isbn) => Some(format_isbn(&isbn)),
        None => metadata.identifiers.get("isbn").map(|isbn| format_isbn(isbn)),
    };

    metadata
}

/// Scheme and value of an identifier
///
/// The scheme comes from the `scheme` attribute, else from a
/// `urn:<scheme>:<value>` prefix, else is `unknown`.
fn split_identifier(entry: &MetadataEntry) -> (String, String) {
    if let Some(scheme) = entry.attribute("scheme").filter(|s| !s.is_empty()) {
        return (scheme.to_lowercase(), entry.value.clone());
    }

    if let Some(rest) = entry.value.strip_prefix("urn:") {
        if let Some((scheme, value)) = rest.split_once(':') {
            return (scheme.to_lowercase(), value.to_string());
        }
    }

    ("unknown".to_string(), entry.value.clone())
}
