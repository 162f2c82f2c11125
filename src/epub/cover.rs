//! Cover image resolution
//!
//! Tried in order: the package's cover declaration, an image whose id or
//! name mentions "cover", then any image whose name mentions "cover".

use super::parser::{FormatError, ParsedDocument};
use super::types::{CoverImage, ManifestItem, Namespace};

/// Find the cover image of a book
///
/// `Ok(None)` means the book has no recognisable cover.
pub fn resolve_cover(doc: &ParsedDocument) -> Result<Option<CoverImage>, FormatError> {
    let Some(item) = find_cover_item(doc) else {
        return Ok(None);
    };

    let data = doc.read_item(item)?;
    Ok(Some(CoverImage {
        data,
        media_type: item.media_type.clone(),
    }))
}

/// The manifest item holding the cover image, if any
pub fn find_cover_item(doc: &ParsedDocument) -> Option<&ManifestItem> {
    declared_cover(doc)
        .or_else(|| cover_by_identity(doc))
        .or_else(|| image_named_cover(doc))
}

/// The `<meta name="cover">` target, or an EPUB 3 `cover-image` item
fn declared_cover(doc: &ParsedDocument) -> Option<&ManifestItem> {
    let declared = doc.metadata(Namespace::Opf, "cover").first().and_then(|entry| {
        if !entry.value.is_empty() {
            Some(entry.value.as_str())
        } else {
            entry.attribute("content")
        }
    });

    if let Some(reference) = declared {
        let target = doc
            .item_by_id(reference)
            .or_else(|| doc.item_by_name(reference));
        match target {
            Some(item) if item.is_image() => return Some(item),
            _ => tracing::debug!("Cover declaration {} does not resolve to an image", reference),
        }
    }

    doc.items()
        .iter()
        .find(|item| item.has_property("cover-image") && item.is_image())
}

fn cover_by_identity(doc: &ParsedDocument) -> Option<&ManifestItem> {
    doc.items().iter().find(|item| {
        let id = item.id_lower();
        let name = item.name_lower();
        item.is_image() && (id.contains("cover") || name.contains("cover"))
    })
}

fn image_named_cover(doc: &ParsedDocument) -> Option<&ManifestItem> {
    doc.items()
        .iter()
        .filter(|item| item.is_image())
        .find(|item| item.name_lower().contains("cover"))
}
