//! ISBN discovery in copyright pages
//!
//! Publishers rarely put the ebook ISBN in the package metadata, but the
//! copyright page almost always lists it, often next to the print ISBNs.
//! Candidates followed by an ebook marker on the same line win.

use std::sync::OnceLock;

use regex::Regex;

use super::parser::ParsedDocument;
use super::types::ManifestItem;

const COPYRIGHT_KEYWORDS: [&str; 5] = ["copyright", "colophon", "imprint", "legal", "rights"];
/// The copyright sign, literal or as an entity (matched lower-cased)
const COPYRIGHT_GLYPHS: [&str; 4] = ["©", "&copy;", "&#169;", "&#xa9;"];
const EBOOK_KEYWORDS: [&str; 5] = ["ebook", "e-book", "epub", "digital", "electronic"];

/// Characters of trailing context inspected for an ebook marker
const TRAILING_CONTEXT: usize = 50;

fn isbn_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(concat!(
            r"(?i)(?:ISBN[-:\s]*)?",
            r"(97[89](?:[-\s]?[0-9]){10}",
            r"|(?:[0-9][-\s]?){9}[0-9X])",
        ))
        .expect("ISBN pattern is valid")
    })
}

/// An ISBN found in content, with whether it was labelled as the ebook edition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsbnCandidate {
    pub isbn: String,
    pub ebook: bool,
}

/// Find the most likely ISBN of this edition in the book's copyright pages
///
/// Returns the bare digits (an ISBN-10 may end in `X`).
pub fn extract_isbn(doc: &ParsedDocument) -> Option<String> {
    let mut candidates = Vec::new();

    for item in doc.items().iter().filter(|item| item.is_html()) {
        let content = match doc.read_item(item) {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => {
                    tracing::debug!("Skipping non UTF-8 item {}", item.path());
                    continue;
                }
            },
            Err(e) => {
                tracing::debug!("Skipping unreadable item {}: {}", item.path(), e);
                continue;
            }
        };

        if is_copyright_page(item, &content) {
            candidates.extend(find_candidates(&content));
        }
    }

    select(candidates)
}

/// Whether an item looks like a copyright or legal page
pub fn is_copyright_page(item: &ManifestItem, content: &str) -> bool {
    let id = item.id_lower();
    let name = item.name_lower();
    let by_identity = COPYRIGHT_KEYWORDS
        .iter()
        .any(|kw| id.contains(kw) || name.contains(kw));

    let lower = content.to_lowercase();
    by_identity
        || lower.contains("copyright")
        || COPYRIGHT_GLYPHS.iter().any(|glyph| lower.contains(glyph))
}

/// All ISBN-like strings in `content`, in order of appearance
pub fn find_candidates(content: &str) -> Vec<IsbnCandidate> {
    isbn_pattern()
        .captures_iter(content)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let digits = caps.get(1)?;

            let isbn = strip_separators(digits.as_str()).to_uppercase();
            let trailing = trailing_context(&content[whole.end()..]).to_lowercase();
            let ebook = EBOOK_KEYWORDS.iter().any(|kw| trailing.contains(kw));

            Some(IsbnCandidate { isbn, ebook })
        })
        .collect()
}

/// First ebook-labelled candidate, else the first candidate
fn select(candidates: Vec<IsbnCandidate>) -> Option<String> {
    candidates
        .iter()
        .find(|c| c.ebook)
        .or_else(|| candidates.first())
        .map(|c| c.isbn.clone())
}

/// Text following a match, up to the end of its line or the next tag
fn trailing_context(after: &str) -> &str {
    let end = after
        .char_indices()
        .take(TRAILING_CONTEXT)
        .find(|(_, c)| matches!(c, '\n' | '\r' | '<'))
        .map(|(i, _)| i)
        .unwrap_or_else(|| {
            after
                .char_indices()
                .nth(TRAILING_CONTEXT)
                .map(|(i, _)| i)
                .unwrap_or(after.len())
        });
    &after[..end]
}

fn strip_separators(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .collect()
}

/// Hyphenate an ISBN for display
///
/// ISBN-13 is grouped 3-1-4-4-1 and ISBN-10 1-4-4-1. Any other length is
/// returned without separators but otherwise unchanged.
pub fn format_isbn(raw: &str) -> String {
    let isbn = strip_separators(raw);
    if !isbn.is_ascii() {
        return isbn;
    }

    match isbn.len() {
        13 => format!(
            "{}-{}-{}-{}-{}",
            &isbn[..3],
            &isbn[3..4],
            &isbn[4..8],
            &isbn[8..12],
            &isbn[12..]
        ),
        10 => format!(
            "{}-{}-{}-{}",
            &isbn[..1],
            &isbn[1..5],
            &isbn[5..9],
            &isbn[9..]
        ),
        _ => isbn,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epub::fixture::EpubBuilder;

    fn parse(builder: EpubBuilder) -> ParsedDocument {
        ParsedDocument::parse(builder.build()).unwrap()
    }

    #[test]
    fn test_format_isbn13() {
        for raw in ["9780123456789", "9791234567896"] {
            let formatted = format_isbn(raw);
            assert_eq!(formatted.len(), 17);
            let groups: Vec<usize> = formatted.split('-').map(str::len).collect();
            assert_eq!(groups, vec![3, 1, 4, 4, 1]);
            assert_eq!(formatted.replace('-', ""), raw);
        }
        assert_eq!(format_isbn("978-0-123456-78-9"), "978-0-1234-5678-9");
    }

    #[test]
    fn test_format_isbn10() {
        assert_eq!(format_isbn("0123456789"), "0-1234-5678-9");
        assert_eq!(format_isbn("012345678X"), "0-1234-5678-X");
        assert_eq!(format_isbn("0 1234 5678 9"), "0-1234-5678-9");
    }

    #[test]
    fn test_format_other_lengths_unchanged() {
        assert_eq!(format_isbn("12345"), "12345");
        assert_eq!(format_isbn(""), "");
        assert_eq!(format_isbn("B00ABCDEFGH1"), "B00ABCDEFGH1");
    }

    #[test]
    fn test_find_candidates_trailing_context() {
        let content = "<p>ISBN 978-0-00-000000-2 (hardcover)</p>\n<p>ISBN: 978 1 11 111111 1 (ebook)</p>";
        let found = find_candidates(content);
        assert_eq!(
            found,
            vec![
                IsbnCandidate {
                    isbn: "9780000000002".to_string(),
                    ebook: false
                },
                IsbnCandidate {
                    isbn: "9781111111111".to_string(),
                    ebook: true
                },
            ]
        );
    }

    #[test]
    fn test_marker_after_tag_is_ignored() {
        let found = find_candidates("ISBN 9780000000002<br/>ebook edition");
        assert_eq!(found.len(), 1);
        assert!(!found[0].ebook);
    }

    #[test]
    fn test_marker_beyond_fifty_characters_is_ignored() {
        let padding = " ".repeat(60);
        let found = find_candidates(&format!("ISBN 9780000000002{}digital", padding));
        assert!(!found[0].ebook);

        let found = find_candidates("ISBN 9780000000002 (Digital edition)");
        assert!(found[0].ebook);
    }

    #[test]
    fn test_isbn10_with_lowercase_check_digit() {
        let found = find_candidates("ISBN 0-306-40615-x e-book");
        assert_eq!(found[0].isbn, "030640615X");
        assert!(found[0].ebook);
    }

    #[test]
    fn test_prefers_ebook_isbn_from_copyright_page() {
        let doc = parse(
            EpubBuilder::new()
                .item(
                    "chapter1",
                    "chapter1.xhtml",
                    "application/xhtml+xml",
                    "<p>Order number 9789999999991 appears here.</p>",
                )
                .item(
                    "copyright",
                    "copyright.xhtml",
                    "application/xhtml+xml",
                    "<p>ISBN: 978-0-123456-78-9 (ebook)</p>",
                ),
        );

        assert_eq!(extract_isbn(&doc), Some("9780123456789".to_string()));
    }

    #[test]
    fn test_first_candidate_without_ebook_marker() {
        let doc = parse(EpubBuilder::new().item(
            "legal",
            "legal.xhtml",
            "application/xhtml+xml",
            "<p>ISBN 9780000000002 (hardcover)</p><p>ISBN 9781111111111 (paperback)</p>",
        ));

        assert_eq!(extract_isbn(&doc), Some("9780000000002".to_string()));
    }

    #[test]
    fn test_copyright_detected_by_content() {
        let doc = parse(
            EpubBuilder::new()
                .item(
                    "p001",
                    "p001.xhtml",
                    "application/xhtml+xml",
                    "<p>© 2020 Someone</p><p>ISBN 9780000000002</p>",
                )
                .item(
                    "p002",
                    "p002.xhtml",
                    "text/html",
                    "<p>COPYRIGHT notice</p><p>ISBN 9781111111111 electronic</p>",
                ),
        );

        assert_eq!(extract_isbn(&doc), Some("9781111111111".to_string()));
    }

    #[test]
    fn test_copyright_sign_entities() {
        let item = ManifestItem {
            id: Some("p010".to_string()),
            name: Some("p010.xhtml".to_string()),
            media_type: "application/xhtml+xml".to_string(),
            properties: None,
            path: "OEBPS/p010.xhtml".to_string(),
        };

        for content in ["<p>&copy; 2020</p>", "<p>&#169; 2020</p>", "<p>&#xA9; 2020</p>", "<p>&#xa9; 2020</p>"] {
            assert!(is_copyright_page(&item, content), "{}", content);
        }
        assert!(!is_copyright_page(&item, "<p>&#170; 2020</p>"));
    }

    #[test]
    fn test_no_copyright_pages() {
        let doc = parse(
            EpubBuilder::new()
                .item(
                    "chapter1",
                    "chapter1.xhtml",
                    "application/xhtml+xml",
                    "<p>ISBN 978-0-123456-78-9 (ebook)</p>",
                )
                .item("notes", "notes.txt", "text/plain", "copyright ISBN 9780000000002"),
        );

        assert_eq!(extract_isbn(&doc), None);
    }

    #[test]
    fn test_undecodable_item_is_skipped() {
        let doc = parse(
            EpubBuilder::new()
                .item(
                    "copyright-bad",
                    "bad.xhtml",
                    "application/xhtml+xml",
                    vec![0xff, 0xfe, 0x00, 0x39],
                )
                .declare_only("copyright-missing", "missing.xhtml", "application/xhtml+xml")
                .item(
                    "imprint",
                    "imprint.xhtml",
                    "application/xhtml+xml",
                    "<p>ISBN 0-306-40615-2</p>",
                ),
        );

        assert_eq!(extract_isbn(&doc), Some("0306406152".to_string()));
    }
}
