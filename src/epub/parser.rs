//! EPUB container parser
//!
//! Opens the zip archive, follows `META-INF/container.xml` to the package
//! document and reads its manifest and declarative metadata. Item content
//! stays in the archive until asked for.

use std::collections::HashMap;
use std::io::{Cursor, Read};

use parking_lot::Mutex;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace as XmlNamespace, ResolveResult};
use quick_xml::{NsReader, Reader};
use thiserror::Error;
use zip::result::ZipError;
use zip::ZipArchive;

use super::types::{ManifestItem, MetadataEntry, Namespace};

const CONTAINER_PATH: &str = "META-INF/container.xml";
const DC_NAMESPACE: &[u8] = b"http://purl.org/dc/elements/1.1/";
const OPF_NAMESPACE: &[u8] = b"http://www.idpf.org/2007/opf";

/// Largest archive entry that will be decompressed
pub const MAX_ENTRY_BYTES: u64 = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Failed to open archive: {0}")]
    Archive(#[from] ZipError),
    #[error("Missing {}", CONTAINER_PATH)]
    MissingContainer,
    #[error("Container declares no package document")]
    MissingRootfile,
    #[error("Package document not found: {0}")]
    MissingPackage(String),
    #[error("XML parse error in {path}: {message}")]
    Xml { path: String, message: String },
    #[error("{0} is not valid UTF-8")]
    Encoding(String),
    #[error("Manifest item not found in archive: {0}")]
    MissingItem(String),
    #[error("Archive entry {path} exceeds {limit} bytes")]
    EntryTooLarge { path: String, limit: u64 },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

type MetadataMap = HashMap<(Namespace, String), Vec<MetadataEntry>>;

/// An opened EPUB: manifest, metadata and the archive holding item content
pub struct ParsedDocument {
    archive: Mutex<ZipArchive<Cursor<Vec<u8>>>>,
    items: Vec<ManifestItem>,
    metadata: MetadataMap,
}

impl ParsedDocument {
    /// Parse an EPUB from raw bytes
    pub fn parse(bytes: Vec<u8>) -> Result<Self, FormatError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;

        let container = match read_entry(&mut archive, CONTAINER_PATH) {
            Ok(bytes) => decode(CONTAINER_PATH, bytes)?,
            Err(FormatError::MissingItem(_)) => return Err(FormatError::MissingContainer),
            Err(e) => return Err(e),
        };
        let package_path = find_rootfile(&container)?;

        let package = match read_entry(&mut archive, &package_path) {
            Ok(bytes) => decode(&package_path, bytes)?,
            Err(FormatError::MissingItem(path)) => return Err(FormatError::MissingPackage(path)),
            Err(e) => return Err(e),
        };

        let base_dir = package_path
            .rsplit_once('/')
            .map(|(dir, _)| dir.to_string())
            .unwrap_or_default();
        let (items, metadata) = parse_package(&package, &package_path, &base_dir)?;

        tracing::debug!(
            "Parsed package {} with {} manifest items",
            package_path,
            items.len()
        );

        Ok(Self {
            archive: Mutex::new(archive),
            items,
            metadata,
        })
    }

    /// Manifest items in declaration order
    pub fn items(&self) -> &[ManifestItem] {
        &self.items
    }

    pub fn item_by_id(&self, id: &str) -> Option<&ManifestItem> {
        self.items.iter().find(|item| item.id.as_deref() == Some(id))
    }

    pub fn item_by_name(&self, name: &str) -> Option<&ManifestItem> {
        self.items
            .iter()
            .find(|item| item.name.as_deref() == Some(name))
    }

    /// Read an item's bytes out of the archive
    pub fn read_item(&self, item: &ManifestItem) -> Result<Vec<u8>, FormatError> {
        let mut archive = self.archive.lock();
        read_entry(&mut archive, &item.path)
    }

    /// All declarations of `field` in document order
    pub fn metadata(&self, namespace: Namespace, field: &str) -> &[MetadataEntry] {
        self.metadata
            .get(&(namespace, field.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Value of the first declaration of `field`
    pub fn first_value(&self, namespace: Namespace, field: &str) -> Option<&str> {
        self.metadata(namespace, field)
            .first()
            .map(|entry| entry.value.as_str())
    }
}

fn read_entry(
    archive: &mut ZipArchive<Cursor<Vec<u8>>>,
    path: &str,
) -> Result<Vec<u8>, FormatError> {
    read_entry_limited(archive, path, MAX_ENTRY_BYTES)
}

/// Read an entry, failing once more than `limit` bytes come out of it
///
/// The size recorded in the archive is not trusted.
fn read_entry_limited(
    archive: &mut ZipArchive<Cursor<Vec<u8>>>,
    path: &str,
    limit: u64,
) -> Result<Vec<u8>, FormatError> {
    let mut file = match archive.by_name(path) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Err(FormatError::MissingItem(path.to_string())),
        Err(e) => return Err(e.into()),
    };

    let mut content = Vec::new();
    file.by_ref().take(limit + 1).read_to_end(&mut content)?;
    if content.len() as u64 > limit {
        return Err(FormatError::EntryTooLarge {
            path: path.to_string(),
            limit,
        });
    }
    Ok(content)
}

fn decode(path: &str, bytes: Vec<u8>) -> Result<String, FormatError> {
    let text = String::from_utf8(bytes).map_err(|_| FormatError::Encoding(path.to_string()))?;
    Ok(text.trim_start_matches('\u{feff}').to_string())
}

/// Locate the package document via the first `<rootfile full-path>`
fn find_rootfile(container: &str) -> Result<String, FormatError> {
    let mut reader = Reader::from_str(container);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"rootfile" => {
                let attributes = collect_attributes(&e, CONTAINER_PATH)?;
                if let Some(path) = attributes.get("full-path").filter(|p| !p.is_empty()) {
                    return Ok(path.trim_start_matches('/').to_string());
                }
            }
            Ok(Event::Eof) => return Err(FormatError::MissingRootfile),
            Err(e) => {
                return Err(FormatError::Xml {
                    path: CONTAINER_PATH.to_string(),
                    message: e.to_string(),
                })
            }
            _ => {}
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Other,
    Metadata,
    Manifest,
}

/// A metadata element whose text is still being collected
struct OpenEntry {
    key: (Namespace, String),
    entry: MetadataEntry,
    depth: usize,
}

fn classify(ns: &ResolveResult) -> Option<Namespace> {
    match ns {
        ResolveResult::Bound(XmlNamespace(uri)) => match *uri {
            DC_NAMESPACE => Some(Namespace::Dc),
            OPF_NAMESPACE => Some(Namespace::Opf),
            _ => None,
        },
        // Some packages omit the default OPF namespace
        ResolveResult::Unbound => Some(Namespace::Opf),
        ResolveResult::Unknown(_) => None,
    }
}

fn parse_package(
    xml: &str,
    path: &str,
    base_dir: &str,
) -> Result<(Vec<ManifestItem>, MetadataMap), FormatError> {
    let xml_error = |e: quick_xml::Error| FormatError::Xml {
        path: path.to_string(),
        message: e.to_string(),
    };

    let mut reader = NsReader::from_str(xml);
    reader.trim_text(true);

    let mut section = Section::Other;
    let mut items = Vec::new();
    let mut metadata: MetadataMap = HashMap::new();
    let mut open: Option<OpenEntry> = None;

    loop {
        let (ns, event) = reader.read_resolved_event().map_err(xml_error)?;
        let ns = classify(&ns);

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));

                if let Some(current) = open.as_mut() {
                    // Markup nested inside a metadata value
                    if !is_empty {
                        current.depth += 1;
                    }
                    continue;
                }

                let local = e.local_name();
                match (section, local.as_ref()) {
                    (_, b"metadata") if !is_empty => section = Section::Metadata,
                    (_, b"manifest") if !is_empty => section = Section::Manifest,
                    (Section::Manifest, b"item") => {
                        if let Some(item) = manifest_item(e, path, base_dir)? {
                            items.push(item);
                        }
                    }
                    (Section::Metadata, name) => {
                        if let Some(key) = metadata_key(ns, name, e, path)? {
                            let entry = MetadataEntry {
                                value: String::new(),
                                attributes: collect_attributes(e, path)?,
                            };
                            if is_empty {
                                metadata.entry(key).or_default().push(entry);
                            } else {
                                open = Some(OpenEntry {
                                    key,
                                    entry,
                                    depth: 0,
                                });
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(ref t) => {
                if let Some(current) = open.as_mut() {
                    let text = t
                        .unescape()
                        .map(|c| c.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(t).into_owned());
                    current.entry.value.push_str(&text);
                }
            }
            Event::CData(t) => {
                if let Some(current) = open.as_mut() {
                    current
                        .entry
                        .value
                        .push_str(&String::from_utf8_lossy(&t.into_inner()));
                }
            }
            Event::End(ref e) => {
                if let Some(mut current) = open.take() {
                    if current.depth > 0 {
                        current.depth -= 1;
                        open = Some(current);
                    } else {
                        current.entry.value = current.entry.value.trim().to_string();
                        metadata.entry(current.key).or_default().push(current.entry);
                    }
                    continue;
                }

                if matches!(e.local_name().as_ref(), b"metadata" | b"manifest") {
                    section = Section::Other;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok((items, metadata))
}

/// Decide which metadata field an element declares, if any
fn metadata_key(
    ns: Option<Namespace>,
    local: &[u8],
    e: &BytesStart,
    path: &str,
) -> Result<Option<(Namespace, String)>, FormatError> {
    let local = String::from_utf8_lossy(local).into_owned();

    match ns {
        Some(Namespace::Dc) => Ok(Some((Namespace::Dc, local))),
        Some(Namespace::Opf) if local == "meta" => {
            let attributes = collect_attributes(e, path)?;
            let field = attributes
                .get("name")
                .or_else(|| attributes.get("property"))
                .cloned();
            Ok(field.map(|f| (Namespace::Opf, f)))
        }
        _ => Ok(None),
    }
}

fn manifest_item(
    e: &BytesStart,
    path: &str,
    base_dir: &str,
) -> Result<Option<ManifestItem>, FormatError> {
    let mut attributes = collect_attributes(e, path)?;

    let Some(href) = attributes.remove("href") else {
        return Ok(None);
    };
    let href = urlencoding::decode(&href)
        .map(|h| h.into_owned())
        .unwrap_or(href);

    Ok(Some(ManifestItem {
        id: attributes.remove("id"),
        path: resolve_path(base_dir, &href),
        name: Some(href),
        media_type: attributes.remove("media-type").unwrap_or_default(),
        properties: attributes.remove("properties"),
    }))
}

/// Attributes keyed by local name; namespace declarations are skipped
fn collect_attributes(e: &BytesStart, path: &str) -> Result<HashMap<String, String>, FormatError> {
    let mut attributes = HashMap::new();

    for attr in e.attributes() {
        let attr = attr.map_err(|err| FormatError::Xml {
            path: path.to_string(),
            message: err.to_string(),
        })?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }

        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
        attributes.insert(key, value);
    }

    Ok(attributes)
}

/// Join an href onto the package directory, collapsing `.` and `..`
fn resolve_path(base_dir: &str, href: &str) -> String {
    let href = href.split('#').next().unwrap_or(href);

    let mut parts: Vec<&str> = if href.starts_with('/') {
        Vec::new()
    } else {
        base_dir.split('/').filter(|s| !s.is_empty()).collect()
    };

    for segment in href.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }

    parts.join("/")
}
