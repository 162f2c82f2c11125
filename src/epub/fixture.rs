//! In-memory EPUB builder for tests

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

/// Write raw entries into a zip archive
pub fn zip_entries(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        zip.start_file(*name, options).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// Builds a minimal EPUB 2 package rooted at `OEBPS/content.opf`
#[derive(Default)]
pub struct EpubBuilder {
    metadata: Vec<String>,
    manifest: Vec<String>,
    files: Vec<(String, Vec<u8>)>,
}

impl EpubBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw XML inside `<metadata>`
    pub fn metadata(mut self, xml: &str) -> Self {
        self.metadata.push(xml.to_string());
        self
    }

    /// Declare an item and store its content next to the package document
    pub fn item(self, id: &str, href: &str, media_type: &str, content: impl Into<Vec<u8>>) -> Self {
        let path = format!("OEBPS/{}", href);
        self.item_at(id, href, &path, media_type, content)
    }

    /// Declare an item whose archive path differs from its href
    pub fn item_at(
        mut self,
        id: &str,
        href: &str,
        path: &str,
        media_type: &str,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        self.manifest.push(format!(
            r#"<item id="{}" href="{}" media-type="{}"/>"#,
            id, href, media_type
        ));
        self.files.push((path.to_string(), content.into()));
        self
    }

    /// Declare an item with EPUB 3 properties
    pub fn item_with_properties(
        mut self,
        id: &str,
        href: &str,
        media_type: &str,
        properties: &str,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        self.manifest.push(format!(
            r#"<item id="{}" href="{}" media-type="{}" properties="{}"/>"#,
            id, href, media_type, properties
        ));
        self.files.push((format!("OEBPS/{}", href), content.into()));
        self
    }

    /// Declare an item without storing any content for it
    pub fn declare_only(mut self, id: &str, href: &str, media_type: &str) -> Self {
        self.manifest.push(format!(
            r#"<item id="{}" href="{}" media-type="{}"/>"#,
            id, href, media_type
        ));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let opf = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="bookid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
    {}
  </metadata>
  <manifest>
    {}
  </manifest>
  <spine/>
</package>"#,
            self.metadata.join("\n    "),
            self.manifest.join("\n    ")
        );

        let mut entries: Vec<(&str, &[u8])> = vec![
            ("mimetype", b"application/epub+zip".as_slice()),
            ("META-INF/container.xml", CONTAINER_XML.as_bytes()),
            ("OEBPS/content.opf", opf.as_bytes()),
        ];
        for (path, data) in &self.files {
            entries.push((path.as_str(), data.as_slice()));
        }

        zip_entries(&entries)
    }
}
