//! Shared helpers for the API tests

use std::io::{Cursor, Write};
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use estante_server::auth::{IdentityValidator, UserIdentity};
use estante_server::config::Config;
use estante_server::routes;
use estante_server::state::AppState;
use estante_server::storage::MemoryStore;

pub const TOKEN: &str = "test-token";

/// Accepts exactly [`TOKEN`]
pub struct StaticValidator;

#[async_trait]
impl IdentityValidator for StaticValidator {
    async fn validate(&self, token: &str) -> Option<UserIdentity> {
        (token == TOKEN).then(|| UserIdentity {
            login: "reader".to_string(),
            id: 1,
            name: None,
        })
    }
}

/// Router over an in-memory bucket, caching into a temporary directory
pub fn app(store: Arc<MemoryStore>) -> (Router, TempDir) {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.cache.dir = dir.path().to_path_buf();

    let state = AppState::new(&config, store, Arc::new(StaticValidator));
    (routes::router(state), dir)
}

/// A small EPUB with a declared cover and an ebook ISBN on its copyright page
pub fn sample_epub() -> Vec<u8> {
    let container = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles><rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/></rootfiles>
</container>"#;

    let opf = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="id">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
    <dc:title>Dom Casmurro</dc:title>
    <dc:creator>Machado de Assis</dc:creator>
    <dc:language>pt</dc:language>
    <dc:identifier id="id" opf:scheme="UUID">5f6d6c1e-0d1a-4a0c-9a53-3c1b1d2e7f00</dc:identifier>
    <dc:identifier opf:scheme="ISBN">9780000000002</dc:identifier>
    <dc:subject>Fiction</dc:subject>
    <meta name="cover" content="front"/>
  </metadata>
  <manifest>
    <item id="front" href="images/front.png" media-type="image/png"/>
    <item id="legal" href="text/legal.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine><itemref idref="legal"/></spine>
</package>"#;

    let legal = "<html><body><p>Copyright 1899</p>\n<p>ISBN 978-0-306-40615-7 (print)</p>\n<p>ISBN 978-1-4028-9462-6 (ebook)</p></body></html>";

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, data) in [
        ("mimetype", b"application/epub+zip".as_slice()),
        ("META-INF/container.xml", container.as_bytes()),
        ("OEBPS/content.opf", opf.as_bytes()),
        ("OEBPS/images/front.png", b"\x89PNG-front".as_slice()),
        ("OEBPS/text/legal.xhtml", legal.as_bytes()),
    ] {
        zip.start_file(name, options).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}
