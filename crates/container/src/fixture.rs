//! Minimal EPUB archives for tests, here and in dependent crates.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const OPF_PATH: &str = "OEBPS/content.opf";

const CONTAINER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

const CHAPTER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><head><title>One</title></head>
<body><p>It was a dark and stormy night.</p></body></html>"#;

/// Builds a small but valid EPUB with a single chapter.
pub struct EpubBuilder {
    title: String,
    opf: bool,
    extra: Vec<(String, Vec<u8>)>,
}

impl Default for EpubBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EpubBuilder {
    pub fn new() -> Self {
        Self { title: "Test Book".to_string(), opf: true, extra: Vec::new() }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    /// Add an arbitrary archive entry, e.g. `META-INF/rights.xml`.
    pub fn entry(mut self, name: &str, body: impl AsRef<[u8]>) -> Self {
        self.extra.push((name.to_string(), body.as_ref().to_vec()));
        self
    }

    /// Leave the package document out while still pointing at it.
    pub fn without_opf(mut self) -> Self {
        self.opf = false;
        self
    }

    fn package(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>{}</dc:title>
    <dc:identifier id="uid">urn:uuid:00000000-0000-0000-0000-000000000000</dc:identifier>
  </metadata>
  <manifest>
    <item id="ch1" href="chapter1.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine>
    <itemref idref="ch1"/>
  </spine>
</package>"#,
            self.title
        )
    }

    /// Write the archive to `path` and return it.
    ///
    /// # Panics
    ///
    /// On any I/O failure; this is test scaffolding.
    pub fn write_to(&self, path: &Path) -> PathBuf {
        let file = File::create(path).expect("create fixture epub");
        let mut zip = ZipWriter::new(file);
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut entries: Vec<(&str, Vec<u8>)> = vec![("META-INF/container.xml", CONTAINER.as_bytes().to_vec())];
        if self.opf {
            entries.push((OPF_PATH, self.package().into_bytes()));
        }
        entries.push(("OEBPS/chapter1.xhtml", CHAPTER.as_bytes().to_vec()));
        entries.extend(self.extra.iter().map(|(name, body)| (name.as_str(), body.clone())));

        zip.start_file("mimetype", stored).expect("start mimetype");
        zip.write_all(b"application/epub+zip").expect("write mimetype");
        for (name, body) in entries {
            zip.start_file(name, deflated).expect("start entry");
            zip.write_all(&body).expect("write entry");
        }
        zip.finish().expect("finish fixture epub");
        path.to_path_buf()
    }
}
