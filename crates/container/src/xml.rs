//! The handful of XML lookups the container needs: the OPF location, DRM
//! declarations and the manifest insertion point.

use crate::error::{ErrorKind, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// Encryption algorithms used for font obfuscation. Books using only these
/// are not DRM-encumbered.
const FONT_OBFUSCATION: [&str; 2] = ["http://www.idpf.org/2008/embedding", "http://ns.adobe.com/pdf/enc#RC"];

fn attribute(e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

/// Full path of the package document, from `META-INF/container.xml`.
pub(crate) fn rootfile(container_xml: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(container_xml);
    reader.config_mut().trim_text(true);
    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.local_name().as_ref() == b"rootfile" => {
                if let Some(path) = attribute(&e, b"full-path") {
                    return Ok(Some(path));
                }
            },
            Ok(Event::Eof) => return Ok(None),
            Err(_) => exn::bail!(ErrorKind::MalformedXml("META-INF/container.xml".to_string())),
            _ => {},
        }
    }
}

/// Whether `META-INF/encryption.xml` declares anything beyond font obfuscation.
pub(crate) fn declares_drm(encryption_xml: &str) -> Result<bool> {
    let mut reader = Reader::from_str(encryption_xml);
    reader.config_mut().trim_text(true);
    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.local_name().as_ref() == b"EncryptionMethod" => {
                if let Some(algorithm) = attribute(&e, b"Algorithm")
                    && !FONT_OBFUSCATION.contains(&algorithm.as_str())
                {
                    tracing::debug!(%algorithm, "Found DRM encryption method");
                    return Ok(true);
                }
            },
            Ok(Event::Eof) => return Ok(false),
            Err(_) => exn::bail!(ErrorKind::MalformedXml("META-INF/encryption.xml".to_string())),
            _ => {},
        }
    }
}

/// What the manifest already contains, and where a new item can be inserted.
pub(crate) struct Manifest {
    /// Byte offset of the closing manifest tag.
    pub(crate) end: usize,
    pub(crate) ids: Vec<String>,
    pub(crate) hrefs: Vec<String>,
    /// Namespace prefix used by the manifest element (e.g. `opf:`), if any.
    pub(crate) prefix: String,
}

pub(crate) fn manifest(opf_name: &str, opf: &str) -> Result<Manifest> {
    let malformed = || ErrorKind::MalformedXml(opf_name.to_string());
    let mut reader = Reader::from_str(opf);
    let mut ids = Vec::new();
    let mut hrefs = Vec::new();
    loop {
        // Whitespace is reported as its own event, so the position before
        // reading a closing tag is where that tag starts.
        let before = usize::try_from(reader.buffer_position()).unwrap_or(usize::MAX);
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.local_name().as_ref() == b"item" => {
                ids.extend(attribute(&e, b"id"));
                hrefs.extend(attribute(&e, b"href"));
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"manifest" => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let prefix = name.strip_suffix("manifest").unwrap_or_default().to_string();
                if before > opf.len() {
                    exn::bail!(malformed());
                }
                return Ok(Manifest { end: before, ids, hrefs, prefix });
            },
            Ok(Event::Eof) => exn::bail!(malformed()),
            Err(_) => exn::bail!(malformed()),
            _ => {},
        }
    }
}

pub(crate) fn escape(value: &str) -> String {
    quick_xml::escape::escape(value).into_owned()
}
