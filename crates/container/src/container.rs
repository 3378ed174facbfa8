use crate::error::{ErrorKind, Result};
use crate::xml;
use exn::{OptionExt, ResultExt};
use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::Path;
use tracing::instrument;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const MIMETYPE: &str = "mimetype";
pub const CONTAINER_XML: &str = "META-INF/container.xml";
pub const ENCRYPTION_XML: &str = "META-INF/encryption.xml";
pub const RIGHTS_XML: &str = "META-INF/rights.xml";

/// Result of opening a container for modification.
#[derive(Debug)]
pub enum Probe {
    Ready(Container),
    /// The container is protected by DRM and must not be modified.
    Encumbered,
}

/// An EPUB held in memory: every entry in archive order, plus the location
/// of its package document.
#[derive(Debug, Clone)]
pub struct Container {
    entries: Vec<(String, Vec<u8>)>,
    opf: String,
    encumbered: bool,
}

impl Container {
    /// Open `path`, signalling DRM as [`Probe::Encumbered`] instead of a
    /// loaded container.
    pub fn open(path: &Path) -> Result<Probe> {
        let container = Self::load(path)?;
        if container.encumbered {
            tracing::info!(path = %path.display(), "Container is DRM-encumbered");
            return Ok(Probe::Encumbered);
        }
        Ok(Probe::Ready(container))
    }

    /// Read the archive at `path` regardless of its DRM state.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self> {
        let unreadable = || ErrorKind::Unreadable(path.to_path_buf());
        let file = File::open(path).or_raise(unreadable)?;
        Self::from_reader(file).or_raise(unreadable)
    }

    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader).or_raise(|| ErrorKind::Io)?;
        let mut entries = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let mut file = archive.by_index(index).or_raise(|| ErrorKind::Io)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut data = Vec::with_capacity(usize::try_from(file.size()).unwrap_or_default());
            file.read_to_end(&mut data).or_raise(|| ErrorKind::Io)?;
            entries.push((name, data));
        }

        let container_xml = entries
            .iter()
            .find(|(name, _)| name == CONTAINER_XML)
            .map(|(_, data)| String::from_utf8_lossy(data).into_owned())
            .ok_or_raise(|| ErrorKind::MissingEntry(CONTAINER_XML.to_string()))?;
        let opf = xml::rootfile(&container_xml)?.ok_or_raise(|| ErrorKind::MissingEntry("rootfile".to_string()))?;
        if !entries.iter().any(|(name, _)| *name == opf) {
            exn::bail!(ErrorKind::MissingEntry(opf));
        }

        let mut container = Self { entries, opf, encumbered: false };
        container.encumbered = container.detect_drm()?;
        Ok(container)
    }

    fn detect_drm(&self) -> Result<bool> {
        if self.read(RIGHTS_XML).is_some() {
            return Ok(true);
        }
        match self.read(ENCRYPTION_XML) {
            Some(data) => xml::declares_drm(&String::from_utf8_lossy(data)),
            None => Ok(false),
        }
    }

    pub fn is_drm_encumbered(&self) -> bool {
        self.encumbered
    }

    /// Archive path of the package document.
    pub fn opf_path(&self) -> &str {
        &self.opf
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn read(&self, name: &str) -> Option<&[u8]> {
        self.entries.iter().find(|(entry, _)| entry == name).map(|(_, data)| data.as_slice())
    }

    /// Replace the contents of `name`, adding it to the end of the archive if
    /// it does not exist. The manifest is not touched.
    pub fn write(&mut self, name: &str, data: Vec<u8>) {
        match self.entries.iter_mut().find(|(entry, _)| entry == name) {
            Some((_, existing)) => *existing = data,
            None => self.entries.push((name.to_string(), data)),
        }
    }

    /// Store `data` at `name` and register it in the package manifest.
    #[instrument(skip(self, data), fields(bytes = data.len()))]
    pub fn add_file(&mut self, name: &str, data: Vec<u8>, media_type: &str) -> Result<()> {
        let href = self.href_for(name);
        let opf_bytes = self.read(&self.opf).ok_or_raise(|| ErrorKind::MissingEntry(self.opf.clone()))?;
        let opf = String::from_utf8_lossy(opf_bytes).into_owned();
        let manifest = xml::manifest(&self.opf, &opf)?;

        if !manifest.hrefs.iter().any(|existing| *existing == href) {
            let id = unique_id(&manifest.ids, name);
            let item = format!(
                r#"<{prefix}item id="{id}" href="{href}" media-type="{media_type}"/>"#,
                prefix = manifest.prefix,
                id = xml::escape(&id),
                href = xml::escape(&href),
                media_type = xml::escape(media_type),
            );
            let mut updated = String::with_capacity(opf.len() + item.len());
            updated.push_str(&opf[..manifest.end]);
            updated.push_str(&item);
            updated.push_str(&opf[manifest.end..]);
            let opf_name = self.opf.clone();
            self.write(&opf_name, updated.into_bytes());
            tracing::debug!(%id, %href, "Registered manifest item");
        }
        self.write(name, data);
        Ok(())
    }

    /// Copy a local file into the archive at `name`.
    pub fn copy_file_into_container(&mut self, local: &Path, name: &str, media_type: &str) -> Result<()> {
        let data = std::fs::read(local).or_raise(|| ErrorKind::Io)?;
        self.add_file(name, data, media_type)
    }

    /// Manifest hrefs are relative to the directory holding the package
    /// document.
    fn href_for(&self, name: &str) -> String {
        let depth = Path::new(&self.opf).parent().map_or(0, |dir| dir.components().count());
        format!("{}{name}", "../".repeat(depth))
    }

    /// Write the archive to `out`, replacing any existing file atomically.
    ///
    /// The `mimetype` entry is written first and uncompressed, as EPUB readers
    /// expect.
    #[instrument(skip(self), fields(entries = self.entries.len()))]
    pub fn commit(&self, out: &Path) -> Result<()> {
        let failed = || ErrorKind::Commit(out.to_path_buf());
        let dir = out.parent().filter(|dir| !dir.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir).or_raise(failed)?;
        self.write_to(tmp.as_file_mut()).or_raise(failed)?;
        tmp.as_file_mut().flush().or_raise(failed)?;
        tmp.persist(out).or_raise(failed)?;
        tracing::debug!(path = %out.display(), "Container committed");
        Ok(())
    }

    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<()> {
        let mut zip = ZipWriter::new(writer);
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let ordered = self
            .entries
            .iter()
            .filter(|(name, _)| name == MIMETYPE)
            .chain(self.entries.iter().filter(|(name, _)| name != MIMETYPE));
        for (name, data) in ordered {
            let options = if name == MIMETYPE { stored } else { deflated };
            zip.start_file(name.as_str(), options).or_raise(|| ErrorKind::Io)?;
            zip.write_all(data).or_raise(|| ErrorKind::Io)?;
        }
        zip.finish().or_raise(|| ErrorKind::Io)?;
        Ok(())
    }
}

fn unique_id(existing: &[String], name: &str) -> String {
    let stem: String = Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let base = format!("kte_{stem}");
    let mut candidate = base.clone();
    let mut n = 1;
    while existing.contains(&candidate) {
        candidate = format!("{base}{n}");
        n += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{EpubBuilder, OPF_PATH};
    use rstest::rstest;
    use tempfile::TempDir;

    fn reopen(path: &Path) -> Container {
        Container::load(path).unwrap()
    }

    #[test]
    fn loads_plain_epub() {
        let dir = TempDir::new().unwrap();
        let path = EpubBuilder::new().write_to(&dir.path().join("book.epub"));
        let container = reopen(&path);
        assert!(!container.is_drm_encumbered());
        assert_eq!(container.opf_path(), OPF_PATH);
        assert!(container.names().any(|n| n == "OEBPS/chapter1.xhtml"));
    }

    #[rstest]
    #[case::rights(RIGHTS_XML, "<rights/>")]
    #[case::adept(
        ENCRYPTION_XML,
        r#"<encryption><EncryptionMethod Algorithm="http://www.w3.org/2001/04/xmlenc#aes128-cbc"/></encryption>"#
    )]
    fn detects_drm(#[case] name: &str, #[case] body: &str) {
        let dir = TempDir::new().unwrap();
        let path = EpubBuilder::new().entry(name, body).write_to(&dir.path().join("book.epub"));
        assert!(reopen(&path).is_drm_encumbered());
        assert!(matches!(Container::open(&path).unwrap(), Probe::Encumbered));
    }

    #[test]
    fn font_obfuscation_is_ready() {
        let dir = TempDir::new().unwrap();
        let body = r#"<encryption><EncryptionMethod Algorithm="http://www.idpf.org/2008/embedding"/></encryption>"#;
        let path = EpubBuilder::new().entry(ENCRYPTION_XML, body).write_to(&dir.path().join("book.epub"));
        assert!(matches!(Container::open(&path).unwrap(), Probe::Ready(_)));
    }

    #[test]
    fn not_a_zip_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("book.epub");
        std::fs::write(&path, b"definitely not a zip").unwrap();
        let err = Container::open(&path).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Unreadable(_)));
    }

    #[test]
    fn missing_package_document_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let path = EpubBuilder::new().without_opf().write_to(&dir.path().join("book.epub"));
        let err = Container::load(&path).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Unreadable(_)));
    }

    #[test]
    fn copied_file_is_registered_and_committed() {
        let dir = TempDir::new().unwrap();
        let path = EpubBuilder::new().write_to(&dir.path().join("book.epub"));
        let local = dir.path().join("record.json");
        std::fs::write(&local, br#"{"a":1}"#).unwrap();

        let mut container = reopen(&path);
        container.copy_file_into_container(&local, "driverinfo.kte", "application/json").unwrap();
        container.commit(&path).unwrap();

        let committed = reopen(&path);
        assert_eq!(committed.read("driverinfo.kte"), Some(&br#"{"a":1}"#[..]));
        let opf = String::from_utf8_lossy(committed.read(OPF_PATH).unwrap()).into_owned();
        assert!(opf.contains(r#"href="../driverinfo.kte""#));
        assert!(opf.contains(r#"media-type="application/json""#));
        assert_eq!(committed.names().next(), Some(MIMETYPE));
    }

    #[test]
    fn adding_twice_registers_once() {
        let dir = TempDir::new().unwrap();
        let path = EpubBuilder::new().write_to(&dir.path().join("book.epub"));
        let mut container = reopen(&path);
        container.add_file("driverinfo.kte", b"1".to_vec(), "application/json").unwrap();
        container.add_file("driverinfo.kte", b"2".to_vec(), "application/json").unwrap();
        let opf = String::from_utf8_lossy(container.read(OPF_PATH).unwrap()).into_owned();
        assert_eq!(opf.matches("driverinfo.kte").count(), 1);
        assert_eq!(container.read("driverinfo.kte"), Some(&b"2"[..]));
    }

    #[test]
    fn ids_do_not_collide() {
        let existing = vec!["kte_a_json".to_string(), "kte_a_json1".to_string()];
        assert_eq!(unique_id(&existing, "dir/a.json"), "kte_a_json2");
        assert_eq!(unique_id(&[], "b.css"), "kte_b_css");
    }
}
