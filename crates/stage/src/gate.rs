//! Decides what happens to a book before any work is done on it.

use crate::error::{ErrorKind, Result};
use crate::models::BookJob;
use crate::rename::{EPUB_EXT, KEPUB_EXT};
use crate::skip::SkipSet;
use exn::ResultExt;
use kte_config::PolicyFlags;
use kte_container::{Container, Probe};
use tracing::instrument;

/// What to do with one book.
#[derive(Debug)]
pub enum Decision {
    /// Not an EPUB: upload as-is.
    SkipForeign,
    /// Open, unencumbered container ready for transformation.
    Transform(Container),
    /// DRM-encumbered and encumbered uploads are disabled.
    AbortEncumbered,
    /// DRM-encumbered, uploaded unmodified.
    PassthroughEncumbered,
}

/// Classify `job`, recording in `skip` every book that must keep its name.
///
/// A container already attached to the job is taken from it; otherwise the
/// source file is opened once. Unreadable containers are errors.
#[instrument(skip_all, fields(title = %job.book.title, uuid = %job.book.uuid))]
pub fn decide(job: &mut BookJob, policy: &PolicyFlags, skip: &mut SkipSet) -> Result<Decision> {
    let source = job.source_str();
    if !source.ends_with(EPUB_EXT) {
        if source.ends_with(KEPUB_EXT) {
            tracing::info!(path = %source, "Skipping all processing for already converted kepub");
        } else {
            skip.insert(&job.book.uuid);
        }
        return Ok(Decision::SkipForeign);
    }

    tracing::info!(
        title = %job.book.title,
        authors = %job.book.authors_display(),
        "Adding basic Kobo features"
    );
    let probe = match job.container.take() {
        Some(container) if container.is_drm_encumbered() => Probe::Encumbered,
        Some(container) => Probe::Ready(container),
        None => Container::open(&job.source).or_raise(|| ErrorKind::Container).inspect_err(|err| {
            tracing::error!(
                title = %job.book.title,
                authors = %job.book.authors_display(),
                error = %err,
                "Failed to open book"
            );
        })?,
    };

    match probe {
        Probe::Ready(container) => Ok(Decision::Transform(container)),
        Probe::Encumbered => {
            tracing::warn!(
                title = %job.book.title,
                authors = %job.book.authors_display(),
                "ePub is DRM-encumbered, not modifying"
            );
            skip.insert(&job.book.uuid);
            if policy.upload_encumbered {
                Ok(Decision::PassthroughEncumbered)
            } else {
                Ok(Decision::AbortEncumbered)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Book;
    use kte_config::Settings;
    use kte_container::RIGHTS_XML;
    use kte_container::fixture::EpubBuilder;
    use rstest::rstest;
    use std::path::Path;
    use tempfile::TempDir;

    fn job(path: &Path) -> BookJob {
        BookJob::new(path, Book { title: "T".into(), authors: vec!["A".into()], uuid: "u1".into() })
    }

    fn policy(upload_encumbered: bool) -> PolicyFlags {
        let mut settings = Settings::default();
        settings.upload_encumbered = upload_encumbered;
        settings.policy()
    }

    #[test]
    fn foreign_formats_are_skipped_and_remembered() {
        let mut skip = SkipSet::new();
        let decision = decide(&mut job(Path::new("/books/a.pdf")), &policy(false), &mut skip).unwrap();
        assert!(matches!(decision, Decision::SkipForeign));
        assert!(skip.contains("u1"));
    }

    #[test]
    fn converted_kepubs_are_left_alone() {
        let mut skip = SkipSet::new();
        let decision = decide(&mut job(Path::new("/books/a.kepub")), &policy(false), &mut skip).unwrap();
        assert!(matches!(decision, Decision::SkipForeign));
        assert!(!skip.contains("u1"));
    }

    #[test]
    fn plain_epub_is_transformed() {
        let dir = TempDir::new().unwrap();
        let path = EpubBuilder::new().write_to(&dir.path().join("a.epub"));
        let mut skip = SkipSet::new();
        let decision = decide(&mut job(&path), &policy(false), &mut skip).unwrap();
        assert!(matches!(decision, Decision::Transform(_)));
        assert!(skip.is_empty());
    }

    #[rstest]
    #[case(false)]
    #[case(true)]
    fn encumbered_books_follow_policy(#[case] upload_encumbered: bool) {
        let dir = TempDir::new().unwrap();
        let path = EpubBuilder::new().entry(RIGHTS_XML, "<rights/>").write_to(&dir.path().join("a.epub"));
        let mut skip = SkipSet::new();
        let decision = decide(&mut job(&path), &policy(upload_encumbered), &mut skip).unwrap();
        if upload_encumbered {
            assert!(matches!(decision, Decision::PassthroughEncumbered));
        } else {
            assert!(matches!(decision, Decision::AbortEncumbered));
        }
        assert!(skip.contains("u1"));
    }

    #[test]
    fn attached_container_is_used() {
        let dir = TempDir::new().unwrap();
        let path = EpubBuilder::new().entry(RIGHTS_XML, "<rights/>").write_to(&dir.path().join("a.epub"));
        let container = Container::load(&path).unwrap();
        // The attached container is authoritative, even if the path is gone.
        std::fs::remove_file(&path).unwrap();
        let mut job = job(&path).with_container(container);
        let mut skip = SkipSet::new();
        let decision = decide(&mut job, &policy(false), &mut skip).unwrap();
        assert!(matches!(decision, Decision::AbortEncumbered));
    }

    #[test]
    fn unreadable_container_propagates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.epub");
        std::fs::write(&path, b"not a zip").unwrap();
        let mut skip = SkipSet::new();
        let err = decide(&mut job(&path), &policy(false), &mut skip).unwrap_err();
        assert_eq!(*err, ErrorKind::Container);
        assert!(skip.is_empty());
    }
}
