//! Device file naming.
//!
//! The Kobo firmware only applies its kepub renderer to files named
//! `*.kepub.epub`, so converted books are renamed on the way to the device.

use crate::skip::SkipSet;
use regex::Regex;
use std::sync::LazyLock;
use tracing::instrument;

pub const EPUB_EXT: &str = ".epub";
pub const KEPUB_EXT: &str = ".kepub";

/// Characters the device file system or firmware cannot cope with.
static INVALID_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[/\\?%*:;|"'><$!]"#).unwrap());

/// Computes device file names for one session.
#[derive(Debug, Clone, Copy)]
pub struct FilenameResolver<'a> {
    extra_features: bool,
    skip: &'a SkipSet,
}

impl<'a> FilenameResolver<'a> {
    pub fn new(extra_features: bool, skip: &'a SkipSet) -> Self {
        Self { extra_features, skip }
    }

    /// Final device path for the book `uuid` proposed at `path`.
    #[instrument(level = "debug", skip(self))]
    pub fn resolve(&self, path: &str, uuid: &str) -> String {
        if !self.extra_features {
            return path.to_string();
        }
        let resolved = if path.ends_with(&format!("{KEPUB_EXT}{EPUB_EXT}")) {
            path.to_string()
        } else if path.ends_with(KEPUB_EXT) {
            format!("{path}{EPUB_EXT}")
        } else if let Some(stem) = path.strip_suffix(EPUB_EXT)
            && !self.skip.contains(uuid)
        {
            format!("{stem}{KEPUB_EXT}{EPUB_EXT}")
        } else {
            path.to_string()
        };
        tracing::debug!(%resolved, "New path");
        resolved
    }
}

/// Replace unsafe characters in every path component with `_`.
pub fn sanitize_components<I, S>(components: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    components.into_iter().map(|c| INVALID_FILENAME_CHARS.replace_all(c.as_ref(), "_").into_owned()).collect()
}
