//! Path templating for copies of converted books.
//!
//! Converts [`Book`] metadata into a relative path under the configured copy
//! directory using an [upon] template (`{{ variable }}`,
//! `{{ value|formatter }}`), extended with a `slug` formatter for
//! lowercase, hyphen-separated segments.
//!
//! # Template Variables
//!
//! | Variable   | Type     | Description                               |
//! |------------|----------|-------------------------------------------|
//! | `title`    | `String` | Book title                                |
//! | `authors`  | `String` | All authors, joined with `" and "`        |
//! | `author`   | `String` | First author, or empty                    |
//! | `uuid`     | `String` | Host library uuid                         |
//!
//! # Example
//!
//! ```
//! use kte_stage::{Book, CopyPathGenerator};
//!
//! let book = Book { title: "My Story".into(), authors: vec!["Jane Doe".into()], uuid: "u1".into() };
//! let generator: CopyPathGenerator = "{{ author|slug }}/{{ title }}".parse().unwrap();
//! assert_eq!(generator.generate(&book).unwrap(), "jane-doe/My Story");
//! ```

use crate::error::{Error, ErrorKind, Result};
use crate::models::Book;
use crate::rename::sanitize_components;
use exn::ResultExt;
use std::fmt::Write;
use std::str::FromStr;
use tracing::instrument;
use upon::{Engine, Template};

/// Generates relative paths from [`Book`] metadata and a template string.
///
/// Constructed via [`FromStr`], which compiles the template eagerly so that
/// syntax errors surface at creation time rather than at render time.
///
/// Generated paths are normalized (trimmed, empty segments dropped), every
/// segment is sanitized for the device file system, and paths escaping the
/// copy directory are rejected.
pub struct CopyPathGenerator {
    engine: Engine<'static>,
    template: Template<'static>,
    source: String,
}

impl std::fmt::Debug for CopyPathGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CopyPathGenerator").field("template", &self.source).finish()
    }
}

impl FromStr for CopyPathGenerator {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut engine = Engine::new();
        engine.add_formatter("slug", slug);
        // Compile the template early so we can fail-fast in construction.
        let template = engine.compile(s.to_string()).or_raise(|| ErrorKind::Template)?;
        Ok(Self { engine, template, source: s.to_string() })
    }
}

impl CopyPathGenerator {
    /// Renders the template against `book`, without any file extension.
    #[instrument(skip_all, fields(uuid = %book.uuid))]
    pub fn generate(&self, book: &Book) -> Result<String> {
        let path = self
            .template
            .render(&self.engine, Self::parameters(book))
            .to_string()
            .or_raise(|| ErrorKind::Template)?;
        Self::normalize(&path)
    }

    fn normalize(path: &str) -> Result<String> {
        let segments: Vec<&str> = path.split('/').map(str::trim).filter(|s| !s.is_empty()).collect();
        if segments.is_empty() || segments.iter().any(|s| *s == "." || *s == "..") {
            exn::bail!(ErrorKind::Template);
        }
        Ok(sanitize_components(segments).join("/"))
    }

    fn parameters(book: &Book) -> upon::Value {
        upon::value! {
            title: &book.title,
            authors: book.authors_display(),
            author: book.authors.first().cloned().unwrap_or_default(),
            uuid: &book.uuid,
        }
    }
}

/// Quotation marks are dropped before slugging so `"Dune"` does not become
/// `-dune-`.
fn slug(f: &mut upon::fmt::Formatter<'_>, value: &upon::Value) -> upon::fmt::Result {
    let upon::Value::String(text) = value else {
        return upon::fmt::default(f, value);
    };
    let unquoted: String = text.chars().filter(|c| !is_quotation_mark(*c)).collect();
    f.write_str(&rslug::slugify!(&unquoted))?;
    Ok(())
}

fn is_quotation_mark(c: char) -> bool {
    matches!(c, '\'' | '"' | '`' | '\u{2018}'..='\u{201F}' | '\u{00AB}' | '\u{00BB}' | '\u{2039}' | '\u{203A}')
}
