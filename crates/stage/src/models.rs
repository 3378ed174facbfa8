use kte_container::Container;
use std::path::PathBuf;

/// Host-library metadata for one book.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Book {
    pub title: String,
    pub authors: Vec<String>,
    pub uuid: String,
}

impl Book {
    /// Authors as displayed in log lines and copy paths: `A and B`.
    pub fn authors_display(&self) -> String {
        self.authors.join(" and ")
    }
}

/// One book travelling through the staging pipeline.
#[derive(Debug)]
pub struct BookJob {
    /// Path of the book's file, staged for upload. Transformations are
    /// committed back to this path.
    pub source: PathBuf,
    pub book: Book,
    /// A container the host already opened, if any.
    pub container: Option<Container>,
}

impl BookJob {
    pub fn new(source: impl Into<PathBuf>, book: Book) -> Self {
        Self { source: source.into(), book, container: None }
    }

    pub fn with_container(mut self, container: Container) -> Self {
        self.container = Some(container);
        self
    }

    /// The source path as text, for extension checks.
    pub(crate) fn source_str(&self) -> String {
        self.source.to_string_lossy().into_owned()
    }
}

/// Final state of a book after staging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The file was rewritten with kepub markup.
    Transformed,
    /// The file is uploaded as it was.
    Passthrough,
    /// The file must not be uploaded.
    Aborted,
}
