use std::collections::HashSet;

/// Books whose device file name must not gain the `.kepub` marker.
///
/// Lives for one sync session and only ever grows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipSet(HashSet<String>);

impl SkipSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the uuid was not already present.
    pub fn insert(&mut self, uuid: &str) -> bool {
        let inserted = self.0.insert(uuid.to_string());
        if inserted {
            tracing::debug!(%uuid, "Book will keep its original file name");
        }
        inserted
    }

    pub fn contains(&self, uuid: &str) -> bool {
        self.0.contains(uuid)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
