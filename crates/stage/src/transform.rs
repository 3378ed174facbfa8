use crate::error::Result;
use crate::models::Book;
use kte_config::PolicyFlags;
use kte_container::Container;
use std::path::Path;

/// The markup rewriting engine that adds kepub features to a container.
///
/// Implementations report failures as [`ErrorKind::Transformation`](crate::error::ErrorKind::Transformation).
pub trait Transformer {
    fn transform(
        &self,
        container: &mut Container,
        source: &Path,
        book: &Book,
        options: &TransformOptions,
    ) -> Result<()>;
}

/// Options handed to the [`Transformer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransformOptions {
    pub clean_markup: bool,
    pub hyphenate: bool,
    pub no_hyphens: bool,
    pub smarten_punctuation: bool,
    pub extended_kepub_features: bool,
}

impl TransformOptions {
    pub fn from_policy(policy: &PolicyFlags) -> Self {
        Self {
            clean_markup: policy.clean_markup,
            hyphenate: policy.hyphenate && !policy.disable_hyphenation,
            no_hyphens: policy.disable_hyphenation,
            smarten_punctuation: policy.smarten_punctuation,
            extended_kepub_features: policy.extra_features,
        }
    }

    /// Options under the names the transformer understands.
    pub fn named(&self) -> [(&'static str, bool); 5] {
        [
            ("clean_markup", self.clean_markup),
            ("hyphenate", self.hyphenate),
            ("no-hyphens", self.no_hyphens),
            ("smarten_punctuation", self.smarten_punctuation),
            ("extended_kepub_features", self.extended_kepub_features),
        ]
    }
}
