use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default template used to place copies of converted books in
/// [`file_copy_dir`](Settings::file_copy_dir).
pub const DEFAULT_COPY_TEMPLATE: &str = "{{ authors }}/{{ title }} - {{ authors }}";

/// The structured settings record for the driver.
///
/// Loaded once per session (see [`load`](crate::load)) and snapshotted per
/// book into [`PolicyFlags`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Add the extended kepub markup and rename files to `.kepub.epub`.
    pub extra_features: bool,
    /// Upload DRM-encumbered books untouched instead of refusing them.
    pub upload_encumbered: bool,
    /// Fall back to an unmodified upload when conversion fails.
    pub skip_failed: bool,
    pub hyphenate: bool,
    pub smarten_punctuation: bool,
    pub clean_markup: bool,
    /// Show whole-book page numbers on the device instead of per-chapter ones.
    pub full_page_numbers: bool,
    pub disable_hyphenation: bool,
    /// Directory receiving a copy of every successfully converted book.
    pub file_copy_dir: Option<String>,
    /// Template for the copy's path, relative to `file_copy_dir`.
    pub copy_template: String,
    /// Backfill `ImageId` on device database rows after a sync.
    pub upload_covers: bool,
    /// Stage the device-model specific `kobo_extra.css`.
    pub modify_css: bool,
    /// Positional values left over from an older settings schema.
    pub extra_customization: Vec<Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            extra_features: true,
            upload_encumbered: false,
            skip_failed: false,
            hyphenate: false,
            smarten_punctuation: false,
            clean_markup: false,
            full_page_numbers: false,
            disable_hyphenation: false,
            file_copy_dir: None,
            copy_template: DEFAULT_COPY_TEMPLATE.to_string(),
            upload_covers: false,
            modify_css: false,
            extra_customization: Vec::new(),
        }
    }
}

impl Settings {
    /// Immutable snapshot of the per-book policy.
    pub fn policy(&self) -> PolicyFlags {
        PolicyFlags {
            extra_features: self.extra_features,
            upload_encumbered: self.upload_encumbered,
            skip_failed: self.skip_failed,
            hyphenate: self.hyphenate,
            smarten_punctuation: self.smarten_punctuation,
            clean_markup: self.clean_markup,
            full_page_numbers: self.full_page_numbers,
            disable_hyphenation: self.disable_hyphenation,
            file_copy_dir: self.file_copy_dir.clone(),
        }
    }
}

/// Per-book policy flags, read once per job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyFlags {
    pub extra_features: bool,
    pub upload_encumbered: bool,
    pub skip_failed: bool,
    pub hyphenate: bool,
    pub smarten_punctuation: bool,
    pub clean_markup: bool,
    pub full_page_numbers: bool,
    pub disable_hyphenation: bool,
    pub file_copy_dir: Option<String>,
}

impl PolicyFlags {
    /// The configured copy directory, if any, ignoring blank values.
    pub fn copy_dir(&self) -> Option<&str> {
        self.file_copy_dir.as_deref().map(str::trim).filter(|d| !d.is_empty())
    }

    /// The flags in legacy slot order (the inverse of [`migrate`](crate::migrate)).
    pub fn to_legacy(&self) -> Vec<Value> {
        vec![
            Value::Bool(self.extra_features),
            Value::Bool(self.upload_encumbered),
            Value::Bool(self.skip_failed),
            Value::Bool(self.hyphenate),
            Value::Bool(self.smarten_punctuation),
            Value::Bool(self.clean_markup),
            Value::Bool(self.full_page_numbers),
            self.file_copy_dir.clone().map_or(Value::Null, Value::String),
            Value::Bool(self.disable_hyphenation),
        ]
    }

    /// Textual rendering of the active options, as embedded in the driver record.
    pub fn render(&self) -> String {
        Value::Array(self.to_legacy()).to_string()
    }
}
