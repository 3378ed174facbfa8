//! Migration of the positional settings array used by older driver releases.
//!
//! Older releases stored every option in a single ordered array. Slots 0-8
//! map onto named [`Settings`] fields; anything after the tenth slot belongs
//! to other migration steps and is handed back untouched.

use crate::Settings;
use serde_json::Value;
use tracing::instrument;

/// Number of known legacy slots. Arrays shorter than this carry no legacy data.
pub const LEGACY_SLOTS: usize = 9;

const EXTRA_FEATURES: usize = 0;
const UPLOAD_ENCUMBERED: usize = 1;
const SKIP_FAILED: usize = 2;
const HYPHENATE: usize = 3;
const SMARTEN_PUNCTUATION: usize = 4;
const CLEAN_MARKUP: usize = 5;
const FULL_PAGE_NUMBERS: usize = 6;
const FILE_COPY_DIR: usize = 7;
const DISABLE_HYPHENATION: usize = 8;

/// Outcome of [`migrate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Migration {
    pub settings: Settings,
    /// Legacy values not consumed by this migration.
    pub remaining: Vec<Value>,
    /// Whether any legacy slots were read.
    pub migrated: bool,
}

/// Migrate a legacy positional settings array into structured settings.
///
/// `base` supplies the value of every field whose legacy slot is absent or
/// malformed. A `file_copy_dir` slot holding anything other than a string
/// resets the field to `None`.
///
/// Once the slots are read, the first `LEGACY_SLOTS + 1` entries are dropped:
/// one slot past the known fields is kept as a spacer. That extra slot has no
/// recorded purpose and may be a historical off-by-one; it is preserved for
/// compatibility with stored settings.
#[instrument(skip_all, fields(slots = legacy.len()))]
pub fn migrate(base: &Settings, legacy: &[Value]) -> Migration {
    if legacy.len() < LEGACY_SLOTS {
        return Migration { settings: base.clone(), remaining: legacy.to_vec(), migrated: false };
    }
    tracing::warn!("Legacy positional settings need to be migrated");

    let mut settings = base.clone();
    let flags: [(usize, &str, &mut bool); 8] = [
        (EXTRA_FEATURES, "extra_features", &mut settings.extra_features),
        (UPLOAD_ENCUMBERED, "upload_encumbered", &mut settings.upload_encumbered),
        (SKIP_FAILED, "skip_failed", &mut settings.skip_failed),
        (HYPHENATE, "hyphenate", &mut settings.hyphenate),
        (SMARTEN_PUNCTUATION, "smarten_punctuation", &mut settings.smarten_punctuation),
        (CLEAN_MARKUP, "clean_markup", &mut settings.clean_markup),
        (FULL_PAGE_NUMBERS, "full_page_numbers", &mut settings.full_page_numbers),
        (DISABLE_HYPHENATION, "disable_hyphenation", &mut settings.disable_hyphenation),
    ];
    for (slot, name, field) in flags {
        match legacy.get(slot) {
            Some(Value::Bool(value)) => *field = *value,
            Some(other) => tracing::warn!(slot, field = name, value = %other, "Discarding malformed legacy setting"),
            None => {},
        }
    }
    if let Some(value) = legacy.get(FILE_COPY_DIR) {
        settings.file_copy_dir = value.as_str().map(str::to_string);
    }

    let remaining = legacy.get(LEGACY_SLOTS + 1..).map(<[Value]>::to_vec).unwrap_or_default();
    tracing::info!(remaining = remaining.len(), "Legacy settings migrated");
    Migration { settings, remaining, migrated: true }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn legacy(extra: usize) -> Vec<Value> {
        let mut values = vec![
            json!(false),
            json!(true),
            json!(true),
            json!(true),
            json!(true),
            json!(true),
            json!(true),
            json!("/srv/kepubs"),
            json!(true),
        ];
        values.extend((0..extra).map(|i| json!(format!("extra-{i}"))));
        values
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(5)]
    #[case(8)]
    fn short_arrays_are_left_alone(#[case] len: usize) {
        let base = Settings::default();
        let values: Vec<Value> = (0..len).map(|_| json!(false)).collect();
        let migration = migrate(&base, &values);
        assert!(!migration.migrated);
        assert_eq!(migration.settings, base);
        assert_eq!(migration.remaining, values);
    }

    #[test]
    fn populates_every_slot() {
        let migration = migrate(&Settings::default(), &legacy(0));
        let settings = migration.settings;
        assert!(migration.migrated);
        assert!(!settings.extra_features);
        assert!(settings.upload_encumbered);
        assert!(settings.skip_failed);
        assert!(settings.hyphenate);
        assert!(settings.smarten_punctuation);
        assert!(settings.clean_markup);
        assert!(settings.full_page_numbers);
        assert!(settings.disable_hyphenation);
        assert_eq!(settings.file_copy_dir.as_deref(), Some("/srv/kepubs"));
    }

    #[rstest]
    #[case(0, 0)]
    #[case(1, 0)]
    #[case(2, 1)]
    #[case(6, 5)]
    fn drops_known_slots_plus_spacer(#[case] extra: usize, #[case] expected: usize) {
        let values = legacy(extra);
        let migration = migrate(&Settings::default(), &values);
        assert_eq!(migration.remaining.len(), expected);
        assert_eq!(migration.remaining.len(), values.len().saturating_sub(10));
        if expected > 0 {
            assert_eq!(migration.remaining[0], json!("extra-1"));
        }
    }

    #[rstest]
    #[case(json!(42))]
    #[case(json!(null))]
    #[case(json!(["a"]))]
    #[case(json!(true))]
    fn non_text_copy_dir_is_unset(#[case] value: Value) {
        let mut base = Settings::default();
        base.file_copy_dir = Some("/previous".to_string());
        let mut values = legacy(0);
        values[FILE_COPY_DIR] = value;
        assert_eq!(migrate(&base, &values).settings.file_copy_dir, None);
    }

    #[test]
    fn malformed_flags_keep_prior_value() {
        let mut values = legacy(0);
        values[EXTRA_FEATURES] = json!("yes");
        values[SKIP_FAILED] = json!(1);
        let settings = migrate(&Settings::default(), &values).settings;
        assert!(settings.extra_features);
        assert!(!settings.skip_failed);
        assert!(settings.hyphenate);
    }

    #[test]
    fn second_run_is_a_no_op() {
        let first = migrate(&Settings::default(), &legacy(4));
        let second = migrate(&first.settings, &first.remaining);
        assert!(!second.migrated);
        assert_eq!(second.settings, first.settings);
        assert_eq!(second.remaining, first.remaining);
    }

    #[test]
    fn inputs_are_not_mutated() {
        let base = Settings::default();
        let values = legacy(3);
        let snapshot = values.clone();
        let _ = migrate(&base, &values);
        assert_eq!(values, snapshot);
        assert_eq!(base, Settings::default());
    }
}
