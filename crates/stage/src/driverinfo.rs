//! The `driverinfo.kte` record embedded in every converted book.
//!
//! It is derived from the device's own `driveinfo.calibre`, stripped of the
//! keys that identify the device or library, and stamped with the driver
//! version, its options and the conversion time.

use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use kte_container::Container;
use serde_json::{Map, Value};
use std::io::Write;
use std::path::Path;
use time::UtcDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use tracing::instrument;

/// Device-resident file the record is derived from.
pub const DEVICE_INFO_FILE: &str = "driveinfo.calibre";
/// Archive name of the embedded record.
pub const RECORD_NAME: &str = "driverinfo.kte";
pub const RECORD_MEDIA_TYPE: &str = "application/json";

pub const VERSION_KEY: &str = "kobotouchextended_version";
pub const OPTIONS_KEY: &str = "kobotouchextended_options";
pub const TIME_KEY: &str = "kobotouchextended_currenttime";

/// Keys identifying the device or the host library.
const PRIVATE_KEYS: [&str; 4] = ["device_store_uuid", "prefix", "last_library_uuid", "location_code"];

/// C `ctime` layout, e.g. `Wed Apr  1 01:02:03 2020`.
const CTIME: &[BorrowedFormatItem<'_>] = format_description!(
    "[weekday repr:short] [month repr:short] [day padding:space] [hour]:[minute]:[second] [year]"
);

/// Read the device's info file from the mount point, if present.
pub fn read_device_info(prefix: &Path) -> Result<Option<String>> {
    let path = prefix.join(DEVICE_INFO_FILE);
    if !path.is_file() {
        tracing::warn!(path = %path.display(), "Calibre details file does not exist");
        return Ok(None);
    }
    tracing::debug!(path = %path.display(), "Calibre details file");
    std::fs::read_to_string(&path).map(Some).or_raise(|| ErrorKind::Transformation)
}

/// Build the record from the device info (if any) and the driver details.
///
/// Private keys missing from the device info are ignored. Device info that
/// is not a JSON object is a transformation failure.
pub fn build_record(
    existing: Option<&str>,
    version: &str,
    options: &str,
    now: UtcDateTime,
) -> Result<Map<String, Value>> {
    let mut record = match existing {
        Some(text) => serde_json::from_str::<Value>(text)
            .or_raise(|| ErrorKind::Transformation)?
            .as_object()
            .cloned()
            .ok_or_raise(|| ErrorKind::Transformation)?,
        None => Map::new(),
    };
    for key in PRIVATE_KEYS {
        record.remove(key);
    }
    record.insert(VERSION_KEY.to_string(), Value::String(version.to_string()));
    record.insert(OPTIONS_KEY.to_string(), Value::String(options.to_string()));
    record.insert(TIME_KEY.to_string(), Value::String(now.format(CTIME).or_raise(|| ErrorKind::Transformation)?));
    Ok(record)
}

/// Embed the record into the container as [`RECORD_NAME`].
#[instrument(skip_all)]
pub fn inject(container: &mut Container, record: &Map<String, Value>) -> Result<()> {
    let mut tmp = tempfile::Builder::new()
        .prefix("kte-driverinfo")
        .suffix(".json")
        .tempfile()
        .or_raise(|| ErrorKind::Transformation)?;
    let body = serde_json::to_vec(record).or_raise(|| ErrorKind::Transformation)?;
    tmp.write_all(&body).or_raise(|| ErrorKind::Transformation)?;
    tmp.flush().or_raise(|| ErrorKind::Transformation)?;
    tracing::debug!(path = %tmp.path().display(), "Driver data file");
    container
        .copy_file_into_container(tmp.path(), RECORD_NAME, RECORD_MEDIA_TYPE)
        .or_raise(|| ErrorKind::Transformation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kte_container::fixture::EpubBuilder;
    use rstest::rstest;
    use tempfile::TempDir;
    use time::macros::utc_datetime;

    const NOW: UtcDateTime = utc_datetime!(2020-04-01 01:02:03);

    #[test]
    fn strips_private_keys_and_keeps_the_rest() {
        let existing = r#"{"device_store_uuid":"x","prefix":"/mnt","last_library_uuid":"y",
            "location_code":"main","foo":1}"#;
        let record = build_record(Some(existing), "3.0.0", "[true]", NOW).unwrap();
        for key in PRIVATE_KEYS {
            assert!(!record.contains_key(key), "{key} should be removed");
        }
        assert_eq!(record["foo"], Value::from(1));
        assert_eq!(record[VERSION_KEY], Value::from("3.0.0"));
        assert_eq!(record[OPTIONS_KEY], Value::from("[true]"));
        assert_eq!(record[TIME_KEY], Value::from("Wed Apr  1 01:02:03 2020"));
    }

    #[test]
    fn missing_private_keys_are_tolerated() {
        let record = build_record(Some(r#"{"foo":"bar"}"#), "3.0.0", "[]", NOW).unwrap();
        assert_eq!(record.len(), 4);
        assert_eq!(record["foo"], Value::from("bar"));
    }

    #[test]
    fn no_device_info_starts_empty() {
        let record = build_record(None, "3.0.0", "[]", NOW).unwrap();
        assert_eq!(record.len(), 3);
    }

    #[rstest]
    #[case("not json")]
    #[case("[1, 2]")]
    fn bad_device_info_is_a_transformation_failure(#[case] existing: &str) {
        let err = build_record(Some(existing), "3.0.0", "[]", NOW).unwrap_err();
        assert_eq!(*err, ErrorKind::Transformation);
    }

    #[test]
    fn double_digit_days_are_not_padded() {
        let record = build_record(None, "3.0.0", "[]", utc_datetime!(2023-12-25 23:59:00)).unwrap();
        assert_eq!(record[TIME_KEY], Value::from("Mon Dec 25 23:59:00 2023"));
    }

    #[test]
    fn reads_device_info_when_present() {
        let dir = TempDir::new().unwrap();
        assert_eq!(read_device_info(dir.path()).unwrap(), None);
        std::fs::write(dir.path().join(DEVICE_INFO_FILE), "{}").unwrap();
        assert_eq!(read_device_info(dir.path()).unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn injects_record_into_container() {
        let dir = TempDir::new().unwrap();
        let path = EpubBuilder::new().write_to(&dir.path().join("a.epub"));
        let mut container = Container::load(&path).unwrap();
        let record = build_record(None, "3.0.0", "[]", NOW).unwrap();
        inject(&mut container, &record).unwrap();
        let stored: Value = serde_json::from_slice(container.read(RECORD_NAME).unwrap()).unwrap();
        assert_eq!(stored, Value::Object(record));
    }
}
