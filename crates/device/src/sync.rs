//! Per-session device preparation, run once before books are uploaded.

use crate::conf::IniDocument;
use crate::error::{ErrorKind, Result};
use crate::model::DeviceModel;
use exn::ResultExt;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Name of the extra style sheet on the device.
pub const KOBO_EXTRA_CSSFILE: &str = "kobo_extra.css";
pub const FEATURE_SETTINGS: &str = "FeatureSettings";
pub const FULL_BOOK_PAGE_NUMBERS: &str = "FullBookPageNumbers";

/// Location of the firmware's configuration file under the mount point.
pub fn ereader_conf_path(prefix: &Path) -> PathBuf {
    prefix.join(".kobo").join("Kobo").join("Kobo eReader.conf")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncOptions {
    /// Stage the model's style sheet.
    pub modify_css: bool,
    pub full_page_numbers: bool,
}

/// What [`sync`] changed on the device.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncReport {
    /// Style sheet copied onto the device, if any.
    pub stylesheet: Option<PathBuf>,
    /// Whether the eReader configuration was rewritten.
    pub config_updated: bool,
}

/// Stage the model's style sheet and record the page-number preference in
/// the device configuration.
///
/// A missing style sheet or configuration file is logged and skipped.
#[instrument(skip_all, fields(prefix = %prefix.display(), %model))]
pub fn sync(prefix: &Path, model: DeviceModel, config_dir: &Path, options: SyncOptions) -> Result<SyncReport> {
    let mut report = SyncReport::default();
    if options.modify_css {
        report.stylesheet = stage_stylesheet(prefix, model, config_dir)?;
    }
    report.config_updated = set_full_page_numbers(&ereader_conf_path(prefix), options.full_page_numbers)?;
    Ok(report)
}

fn stage_stylesheet(prefix: &Path, model: DeviceModel, config_dir: &Path) -> Result<Option<PathBuf>> {
    tracing::info!("Searching for device-specific CSS file");
    let source = config_dir.join(model.stylesheet());
    if !source.is_file() {
        tracing::info!(expected = %source.display(), "No device-specific CSS file found");
        return Ok(None);
    }
    tracing::info!(path = %source.display(), "Found device-specific file");
    let target = prefix.join(KOBO_EXTRA_CSSFILE);
    std::fs::copy(&source, &target).or_raise(|| ErrorKind::Stylesheet(source.clone()))?;
    Ok(Some(target))
}

fn set_full_page_numbers(path: &Path, enabled: bool) -> Result<bool> {
    if !path.is_file() {
        tracing::debug!(path = %path.display(), "No eReader configuration on device");
        return Ok(false);
    }
    let failed = || ErrorKind::Config(path.to_path_buf());
    let mut doc = IniDocument::parse(&std::fs::read_to_string(path).or_raise(failed)?);
    let value = if enabled { "true" } else { "false" };
    tracing::info!(value, "Setting FeatureSettings.FullBookPageNumbers");
    doc.set(FEATURE_SETTINGS, FULL_BOOK_PAGE_NUMBERS, value);
    std::fs::write(path, doc.to_string()).or_raise(failed)?;
    Ok(true)
}
