//! Staging of e-books for Kobo e-readers.
//!
//! A [`Session`] covers one connection of a device. Before uploading,
//! [`Session::prepare_upload`] readies the device. Each book then passes
//! through [`Session::stage_book`], which converts EPUBs to kepubs in place,
//! and [`Session::device_filename`], which names it for the device. Once
//! the booklists are known, [`Session::sync_booklists`] backfills cover
//! image ids in the device database.

pub mod error;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use kte_config::Settings;
use kte_device::{DeviceBook, DeviceDatabase, DeviceModel, Report, SyncOptions, SyncReport};
use kte_stage::{BookJob, CopyPathGenerator, Decision, FilenameResolver, Invocation, Outcome, SkipSet, Transformer};
use std::path::{Path, PathBuf};
use tracing::instrument;

pub use kte_config as config;
pub use kte_container as container;
pub use kte_device as device;
pub use kte_stage as stage;

/// Driver version recorded in converted books.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// A mounted device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Mount point of the main memory.
    pub prefix: PathBuf,
    pub model: DeviceModel,
}

/// State for one device session.
pub struct Session {
    settings: Settings,
    device: Device,
    /// Where device style sheets are looked up.
    config_dir: PathBuf,
    transformer: Box<dyn Transformer>,
    copy_paths: CopyPathGenerator,
    skip: SkipSet,
}

impl Session {
    /// Start a session. Fails if the configured copy template does not
    /// compile.
    pub fn new(
        settings: Settings,
        device: Device,
        config_dir: impl Into<PathBuf>,
        transformer: Box<dyn Transformer>,
    ) -> Result<Self> {
        let copy_paths = settings.copy_template.parse::<CopyPathGenerator>().or_raise(|| ErrorKind::Settings)?;
        Ok(Self { settings, device, config_dir: config_dir.into(), transformer, copy_paths, skip: SkipSet::new() })
    }

    /// Start a session with settings loaded from `path` (or defaults and the
    /// environment), using the default configuration directory.
    pub fn load(path: Option<&Path>, device: Device, transformer: Box<dyn Transformer>) -> Result<Self> {
        let settings = kte_config::load(path).or_raise(|| ErrorKind::Settings)?;
        let config_dir = kte_config::config_dir().or_raise(|| ErrorKind::Settings)?;
        Self::new(settings, device, config_dir, transformer)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Books that keep their original name on the device.
    pub fn skip_set(&self) -> &SkipSet {
        &self.skip
    }

    pub fn modifying_css(&self) -> bool {
        self.settings.modify_css
    }

    /// Whether uploaded EPUBs may be modified at all.
    pub fn modifying_epub(&self) -> bool {
        let s = &self.settings;
        self.modifying_css()
            || s.clean_markup
            || s.extra_features
            || s.skip_failed
            || s.smarten_punctuation
            || s.disable_hyphenation
    }

    /// Ready the device for uploads. Run once per session.
    #[instrument(skip_all, fields(prefix = %self.device.prefix.display()))]
    pub fn prepare_upload(&self) -> Result<SyncReport> {
        let options =
            SyncOptions { modify_css: self.modifying_css(), full_page_numbers: self.settings.full_page_numbers };
        kte_device::sync(&self.device.prefix, self.device.model, &self.config_dir, options)
            .or_raise(|| ErrorKind::Device)
    }

    /// Stage one book for upload, converting it in place when possible.
    #[instrument(skip_all, fields(path = %job.source.display(), uuid = %job.book.uuid))]
    pub fn stage_book(&mut self, mut job: BookJob) -> Result<Outcome> {
        let policy = self.settings.policy();
        let decision = kte_stage::decide(&mut job, &policy, &mut self.skip).or_raise(|| ErrorKind::Stage)?;
        let outcome = match decision {
            Decision::SkipForeign | Decision::PassthroughEncumbered => Outcome::Passthrough,
            Decision::AbortEncumbered => Outcome::Aborted,
            Decision::Transform(container) => {
                let ctx = Invocation {
                    policy: &policy,
                    transformer: self.transformer.as_ref(),
                    version: VERSION,
                    prefix: &self.device.prefix,
                    copy_paths: &self.copy_paths,
                };
                kte_stage::run(&job, container, &ctx, &mut self.skip).or_raise(|| ErrorKind::Stage)?
            },
        };
        tracing::debug!(?outcome, "Book staged");
        Ok(outcome)
    }

    /// Name of the book `uuid` on the device, given its proposed `path`.
    pub fn device_filename(&self, path: &str, uuid: &str) -> String {
        FilenameResolver::new(self.settings.extra_features, &self.skip).resolve(path, uuid)
    }

    /// Backfill cover image ids for the listed books, when cover uploads are
    /// enabled. Returns `None` when disabled.
    #[instrument(skip_all)]
    pub async fn sync_booklists(&self, booklists: &[Vec<DeviceBook>]) -> Result<Option<Report>> {
        if !self.settings.upload_covers {
            return Ok(None);
        }
        tracing::info!("Setting ImageId fields");
        let path = kte_device::device_database_path(&self.device.prefix);
        let db = DeviceDatabase::connect(&path).await.or_raise(|| ErrorKind::Device)?;
        let report = kte_device::reconcile(&db, booklists).await;
        db.close().await;
        report.map(Some).or_raise(|| ErrorKind::Device)
    }
}
