//! Kobo device upkeep.
//!
//! [`sync`] prepares the mounted device once per session: it stages the
//! model's style sheet and records preferences in the firmware's
//! configuration. After books are transferred, [`reconcile`] backfills the
//! `ImageId` column of the device's content database.

mod conf;
mod db;
pub mod error;
mod imageid;
mod model;
mod sync;

pub use crate::conf::IniDocument;
pub use crate::db::{DeviceDatabase, device_database_path};
pub use crate::imageid::{BATCH_SIZE, CONTENT_TYPE_BOOK, DeviceBook, Report, image_id, reconcile};
pub use crate::model::{DeviceModel, GENERIC_STYLESHEET};
pub use crate::sync::{
    FEATURE_SETTINGS, FULL_BOOK_PAGE_NUMBERS, KOBO_EXTRA_CSSFILE, SyncOptions, SyncReport, ereader_conf_path, sync,
};
