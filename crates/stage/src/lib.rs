//! Per-book staging for Kobo devices.
//!
//! For every book sent to the device, [`decide`] classifies it, [`run`]
//! converts it to a kepub when the gate allows, and [`FilenameResolver`]
//! computes the name it will carry on the device. A [`SkipSet`] threads
//! through all three, collecting books whose name must stay unchanged.

mod driverinfo;
pub mod error;
mod gate;
mod invoke;
mod models;
mod rename;
mod skip;
mod template;
mod transform;

pub use crate::driverinfo::{
    DEVICE_INFO_FILE, OPTIONS_KEY, RECORD_MEDIA_TYPE, RECORD_NAME, TIME_KEY, VERSION_KEY, build_record, inject,
    read_device_info,
};
pub use crate::gate::{Decision, decide};
pub use crate::invoke::{Invocation, run};
pub use crate::models::{Book, BookJob, Outcome};
pub use crate::rename::{EPUB_EXT, FilenameResolver, KEPUB_EXT, sanitize_components};
pub use crate::skip::SkipSet;
pub use crate::template::CopyPathGenerator;
pub use crate::transform::{TransformOptions, Transformer};
