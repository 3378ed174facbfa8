//! Settings for the Kobo extended driver.
//!
//! [`Settings`] is the structured record every other crate reads from. It is
//! assembled by [`load`] from layered [figment] sources, after which any
//! positional values from an older schema are folded in by [`migrate`].

pub mod error;
mod legacy;
mod load;
mod settings;

pub use crate::legacy::{LEGACY_SLOTS, Migration, migrate};
pub use crate::load::{ENV_PREFIX, config_dir, default_settings_path, figment, load};
pub use crate::settings::{DEFAULT_COPY_TEMPLATE, PolicyFlags, Settings};
