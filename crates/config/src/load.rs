use crate::error::{ErrorKind, Result};
use crate::legacy::migrate;
use crate::Settings;
use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Prefix for environment variable overrides, e.g. `KTE_SKIP_FAILED=true`.
pub const ENV_PREFIX: &str = "KTE_";

/// Default configuration directory. Device style sheets are looked up here.
pub fn config_dir() -> Result<PathBuf> {
    ProjectDirs::from("ca", "jgoguen", "kobotouch-extended")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_raise(|| ErrorKind::NoConfigDir)
}

/// Default settings file inside [`config_dir`].
pub fn default_settings_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("settings.toml"))
}

/// Layered configuration sources: defaults, then the settings file (if it
/// exists), then environment variables.
pub fn figment(path: Option<&Path>) -> Result<Figment> {
    let mut figment = Figment::from(Serialized::defaults(Settings::default()));
    if let Some(path) = path {
        figment = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => figment.merge(Toml::file(path)),
            Some("json") => figment.merge(Json::file(path)),
            _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
        };
    }
    Ok(figment.merge(Env::prefixed(ENV_PREFIX)))
}

/// Load settings and migrate any legacy positional values they carry.
#[instrument(skip_all, fields(path = ?path))]
pub fn load(path: Option<&Path>) -> Result<Settings> {
    let settings: Settings = figment(path)?.extract().or_raise(|| ErrorKind::Invalid)?;
    let migration = migrate(&settings, &settings.extra_customization);
    let mut settings = migration.settings;
    settings.extra_customization = migration.remaining;
    tracing::debug!(?settings, "Driver settings loaded");
    Ok(settings)
}
