//! Connection to the device's content database.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Database file under the device mount point.
pub fn device_database_path(prefix: &Path) -> PathBuf {
    prefix.join(".kobo").join("KoboReader.sqlite")
}

/// The device's `KoboReader.sqlite`, opened for one reconciliation pass.
///
/// The schema belongs to the firmware: nothing is created or migrated, and
/// journal settings are left as the device has them.
#[derive(Debug, Clone)]
pub struct DeviceDatabase {
    pool: SqlitePool,
}

impl DeviceDatabase {
    async fn new(options: SqliteConnectOptions) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            // All work is sequential; one connection also keeps an in-memory
            // database from splitting into several.
            .max_connections(1)
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(Self { pool })
    }

    /// Open an existing database file.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(false)
            // The firmware may still hold the file briefly after mounting.
            .busy_timeout(std::time::Duration::from_millis(1500));
        Self::new(options).await
    }

    /// Connect to an empty in-memory database.
    ///
    /// Do NOT apply `#[cfg(test)]` so that other crates can also use this in their tests.
    pub async fn connect_in_memory() -> Result<Self> {
        Self::new(SqliteConnectOptions::new().filename(":memory:")).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool, waiting for the connection to be returned.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
