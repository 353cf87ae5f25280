// Configuration loading and backend selection

use crate::file::FileStorage;
use crate::port::{DEFAULT_KEY, PersistencePort, StoragePort};
use crate::sqlite::SqliteStorage;
use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name of the SQLite database inside the data directory
pub const SQLITE_FILE: &str = "tasklist.db";

/// Which key-value storage holds the task list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// One JSON file per key in the data directory
    #[default]
    File,
    /// A `storage` table in `<data_dir>/tasklist.db`
    Sqlite,
}

/// tasklist configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: Backend,

    /// Where data lives; defaults to the platform data directory
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Storage key the task array is kept under
    #[serde(default = "default_key")]
    pub key: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            data_dir: None,
            key: default_key(),
        }
    }
}

fn default_key() -> String {
    DEFAULT_KEY.to_string()
}

impl Config {
    /// Default config file location: `<config_dir>/tasklist/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("tasklist").join("config.yaml"))
    }

    /// Load configuration
    ///
    /// An explicit path must exist. Without one the default location is
    /// tried, and a missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => {
                    debug!("No config file, using defaults");
                    Self::default()
                }
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).wrap_err_with(|| format!("Failed to read config file {:?}", path))?;
        let config: Config =
            serde_yaml::from_str(&content).wrap_err_with(|| format!("Failed to parse config file {:?}", path))?;
        info!(path = ?path, backend = ?config.backend, "Loaded config");
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.key.trim().is_empty() {
            return Err(eyre!("Config key cannot be empty"));
        }
        Ok(())
    }

    /// Resolved data directory
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join("tasklist")))
            .unwrap_or_else(|| PathBuf::from(".tasklist"))
    }

    /// Open the configured backend as a persistence port
    pub fn open_port(&self) -> Result<Box<dyn PersistencePort>> {
        let dir = self.data_dir();
        let port: Box<dyn PersistencePort> = match self.backend {
            Backend::File => Box::new(StoragePort::with_key(FileStorage::open(&dir)?, self.key.clone())),
            Backend::Sqlite => Box::new(StoragePort::with_key(
                SqliteStorage::open(dir.join(SQLITE_FILE))?,
                self.key.clone(),
            )),
        };
        Ok(port)
    }
}
