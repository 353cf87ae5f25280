// JSON-file key-value storage

use crate::port::KeyValueStorage;
use eyre::{Context, Result, eyre};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Key-value storage keeping each key in `<dir>/<key>.json`
///
/// Writes go to a temp file renamed over the target while holding an
/// exclusive lock on `<key>.lock`; reads hold a shared lock on the same file.
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Open storage rooted at `path`, creating the directory if needed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).context("Failed to create storage directory")?;
        info!(path = ?base_path, "Opened file storage");
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Path of the data file for a key
    pub fn item_path(&self, key: &str) -> Result<PathBuf> {
        Self::validate_key(key)?;
        Ok(self.base_path.join(format!("{}.json", key)))
    }

    fn lock_file(&self, key: &str) -> Result<File> {
        let path = self.base_path.join(format!("{}.lock", key));
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .wrap_err_with(|| format!("Failed to open lock file {:?}", path))
    }

    /// Write `value` to `tmp_path`, then rename it over `path`
    fn write_replace(tmp_path: &Path, path: &Path, value: &str) -> Result<()> {
        let mut tmp = File::create(tmp_path).wrap_err_with(|| format!("Failed to create {:?}", tmp_path))?;
        tmp.write_all(value.as_bytes())?;
        tmp.sync_all()?;
        drop(tmp);

        fs::rename(tmp_path, path).wrap_err_with(|| format!("Failed to replace {:?}", path))?;
        Ok(())
    }

    fn validate_key(key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(eyre!("Storage key cannot be empty"));
        }
        if key.len() > 64 {
            return Err(eyre!("Storage key too long: {} (max 64 chars)", key));
        }
        if !key.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
            return Err(eyre!("Invalid storage key: {} (must be alphanumeric with _/-)", key));
        }
        Ok(())
    }
}

impl KeyValueStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let path = self.item_path(key)?;
        let lock = self.lock_file(key)?;
        FileExt::lock_shared(&lock).context("Failed to acquire shared lock")?;

        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).wrap_err_with(|| format!("Failed to read {:?}", path))?;
        debug!(file = ?path, bytes = content.len(), "Read item");
        // Lock is released when `lock` is dropped
        Ok(Some(content))
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.item_path(key)?;
        let lock = self.lock_file(key)?;
        lock.lock_exclusive().context("Failed to acquire file lock")?;

        let tmp_path = self.base_path.join(format!("{}.json.tmp", key));
        if let Err(e) = Self::write_replace(&tmp_path, &path, value) {
            if tmp_path.exists() {
                if let Err(cleanup) = fs::remove_file(&tmp_path) {
                    warn!(file = ?tmp_path, error = ?cleanup, "Failed to remove temp file");
                }
            }
            return Err(e);
        }

        debug!(file = ?path, bytes = value.len(), "Wrote item");
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        let path = self.item_path(key)?;
        let lock = self.lock_file(key)?;
        lock.lock_exclusive().context("Failed to acquire file lock")?;

        if path.exists() {
            fs::remove_file(&path).wrap_err_with(|| format!("Failed to remove {:?}", path))?;
        }
        Ok(())
    }
}
