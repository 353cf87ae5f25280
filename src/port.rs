// Persistence port and the key-value storage it writes through

use crate::error::StoreError;
use crate::task::Task;
use eyre::{Context, Result};
use std::collections::HashMap;
use tracing::debug;

/// Key the task array is stored under unless configured otherwise
pub const DEFAULT_KEY: &str = "tasks";

/// Storage abstraction the store reads from and writes to
///
/// The store owns the task list; a port only mirrors it.
pub trait PersistencePort {
    /// Read the whole task list. `Ok(None)` means nothing is stored yet.
    fn read_all(&self) -> Result<Option<Vec<Task>>, StoreError>;

    /// Replace the stored task list
    fn write_all(&mut self, tasks: &[Task]) -> Result<(), StoreError>;
}

impl<P: PersistencePort + ?Sized> PersistencePort for Box<P> {
    fn read_all(&self) -> Result<Option<Vec<Task>>, StoreError> {
        (**self).read_all()
    }

    fn write_all(&mut self, tasks: &[Task]) -> Result<(), StoreError> {
        (**self).write_all(tasks)
    }
}

/// String key-value storage (the browser local-storage analogue)
pub trait KeyValueStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    fn set_item(&mut self, key: &str, value: &str) -> Result<()>;

    fn remove_item(&mut self, key: &str) -> Result<()>;
}

/// Persistence port that stores the task list as a JSON array under one key
#[derive(Debug)]
pub struct StoragePort<S> {
    storage: S,
    key: String,
}

impl<S: KeyValueStorage> StoragePort<S> {
    pub fn new(storage: S) -> Self {
        Self::with_key(storage, DEFAULT_KEY)
    }

    pub fn with_key(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}

impl<S: KeyValueStorage> PersistencePort for StoragePort<S> {
    fn read_all(&self) -> Result<Option<Vec<Task>>, StoreError> {
        let raw = self
            .storage
            .get_item(&self.key)
            .wrap_err_with(|| format!("Failed to read key {:?}", self.key))
            .map_err(StoreError::read)?;

        let Some(raw) = raw else {
            debug!(key = %self.key, "No tasks stored");
            return Ok(None);
        };

        // A stored `null` counts as nothing stored
        let tasks: Option<Vec<Task>> = serde_json::from_str(&raw)
            .wrap_err_with(|| format!("Failed to decode tasks stored under {:?}", self.key))
            .map_err(StoreError::read)?;

        debug!(key = %self.key, count = tasks.as_ref().map_or(0, Vec::len), "Read stored tasks");
        Ok(tasks)
    }

    fn write_all(&mut self, tasks: &[Task]) -> Result<(), StoreError> {
        let json = serde_json::to_string(tasks)
            .context("Failed to encode tasks")
            .map_err(StoreError::write)?;

        self.storage
            .set_item(&self.key, &json)
            .wrap_err_with(|| format!("Failed to write key {:?}", self.key))
            .map_err(StoreError::write)?;

        debug!(key = %self.key, count = tasks.len(), "Wrote tasks");
        Ok(())
    }
}

/// In-memory key-value storage
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-seeded with one item
    pub fn with_item(key: &str, value: &str) -> Self {
        let mut storage = Self::new();
        storage.items.insert(key.to_string(), value.to_string());
        storage
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        self.items.remove(key);
        Ok(())
    }
}
