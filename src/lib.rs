// tasklist - Task list store with pluggable key-value persistence

pub mod config;
pub mod error;
pub mod file;
pub mod port;
pub mod sqlite;
pub mod store;
pub mod task;
pub mod view;

// Re-export main types for convenience
pub use config::{Backend, Config};
pub use error::StoreError;
pub use file::FileStorage;
pub use port::{DEFAULT_KEY, KeyValueStorage, MemoryStorage, PersistencePort, StoragePort};
pub use sqlite::SqliteStorage;
pub use store::TaskStore;
pub use task::{Task, TaskDraft, TaskId, TaskState};
pub use view::{ListView, SortBy, next_filter};
