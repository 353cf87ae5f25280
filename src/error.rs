// Error taxonomy for the task list store

use crate::task::TaskId;
use thiserror::Error;

/// Errors surfaced by [`crate::TaskStore`] and its persistence port
#[derive(Debug, Error)]
pub enum StoreError {
    /// Draft rejected (empty title, malformed deadline)
    #[error("invalid task: {0}")]
    Validation(String),

    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// Stored data was missing, unreadable or corrupt.
    ///
    /// Returned by `load()` after the store has already fallen back to an
    /// empty list, so the store is still usable.
    #[error("failed to read persisted tasks: {0}")]
    PersistenceRead(String),

    /// The write failed; the in-memory list is still authoritative
    ///
    /// `id` names the task whose mutation triggered the write, so the caller
    /// can retry by id (`create_with_id`, `update`, `delete`).
    #[error("failed to write persisted tasks: {message}")]
    PersistenceWrite { id: Option<TaskId>, message: String },
}

impl StoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        StoreError::Validation(msg.into())
    }

    /// Build a read error from an eyre report, keeping the context chain
    pub fn read(report: eyre::Report) -> Self {
        StoreError::PersistenceRead(format!("{:#}", report))
    }

    /// Build a write error from an eyre report, keeping the context chain
    pub fn write(report: eyre::Report) -> Self {
        StoreError::PersistenceWrite {
            id: None,
            message: format!("{:#}", report),
        }
    }

    /// Attach the id of the task being mutated to a write error
    pub fn with_task_id(self, task_id: TaskId) -> Self {
        match self {
            StoreError::PersistenceWrite { message, .. } => StoreError::PersistenceWrite {
                id: Some(task_id),
                message,
            },
            other => other,
        }
    }

    /// Id of the task whose write failed, if known
    pub fn task_id(&self) -> Option<&TaskId> {
        match self {
            StoreError::PersistenceWrite { id, .. } => id.as_ref(),
            StoreError::NotFound(id) => Some(id),
            _ => None,
        }
    }

    /// True for errors the store recovers from locally
    pub fn is_recoverable(&self) -> bool {
        matches!(self, StoreError::PersistenceRead(_))
    }
}
