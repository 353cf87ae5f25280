// Task list store: the single authoritative list plus its persistence port

use crate::error::StoreError;
use crate::port::PersistencePort;
use crate::task::{Task, TaskDraft, TaskId};
use crate::view::ListView;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Owns the task list and mirrors every mutation to a [`PersistencePort`]
///
/// Mutations persist the full list before returning. When that write fails
/// the change stays applied in memory, the store is marked dirty, and the
/// write error is returned carrying the task id; any later successful write
/// (a mutation or [`TaskStore::persist`]) brings storage back in sync.
///
/// Retrying the failed operation by id is idempotent: `create_with_id` with
/// the same id replaces rather than appends, `update` rewrites the same
/// record, and `delete` of a task whose removal has not reached storage yet
/// writes again instead of reporting `NotFound`.
pub struct TaskStore<P: PersistencePort> {
    tasks: Vec<Task>,
    port: P,
    dirty: bool,
    /// Deleted in memory, but the write removing them failed
    pending_deletes: HashSet<TaskId>,
}

impl<P: PersistencePort> TaskStore<P> {
    /// Create an empty store; call [`TaskStore::load`] to read stored tasks
    pub fn new(port: P) -> Self {
        Self {
            tasks: Vec::new(),
            port,
            dirty: false,
            pending_deletes: HashSet::new(),
        }
    }

    /// Create a store and load whatever the port holds
    ///
    /// A read failure is logged and the store starts empty.
    pub fn open(port: P) -> Self {
        let mut store = Self::new(port);
        // load() already logged the failure and reset the list
        let _ = store.load();
        store
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    pub fn into_port(self) -> P {
        self.port
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// True when the last write failed and storage is behind memory
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Validate the draft, append it with a fresh id, and persist
    pub fn create(&mut self, draft: TaskDraft) -> Result<TaskId, StoreError> {
        self.create_with_id(TaskId::new(), draft)
    }

    /// Create under a caller-chosen id
    ///
    /// If the id already exists the call is a retry of an earlier create: the
    /// record is replaced in place instead of appended, so repeating it after
    /// a failed write does not duplicate the task.
    pub fn create_with_id(&mut self, id: TaskId, draft: TaskDraft) -> Result<TaskId, StoreError> {
        if id.is_blank() {
            return Err(StoreError::validation("task id cannot be blank"));
        }
        let task = draft.into_task(id.clone())?;

        match self.position(&id) {
            Some(pos) => {
                self.tasks[pos] = task;
                info!(id = %id, position = pos, "Replaced task");
            }
            None => {
                self.tasks.push(task);
                self.pending_deletes.remove(&id);
                info!(id = %id, count = self.tasks.len(), "Created task");
            }
        }

        self.persist().map_err(|e| e.with_task_id(id.clone()))?;
        Ok(id)
    }

    /// Replace the whole record at `id`, keeping its position
    pub fn update(&mut self, id: &TaskId, draft: TaskDraft) -> Result<(), StoreError> {
        let pos = self.position(id).ok_or_else(|| StoreError::NotFound(id.clone()))?;
        self.tasks[pos] = draft.into_task(id.clone())?;

        info!(id = %id, position = pos, "Updated task");
        self.persist().map_err(|e| e.with_task_id(id.clone()))
    }

    /// Remove the task at `id`; an unknown id is a `NotFound` error
    ///
    /// If an earlier delete of `id` failed to write, calling this again
    /// retries the write. Once a write has succeeded the id is gone from
    /// storage too and a further delete reports `NotFound`.
    pub fn delete(&mut self, id: &TaskId) -> Result<(), StoreError> {
        let Some(pos) = self.position(id) else {
            if self.pending_deletes.contains(id) {
                debug!(id = %id, "delete: retrying write of earlier delete");
                return self.persist().map_err(|e| e.with_task_id(id.clone()));
            }
            return Err(StoreError::NotFound(id.clone()));
        };
        self.tasks.remove(pos);
        info!(id = %id, count = self.tasks.len(), "Deleted task");

        if let Err(e) = self.persist() {
            self.pending_deletes.insert(id.clone());
            return Err(e.with_task_id(id.clone()));
        }
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Filtered and/or sorted copy of the list; stored order is untouched
    pub fn list(&self, view: &ListView) -> Vec<Task> {
        view.project(&self.tasks)
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Replace the in-memory list with the port's contents
    ///
    /// Returns the number of tasks loaded. Nothing stored loads as an empty
    /// list. Unreadable or corrupt data also leaves the store empty and
    /// usable, and the `PersistenceRead` error is returned for reporting.
    ///
    /// Loaded records are repaired: blank ids get fresh ids, records with a
    /// blank title are dropped, and for duplicate ids the first record wins.
    /// Repairs are written back so the assigned ids stay stable.
    pub fn load(&mut self) -> Result<usize, StoreError> {
        let stored = match self.port.read_all() {
            Ok(stored) => stored,
            Err(e) => {
                let e = if e.is_recoverable() {
                    e
                } else {
                    StoreError::PersistenceRead(e.to_string())
                };
                warn!(error = %e, "Stored tasks unreadable, starting with an empty list");
                self.tasks.clear();
                self.dirty = false;
                self.pending_deletes.clear();
                return Err(e);
            }
        };

        let Some(stored) = stored else {
            debug!("Nothing stored, starting with an empty list");
            self.tasks.clear();
            self.dirty = false;
            self.pending_deletes.clear();
            return Ok(0);
        };

        let (tasks, repaired) = Self::repair(stored);
        self.tasks = tasks;
        self.dirty = false;
        self.pending_deletes.clear();
        info!(count = self.tasks.len(), repaired, "Loaded tasks");

        if repaired > 0 {
            // Storage still holds the unrepaired data; a failed write only
            // leaves the store dirty
            if let Err(e) = self.persist() {
                warn!(error = %e, "Failed to write back repaired tasks");
            }
        }

        Ok(self.tasks.len())
    }

    /// Write the full list to the port
    pub fn persist(&mut self) -> Result<(), StoreError> {
        match self.port.write_all(&self.tasks) {
            Ok(()) => {
                self.dirty = false;
                self.pending_deletes.clear();
                Ok(())
            }
            Err(e) => {
                self.dirty = true;
                warn!(error = %e, count = self.tasks.len(), "Failed to persist tasks");
                Err(e)
            }
        }
    }

    fn position(&self, id: &TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| &t.id == id)
    }

    fn repair(stored: Vec<Task>) -> (Vec<Task>, usize) {
        let mut seen = HashSet::new();
        let mut tasks = Vec::with_capacity(stored.len());
        let mut repaired = 0;

        for mut task in stored {
            if task.title.trim().is_empty() {
                warn!(id = %task.id, "Dropping stored task with blank title");
                repaired += 1;
                continue;
            }
            if task.id.is_blank() {
                task.id = TaskId::new();
                debug!(id = %task.id, "Assigned id to stored task");
                repaired += 1;
            }
            if !seen.insert(task.id.clone()) {
                warn!(id = %task.id, "Dropping stored task with duplicate id");
                repaired += 1;
                continue;
            }
            tasks.push(task);
        }

        (tasks, repaired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::{DEFAULT_KEY, KeyValueStorage, MemoryStorage, StoragePort};
    use crate::task::TaskState;
    use crate::view::SortBy;

    type MemStore = TaskStore<StoragePort<MemoryStorage>>;

    fn mem_store() -> MemStore {
        TaskStore::new(StoragePort::new(MemoryStorage::new()))
    }

    fn stored_with(raw: &str) -> MemStore {
        TaskStore::new(StoragePort::new(MemoryStorage::with_item(DEFAULT_KEY, raw)))
    }

    fn raw_stored(store: &MemStore) -> Option<String> {
        store.port().storage().get_item(DEFAULT_KEY).unwrap()
    }

    fn titles(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.title.as_str()).collect()
    }

    /// Port whose writes can be switched off
    struct FlakyPort {
        inner: StoragePort<MemoryStorage>,
        fail_writes: bool,
        writes: usize,
    }

    impl FlakyPort {
        fn new() -> Self {
            Self {
                inner: StoragePort::new(MemoryStorage::new()),
                fail_writes: false,
                writes: 0,
            }
        }
    }

    impl PersistencePort for FlakyPort {
        fn read_all(&self) -> Result<Option<Vec<Task>>, StoreError> {
            self.inner.read_all()
        }

        fn write_all(&mut self, tasks: &[Task]) -> Result<(), StoreError> {
            self.writes += 1;
            if self.fail_writes {
                return Err(StoreError::write(eyre::eyre!("quota exceeded")));
            }
            self.inner.write_all(tasks)
        }
    }

    #[test]
    fn test_create_appends_and_persists() {
        let mut store = mem_store();
        let first = store.create(TaskDraft::new("First")).unwrap();
        let second = store
            .create(
                TaskDraft::new("Second")
                    .summary("more")
                    .state(TaskState::DoingNow)
                    .deadline("2024-05-01"),
            )
            .unwrap();

        let all = store.list(&ListView::all());
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, first);
        assert_eq!(all[1].id, second);
        assert_eq!(all[1].summary, "more");
        assert_eq!(all[1].state, TaskState::DoingNow);
        assert_eq!(all[1].deadline.as_deref(), Some("2024-05-01"));

        let raw = raw_stored(&store).unwrap();
        assert!(raw.contains(second.as_str()));
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_create_blank_title_leaves_list_unchanged() {
        let mut store = mem_store();
        store.create(TaskDraft::new("Keep")).unwrap();
        let before = store.list(&ListView::all());

        for title in ["", "   "] {
            let err = store.create(TaskDraft::new(title)).unwrap_err();
            assert!(matches!(err, StoreError::Validation(_)));
        }

        assert_eq!(store.list(&ListView::all()), before);
    }

    #[test]
    fn test_create_with_id_retry_does_not_duplicate() {
        let mut store = mem_store();
        let id = TaskId::from("fixed");
        store.create_with_id(id.clone(), TaskDraft::new("Once")).unwrap();
        store.create_with_id(id.clone(), TaskDraft::new("Once")).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&id).unwrap().title, "Once");

        let err = store.create_with_id(TaskId::from(" "), TaskDraft::new("x")).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn test_update_replaces_in_place() {
        let mut store = mem_store();
        store.create(TaskDraft::new("A")).unwrap();
        let b = store
            .create(TaskDraft::new("B").summary("old").deadline("2024-01-01"))
            .unwrap();
        store.create(TaskDraft::new("C")).unwrap();

        store
            .update(&b, TaskDraft::new("B2").state(TaskState::Done))
            .unwrap();

        let all = store.list(&ListView::all());
        assert_eq!(titles(&all), vec!["A", "B2", "C"]);
        // Whole-record replace: omitted fields fall back to defaults
        assert_eq!(all[1].id, b);
        assert_eq!(all[1].summary, "");
        assert_eq!(all[1].deadline, None);
        assert_eq!(all[1].state, TaskState::Done);
    }

    #[test]
    fn test_update_unknown_id() {
        let mut store = mem_store();
        store.create(TaskDraft::new("A")).unwrap();
        let err = store.update(&TaskId::from("missing"), TaskDraft::new("x")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(id) if id.as_str() == "missing"));
        assert_eq!(titles(&store.list(&ListView::all())), vec!["A"]);
    }

    #[test]
    fn test_update_invalid_draft_keeps_record() {
        let mut store = mem_store();
        let id = store.create(TaskDraft::new("A")).unwrap();
        assert!(store.update(&id, TaskDraft::new("  ")).is_err());
        assert_eq!(store.get(&id).unwrap().title, "A");
    }

    #[test]
    fn test_delete_keeps_relative_order() {
        let mut store = mem_store();
        store.create(TaskDraft::new("A")).unwrap();
        let b = store.create(TaskDraft::new("B")).unwrap();
        store.create(TaskDraft::new("C")).unwrap();
        store.create(TaskDraft::new("D")).unwrap();

        store.delete(&b).unwrap();
        assert_eq!(titles(&store.list(&ListView::all())), vec!["A", "C", "D"]);
        assert!(store.get(&b).is_none());

        let err = store.delete(&b).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_list_does_not_reorder_storage() {
        let mut store = mem_store();
        store.create(TaskDraft::new("A").state(TaskState::NotDone)).unwrap();
        store.create(TaskDraft::new("B").state(TaskState::Done)).unwrap();
        store.create(TaskDraft::new("C").state(TaskState::Done)).unwrap();
        store.create(TaskDraft::new("D").state(TaskState::DoingNow)).unwrap();

        let sorted = store.list(&ListView::all().sort(SortBy::StatePriority(TaskState::Done)));
        assert_eq!(titles(&sorted), vec!["B", "C", "A", "D"]);

        let done = store.list(&ListView::all().filter(TaskState::Done));
        assert_eq!(titles(&done), vec!["B", "C"]);

        assert_eq!(titles(&store.list(&ListView::all())), vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_mutation_by_id_after_sorted_view() {
        let mut store = mem_store();
        store.create(TaskDraft::new("Later").deadline("2025-01-01")).unwrap();
        store.create(TaskDraft::new("Sooner").deadline("2024-01-01")).unwrap();

        let view = store.list(&ListView::all().sort(SortBy::Deadline));
        let first_visible = view[0].id.clone();
        store.delete(&first_visible).unwrap();

        assert_eq!(titles(&store.list(&ListView::all())), vec!["Later"]);
    }

    #[test]
    fn test_load_round_trip() {
        let mut store = mem_store();
        store.create(TaskDraft::new("A").summary("s").deadline("2023-01-01")).unwrap();
        store.create(TaskDraft::new("B").state(TaskState::Done)).unwrap();
        let before = store.list(&ListView::all());

        let mut reloaded = TaskStore::new(store.into_port());
        assert_eq!(reloaded.load().unwrap(), 2);
        reloaded.persist().unwrap();
        assert_eq!(reloaded.load().unwrap(), 2);

        assert_eq!(reloaded.list(&ListView::all()), before);
    }

    #[test]
    fn test_load_nothing_stored() {
        let mut store = mem_store();
        assert_eq!(store.load().unwrap(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_corrupt_data_falls_back_to_empty() {
        let mut store = stored_with("{{{ definitely not json");

        let err = store.load().unwrap_err();
        assert!(matches!(err, StoreError::PersistenceRead(_)));
        assert!(err.is_recoverable());
        assert!(store.is_empty());

        // Still usable afterwards
        store.create(TaskDraft::new("fresh")).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_open_corrupt_data_starts_empty() {
        let store = TaskStore::open(StoragePort::new(MemoryStorage::with_item(
            DEFAULT_KEY,
            r#"[{"title":"x","state":"archived"}]"#,
        )));
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_legacy_records_assigns_stable_ids() {
        let mut store = stored_with(
            r#"[
                {"title":"Buy milk","summary":"","state":"Not done","deadline":""},
                {"title":"Ship it","state":["Doing right now"],"deadline":"2024-05-01"}
            ]"#,
        );

        assert_eq!(store.load().unwrap(), 2);
        let loaded = store.list(&ListView::all());
        assert_eq!(loaded[0].state, TaskState::NotDone);
        assert_eq!(loaded[1].state, TaskState::DoingNow);
        assert!(loaded.iter().all(|t| !t.id.is_blank()));

        // Repaired ids were written back, so a reload sees the same ids
        let raw = raw_stored(&store).unwrap();
        assert!(raw.contains(loaded[0].id.as_str()));
        assert!(raw.contains("\"state\":\"DoingNow\""));

        store.load().unwrap();
        assert_eq!(store.list(&ListView::all()), loaded);
    }

    #[test]
    fn test_load_drops_blank_titles_and_duplicate_ids() {
        let mut store = stored_with(
            r#"[
                {"id":"a","title":"First","state":"Done"},
                {"id":"b","title":"   ","state":"Done"},
                {"id":"a","title":"Dup","state":"Done"},
                {"id":"c","title":"Third","state":"NotDone"}
            ]"#,
        );

        assert_eq!(store.load().unwrap(), 2);
        assert_eq!(titles(&store.list(&ListView::all())), vec!["First", "Third"]);
    }

    #[test]
    fn test_failed_write_marks_dirty_until_next_success() {
        let mut store = TaskStore::new(FlakyPort::new());
        store.create(TaskDraft::new("A")).unwrap();

        store.port_mut().fail_writes = true;
        let err = store.create(TaskDraft::new("B")).unwrap_err();
        assert!(matches!(err, StoreError::PersistenceWrite { id: Some(_), .. }));
        assert!(store.is_dirty());
        // In-memory list stays authoritative
        assert_eq!(store.len(), 2);
        assert_eq!(store.port().read_all().unwrap().unwrap().len(), 1);

        store.port_mut().fail_writes = false;
        store.persist().unwrap();
        assert!(!store.is_dirty());
        assert_eq!(store.port().read_all().unwrap().unwrap().len(), 2);
    }

    #[test]
    fn test_every_mutation_writes() {
        let mut store = TaskStore::new(FlakyPort::new());
        let id = store.create(TaskDraft::new("A")).unwrap();
        store.update(&id, TaskDraft::new("A2")).unwrap();
        store.delete(&id).unwrap();
        assert_eq!(store.port().writes, 3);

        // Failed validation does not write
        let _ = store.create(TaskDraft::new(""));
        let _ = store.delete(&id);
        assert_eq!(store.port().writes, 3);
    }

    #[test]
    fn test_retry_create_by_id_after_failed_write() {
        let mut store = TaskStore::new(FlakyPort::new());
        store.port_mut().fail_writes = true;

        let draft = TaskDraft::new("A").summary("first try");
        let err = store.create(draft.clone()).unwrap_err();
        let id = err.task_id().cloned().unwrap();
        assert!(store.get(&id).is_some());

        store.port_mut().fail_writes = false;
        assert_eq!(store.create_with_id(id.clone(), draft).unwrap(), id);

        let named_a = store.list(&ListView::all()).iter().filter(|t| t.title == "A").count();
        assert_eq!(named_a, 1);
        assert!(!store.is_dirty());
        assert_eq!(store.port().read_all().unwrap().unwrap().len(), 1);
    }

    #[test]
    fn test_retry_update_after_failed_write() {
        let mut store = TaskStore::new(FlakyPort::new());
        let id = store.create(TaskDraft::new("A")).unwrap();

        store.port_mut().fail_writes = true;
        let err = store.update(&id, TaskDraft::new("A2")).unwrap_err();
        assert_eq!(err.task_id(), Some(&id));

        store.port_mut().fail_writes = false;
        store.update(&id, TaskDraft::new("A2")).unwrap();

        assert_eq!(store.len(), 1);
        assert!(!store.is_dirty());
        let stored = store.port().read_all().unwrap().unwrap();
        assert_eq!(stored[0].title, "A2");
        assert_eq!(stored[0].id, id);
    }

    #[test]
    fn test_retry_delete_after_failed_write() {
        let mut store = TaskStore::new(FlakyPort::new());
        let a = store.create(TaskDraft::new("A")).unwrap();
        store.create(TaskDraft::new("B")).unwrap();

        store.port_mut().fail_writes = true;
        let err = store.delete(&a).unwrap_err();
        assert!(matches!(err, StoreError::PersistenceWrite { .. }));
        assert_eq!(err.task_id(), Some(&a));
        assert_eq!(store.len(), 1);

        // Still failing: the retry writes again and fails again
        let err = store.delete(&a).unwrap_err();
        assert!(matches!(err, StoreError::PersistenceWrite { .. }));

        store.port_mut().fail_writes = false;
        store.delete(&a).unwrap();
        assert!(!store.is_dirty());
        assert_eq!(titles(&store.port().read_all().unwrap().unwrap()), vec!["B"]);

        // Storage has caught up, so the id is simply unknown now
        assert!(matches!(store.delete(&a), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_delete_unknown_id_while_dirty_is_not_found() {
        let mut store = TaskStore::new(FlakyPort::new());
        store.port_mut().fail_writes = true;
        let _ = store.create(TaskDraft::new("A"));
        assert!(store.is_dirty());

        let err = store.delete(&TaskId::from("never-existed")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
