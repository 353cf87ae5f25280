//! Example 01: Basic CRUD Operations
//!
//! Create, read, update and delete tasks through a file-backed store, then
//! reopen the store to show the list survived.
//!
//! Run with: cargo run --example 01_basic_crud

use eyre::Result;
use tasklist::{FileStorage, ListView, StoragePort, TaskDraft, TaskState, TaskStore};

fn main() -> Result<()> {
    // Create a temporary directory for this example
    let temp_dir = tempfile::tempdir()?;
    let data_dir = temp_dir.path().to_path_buf();

    println!("tasklist Basic CRUD Example");
    println!("===========================\n");
    println!("Data dir: {}\n", data_dir.display());

    let mut store = TaskStore::open(StoragePort::new(FileStorage::open(&data_dir)?));
    println!("Store opened with {} tasks.\n", store.len());

    // CREATE
    println!("1. CREATE - Adding a task...");
    let id = store.create(
        TaskDraft::new("Write the quarterly report")
            .summary("Numbers from finance first")
            .deadline("2024-05-01"),
    )?;
    println!("   Created task with ID: {}\n", id);

    // READ
    println!("2. READ - Retrieving the task...");
    match store.get(&id) {
        Some(task) => {
            println!("   - Title: {}", task.title);
            println!("   - Summary: {}", task.summary);
            println!("   - State: {}", task.state.label());
            println!("   - Deadline: {}", task.deadline.as_deref().unwrap_or("none"));
        }
        None => println!("   Task not found!"),
    }
    println!();

    // UPDATE (whole-record replace)
    println!("3. UPDATE - Marking it in progress...");
    store.update(
        &id,
        TaskDraft::new("Write the quarterly report")
            .summary("Numbers from finance first")
            .state(TaskState::DoingNow)
            .deadline("2024-05-01"),
    )?;
    if let Some(task) = store.get(&id) {
        println!("   New state: {}\n", task.state.label());
    }

    // Reopen to show persistence
    println!("4. REOPEN - Loading from disk...");
    drop(store);
    let mut store = TaskStore::open(StoragePort::new(FileStorage::open(&data_dir)?));
    for task in store.list(&ListView::all()) {
        println!("   - {} : {} ({})", task.id, task.title, task.state.label());
    }
    println!();

    // DELETE
    println!("5. DELETE - Removing the task...");
    store.delete(&id)?;
    println!("   Task exists = {}\n", store.get(&id).is_some());

    println!("Example complete!");
    Ok(())
}
