//! Example 02: Filtering and Sorting
//!
//! Projections over the task list: filter by state, put one state first,
//! order by deadline, and cycle through filter modes. None of these change
//! the stored order.
//!
//! Run with: cargo run --example 02_filtering

use eyre::Result;
use tasklist::{ListView, MemoryStorage, SortBy, StoragePort, Task, TaskDraft, TaskState, TaskStore, next_filter};

fn print(label: &str, tasks: &[Task]) {
    println!("{}:", label);
    for task in tasks {
        println!(
            "  - {:<22} {:<16} {}",
            task.title,
            task.state.label(),
            task.deadline.as_deref().unwrap_or("-")
        );
    }
    println!();
}

fn main() -> Result<()> {
    println!("tasklist Filtering Example");
    println!("==========================\n");

    let mut store = TaskStore::new(StoragePort::new(MemoryStorage::new()));

    store.create(TaskDraft::new("Write documentation").deadline("2024-06-01"))?;
    store.create(
        TaskDraft::new("Fix critical bug")
            .state(TaskState::DoingNow)
            .deadline("2024-04-15"),
    )?;
    store.create(TaskDraft::new("Code review").state(TaskState::Done))?;
    store.create(
        TaskDraft::new("Update tests")
            .state(TaskState::Done)
            .deadline("2024-03-01"),
    )?;
    store.create(TaskDraft::new("Deploy to staging"))?;

    print("1. Stored order", &store.list(&ListView::all()));
    print(
        "2. Filter: Done",
        &store.list(&ListView::all().filter(TaskState::Done)),
    );
    print(
        "3. Sort: Doing right now first",
        &store.list(&ListView::all().sort(SortBy::StatePriority(TaskState::DoingNow))),
    );
    print(
        "4. Sort: deadline (undated last)",
        &store.list(&ListView::all().sort(SortBy::Deadline)),
    );
    print(
        "5. Filter NotDone, then sort by deadline",
        &store.list(&ListView::all().filter(TaskState::NotDone).sort(SortBy::Deadline)),
    );

    println!("6. Cycling filter modes:");
    let mut mode = None;
    for _ in 0..4 {
        mode = next_filter(mode);
        let count = store
            .list(&ListView {
                filter_state: mode,
                ..ListView::all()
            })
            .len();
        let name = mode.map_or("All", TaskState::label);
        println!("   Filter: {:<16} -> {} tasks", name, count);
    }
    println!();

    println!("Example complete!");
    Ok(())
}
