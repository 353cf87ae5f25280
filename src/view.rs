// Read-only projections over the task list

use crate::task::{Task, TaskState};
use std::cmp::Ordering;

/// How a projection is ordered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortBy {
    /// Stored (insertion) order
    #[default]
    None,
    /// Tasks in the given state first, everything else after
    StatePriority(TaskState),
    /// Ascending by deadline; missing or unparseable deadlines last
    Deadline,
}

/// Parameters for [`crate::TaskStore::list`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListView {
    /// Only include tasks in this state
    pub filter_state: Option<TaskState>,
    pub sort: SortBy,
}

impl ListView {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn filter(mut self, state: TaskState) -> Self {
        self.filter_state = Some(state);
        self
    }

    pub fn sort(mut self, sort: SortBy) -> Self {
        self.sort = sort;
        self
    }

    /// Filter first, then stable-sort the survivors
    pub fn project<'a, I>(&self, tasks: I) -> Vec<Task>
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let mut out: Vec<Task> = tasks
            .into_iter()
            .filter(|t| self.filter_state.is_none_or(|state| t.state == state))
            .cloned()
            .collect();

        match self.sort {
            SortBy::None => {}
            SortBy::StatePriority(priority) => out.sort_by_key(|t| t.state != priority),
            SortBy::Deadline => out.sort_by(compare_deadlines),
        }

        out
    }
}

/// Total order on deadlines: dated tasks ascending, undated ones last
fn compare_deadlines(a: &Task, b: &Task) -> Ordering {
    match (a.deadline_date(), b.deadline_date()) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Next filter in the All -> Done -> DoingNow -> NotDone -> All cycle
pub fn next_filter(current: Option<TaskState>) -> Option<TaskState> {
    match current {
        None => Some(TaskState::Done),
        Some(TaskState::Done) => Some(TaskState::DoingNow),
        Some(TaskState::DoingNow) => Some(TaskState::NotDone),
        Some(TaskState::NotDone) => None,
    }
}
