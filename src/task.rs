// Task records and drafts

use crate::error::StoreError;
use chrono::NaiveDate;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Format of a task deadline (ISO-8601 calendar date)
pub const DEADLINE_FORMAT: &str = "%Y-%m-%d";

/// Stable opaque task identifier, assigned by the store at creation
///
/// The default value is blank; it only appears on records decoded from data
/// written before ids existed, and the store replaces it on load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Generate a fresh id (UUID v7, so ids sort by creation time)
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Lifecycle tag of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum TaskState {
    Done,
    #[default]
    NotDone,
    DoingNow,
}

impl TaskState {
    /// Human-readable label
    pub fn label(self) -> &'static str {
        match self {
            TaskState::Done => "Done",
            TaskState::NotDone => "Not done",
            TaskState::DoingNow => "Doing right now",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Done => write!(f, "Done"),
            TaskState::NotDone => write!(f, "NotDone"),
            TaskState::DoingNow => write!(f, "DoingNow"),
        }
    }
}

impl FromStr for TaskState {
    type Err = String;

    /// Accepts the canonical names, the display labels, and any casing or
    /// separator variant of them ("not-done", "Not done", "DOING_NOW").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "done" => Ok(TaskState::Done),
            "notdone" => Ok(TaskState::NotDone),
            "doingnow" | "doingrightnow" => Ok(TaskState::DoingNow),
            _ => Err(format!("unknown task state: {:?}", s)),
        }
    }
}

impl<'de> Deserialize<'de> for TaskState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Multi-select controls stored the state as a one-element array
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawState {
            One(String),
            Many(Vec<String>),
        }

        let raw = match RawState::deserialize(deserializer)? {
            RawState::One(s) => s,
            RawState::Many(mut values) if values.len() == 1 => values.remove(0),
            RawState::Many(values) => {
                return Err(de::Error::custom(format!(
                    "expected exactly one task state, got {}",
                    values.len()
                )));
            }
        };

        raw.parse().map_err(de::Error::custom)
    }
}

/// A stored task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Blank on records written before ids existed
    #[serde(default)]
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub state: TaskState,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub deadline: Option<String>,
}

impl Task {
    /// Parsed deadline; `None` when absent or unparseable
    pub fn deadline_date(&self) -> Option<NaiveDate> {
        self.deadline.as_deref().and_then(parse_deadline)
    }
}

fn empty_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

fn parse_deadline(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DEADLINE_FORMAT).ok()
}

/// Input for create and update; update replaces the whole record with it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub summary: Option<String>,
    pub state: Option<TaskState>,
    pub deadline: Option<String>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn state(mut self, state: TaskState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn deadline(mut self, deadline: impl Into<String>) -> Self {
        self.deadline = Some(deadline.into());
        self
    }

    /// Validate and normalize the draft into a task with the given id
    pub(crate) fn into_task(self, id: TaskId) -> Result<Task, StoreError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(StoreError::validation("title cannot be empty or whitespace-only"));
        }

        let deadline = match self.deadline {
            Some(d) if !d.trim().is_empty() => {
                let date = parse_deadline(&d).ok_or_else(|| {
                    StoreError::validation(format!("deadline {:?} is not a YYYY-MM-DD date", d))
                })?;
                Some(date.format(DEADLINE_FORMAT).to_string())
            }
            _ => None,
        };

        Ok(Task {
            id,
            title: title.to_string(),
            summary: self.summary.unwrap_or_default(),
            state: self.state.unwrap_or_default(),
            deadline,
        })
    }
}

impl From<&Task> for TaskDraft {
    fn from(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            summary: Some(task.summary.clone()),
            state: Some(task.state),
            deadline: task.deadline.clone(),
        }
    }
}
