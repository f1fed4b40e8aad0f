//! Read-only filtered and sorted views over a task snapshot.

use crate::error::AppError;
use crate::model::{Priority, Status, Task};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Conjunctive filter: text search AND status set AND priority set.
/// Empty parts match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub text: String,
    pub statuses: HashSet<Status>,
    pub priorities: HashSet<Priority>,
}

impl Query {
    pub fn matches(&self, task: &Task) -> bool {
        self.matches_text(task)
            && (self.statuses.is_empty() || self.statuses.contains(&task.status))
            && (self.priorities.is_empty() || self.priorities.contains(&task.priority))
    }

    fn matches_text(&self, task: &Task) -> bool {
        let needle = self.text.to_lowercase();
        if needle.is_empty() {
            return true;
        }

        [&task.title, &task.notes, &task.tag]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortMode {
    #[default]
    DueAsc,
    DueDesc,
    Priority,
    Newest,
    Title,
}

impl SortMode {
    pub const ALL: [SortMode; 5] = [
        SortMode::DueAsc,
        SortMode::DueDesc,
        SortMode::Priority,
        SortMode::Newest,
        SortMode::Title,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::DueAsc => "due-asc",
            Self::DueDesc => "due-desc",
            Self::Priority => "priority",
            Self::Newest => "newest",
            Self::Title => "title",
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SortMode {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let wanted = raw.trim().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|mode| mode.name().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|mode| mode.name()).collect();
                AppError::validation(format!(
                    "unknown sort mode '{}' (expected one of: {})",
                    raw.trim(),
                    names.join(", ")
                ))
            })
    }
}

/// A task in a view together with its 1-based position in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub position: usize,
    pub task: Task,
}

pub fn filter(tasks: &[Task], query: &Query) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| query.matches(task))
        .cloned()
        .collect()
}

/// Stable: ties keep their input order.
pub fn sort(tasks: &[Task], mode: SortMode) -> Vec<Task> {
    let mut sorted = tasks.to_vec();
    sorted.sort_by(|a, b| compare(a, b, mode));
    sorted
}

pub fn view(tasks: &[Task], query: &Query, mode: SortMode) -> Vec<Row> {
    let mut rows: Vec<Row> = tasks
        .iter()
        .enumerate()
        .filter(|(_, task)| query.matches(task))
        .map(|(index, task)| Row {
            position: index + 1,
            task: task.clone(),
        })
        .collect();
    rows.sort_by(|a, b| compare(&a.task, &b.task, mode));
    rows
}

fn compare(a: &Task, b: &Task, mode: SortMode) -> Ordering {
    match mode {
        SortMode::DueAsc => missing_last(a.due_date(), b.due_date(), |x, y| x.cmp(y)),
        SortMode::DueDesc => missing_last(a.due_date(), b.due_date(), |x, y| y.cmp(x)),
        SortMode::Priority => a.priority.rank().cmp(&b.priority.rank()),
        SortMode::Newest => missing_last(a.created_time(), b.created_time(), |x, y| y.cmp(x)),
        SortMode::Title => a.title.cmp(&b.title),
    }
}

fn missing_last<T>(a: Option<T>, b: Option<T>, present: impl Fn(&T, &T) -> Ordering) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => present(&a, &b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
