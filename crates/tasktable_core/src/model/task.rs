use crate::dates;
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::{Date, OffsetDateTime};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub title: String,
    #[serde(default)]
    pub notes: String,
    /// `YYYY-MM-DD`, or empty when the task has no due date.
    #[serde(default)]
    pub due: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub tag: String,
    #[serde(alias = "createdAt")]
    pub created_at: String,
    #[serde(default)]
    pub selected: bool,
}

impl Task {
    pub fn due_date(&self) -> Option<Date> {
        dates::parse_date(&self.due)
    }

    pub fn created_time(&self) -> Option<OffsetDateTime> {
        dates::parse_timestamp(&self.created_at)
    }

    pub fn is_done(&self) -> bool {
        self.status == Status::Done
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    /// Position in a High -> Low ordering.
    pub fn rank(self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Priority {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|priority| priority.label().eq_ignore_ascii_case(raw.trim()))
            .ok_or_else(|| {
                AppError::validation(format!(
                    "unknown priority '{}' (expected Low, Medium or High)",
                    raw.trim()
                ))
            })
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Todo,
    Doing,
    Done,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Todo, Status::Doing, Status::Done];

    pub fn label(self) -> &'static str {
        match self {
            Self::Todo => "Todo",
            Self::Doing => "Doing",
            Self::Done => "Done",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Status {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(raw.trim()))
            .ok_or_else(|| {
                AppError::validation(format!(
                    "unknown status '{}' (expected Todo, Doing or Done)",
                    raw.trim()
                ))
            })
    }
}
