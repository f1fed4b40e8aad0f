//! Coercion of loosely typed records (edited rows, imported JSON) into canonical tasks.
//!
//! This is the only place raw input becomes a [`Task`]; everything downstream
//! works with canonical values. Normalizing an already canonical record yields
//! the same record.

use crate::dates;
use crate::error::AppError;
use crate::model::Task;
use serde_json::{Map, Value};
use time::OffsetDateTime;
use tracing::{debug, warn};

const TRUTHY: [&str; 5] = ["true", "yes", "y", "on", "1"];

pub fn normalize(raw: &[Value]) -> Result<Vec<Task>, AppError> {
    let now = dates::now_timestamp()?;
    Ok(normalize_with_created_at(raw, &now))
}

/// Like [`normalize`], stamping records that lack a creation time with `created_at`.
pub fn normalize_with_created_at(raw: &[Value], created_at: &str) -> Vec<Task> {
    raw.iter()
        .enumerate()
        .filter_map(|(index, value)| {
            let task = normalize_record(value, created_at);
            if task.is_none() {
                warn!(index, "dropping record without an object shape or title");
            }
            task
        })
        .collect()
}

/// Returns `None` when the value is not an object or its title is blank.
pub fn normalize_record(value: &Value, created_at: &str) -> Option<Task> {
    let record = value.as_object()?;

    let title = text_field(record, "title");
    if title.is_empty() {
        return None;
    }

    Some(Task {
        title,
        notes: text_field(record, "notes"),
        due: due_field(record.get("due")),
        priority: enum_field(record.get("priority")),
        status: enum_field(record.get("status")),
        tag: text_field(record, "tag"),
        created_at: created_at_field(record).unwrap_or_else(|| created_at.to_string()),
        selected: flag_field(record.get("selected")),
    })
}

fn text_field(record: &Map<String, Value>, key: &str) -> String {
    match record.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.trim().to_string(),
        Some(other) => other.to_string(),
    }
}

fn due_field(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => dates::coerce_due(text),
        // dataframe exports write dates as epoch milliseconds
        Some(Value::Number(number)) => number
            .as_i64()
            .and_then(|millis| {
                OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).ok()
            })
            .map(|moment| dates::format_date(moment.date()))
            .unwrap_or_else(|| number.to_string()),
        Some(other) => dates::coerce_due(&other.to_string()),
    }
}

fn enum_field<T>(value: Option<&Value>) -> T
where
    T: Default + std::str::FromStr,
{
    match value {
        Some(Value::String(text)) if !text.trim().is_empty() => {
            text.parse().unwrap_or_else(|_| {
                debug!(value = %text, "unrecognized enum value, using default");
                T::default()
            })
        }
        _ => T::default(),
    }
}

fn flag_field(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(text)) => TRUTHY
            .iter()
            .any(|truthy| truthy.eq_ignore_ascii_case(text.trim())),
        _ => false,
    }
}

fn created_at_field(record: &Map<String, Value>) -> Option<String> {
    ["created_at", "createdAt"]
        .iter()
        .find_map(|key| match record.get(*key)? {
            Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        })
}
