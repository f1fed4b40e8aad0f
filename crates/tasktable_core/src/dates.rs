//! Date and timestamp coercion shared by the store, normalization and sorting.

use crate::error::AppError;
use time::format_description::BorrowedFormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

const DATE_FORMAT: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");

const NAIVE_FORMATS: [&[BorrowedFormatItem<'_>]; 4] = [
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
];

/// Placeholders that spreadsheet and dataframe tooling writes for missing dates.
const MISSING_SENTINELS: [&str; 5] = ["nat", "nan", "none", "null", "undefined"];

pub fn parse_date(raw: &str) -> Option<Date> {
    Date::parse(raw.trim(), DATE_FORMAT).ok()
}

pub fn format_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Parses an RFC 3339 timestamp, or a naive ISO timestamp taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let trimmed = raw.trim();
    if let Ok(parsed) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Some(parsed);
    }

    NAIVE_FORMATS.iter().find_map(|format| {
        PrimitiveDateTime::parse(trimmed, format)
            .ok()
            .map(PrimitiveDateTime::assume_utc)
    })
}

pub fn is_missing(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty()
        || MISSING_SENTINELS
            .iter()
            .any(|sentinel| sentinel.eq_ignore_ascii_case(trimmed))
}

/// Coerces date-like text to `YYYY-MM-DD`. Missing values become empty and
/// anything unrecognized is kept trimmed.
pub fn coerce_due(raw: &str) -> String {
    if is_missing(raw) {
        return String::new();
    }

    let trimmed = raw.trim();
    if let Some(date) = parse_date(trimmed) {
        return format_date(date);
    }

    match parse_timestamp(trimmed) {
        Some(timestamp) => format_date(timestamp.date()),
        None => trimmed.to_string(),
    }
}

pub fn format_timestamp(moment: OffsetDateTime) -> Result<String, AppError> {
    moment
        .replace_nanosecond(0)
        .map_err(|err| AppError::invalid_data(err.to_string()))?
        .format(&Rfc3339)
        .map_err(|err| AppError::invalid_data(err.to_string()))
}

pub fn now_timestamp() -> Result<String, AppError> {
    format_timestamp(OffsetDateTime::now_utc())
}
