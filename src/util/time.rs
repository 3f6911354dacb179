//! Timestamp helpers.
//!
//! Timestamps are persisted as Unix-epoch seconds, so everything entering the
//! domain is truncated to whole seconds first. That keeps a value written by
//! `set_due_date` identical to the one read back after a reload.

use chrono::{DateTime, Local, NaiveDateTime, SubsecRound, TimeZone, Utc};

use crate::error::{Result, TodoError};

/// Formats accepted for due-date input, tried in order.
const INPUT_FORMATS: &[&str] = &["%Y-%m-%d, %H:%M", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"];

/// Human-readable hint shown next to date prompts.
pub const INPUT_HINT: &str = "format YYYY-MM-DD, H:M";

/// Current time at storage precision.
#[must_use]
pub fn now() -> DateTime<Utc> {
    normalize(Utc::now())
}

/// Drop sub-second precision.
#[must_use]
pub fn normalize(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(0)
}

#[must_use]
pub fn to_epoch(ts: DateTime<Utc>) -> i64 {
    ts.timestamp()
}

#[must_use]
pub fn from_epoch(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

/// Parse a user-entered due date in the local time zone.
///
/// # Errors
///
/// Returns a validation error if the input matches none of the accepted
/// formats or names a local time that does not exist.
pub fn parse_due_date(input: &str) -> Result<DateTime<Utc>> {
    parse_due_date_in(input, &Local)
}

/// Parse a user-entered due date in an explicit time zone.
///
/// # Errors
///
/// Same as [`parse_due_date`].
pub fn parse_due_date_in<Tz: TimeZone>(input: &str, tz: &Tz) -> Result<DateTime<Utc>> {
    let trimmed = input.trim();
    let naive = INPUT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| {
            TodoError::validation(
                "due date",
                format!("'{trimmed}' does not match {INPUT_HINT}"),
            )
        })?;

    let local = tz.from_local_datetime(&naive).earliest().ok_or_else(|| {
        TodoError::validation("due date", format!("'{trimmed}' is not a valid local time"))
    })?;

    Ok(normalize(local.with_timezone(&Utc)))
}

/// Render a due date for task listings.
#[must_use]
pub fn format_due_date(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%d.%m.%y - %H.%M").to_string()
}
