//! Parsing of user-entered alert parameters.
//!
//! Intervals are accepted either as a bare count with a unit picked separately
//! (the way the creation form asks for them) or in the "2D" / "36H" display form.

use chrono::{Duration, NaiveDateTime};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::alerts::model::AlertError;

lazy_static! {
    static ref INTERVAL_RE: Regex =
        Regex::new(r"(?i)^\s*(\d+)\s*(d|h)?\s*$").expect("Invalid interval regex");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum IntervalUnit {
    #[default]
    Days,
    Hours,
}

/// Turn a positive count of `unit`s into an interval.
pub fn interval_from_count(count: i64, unit: IntervalUnit) -> Result<Duration, AlertError> {
    if count <= 0 {
        return Err(AlertError::InvalidInterval(format!("{count} must be positive")));
    }
    let interval = match unit {
        IntervalUnit::Days => Duration::try_days(count),
        IntervalUnit::Hours => Duration::try_hours(count),
    };
    interval.ok_or_else(|| AlertError::InvalidInterval(format!("{count} is too large")))
}

/// Parse "3", "3D", "12h" and the like. Bare numbers use `default_unit`.
pub fn parse_interval(text: &str, default_unit: IntervalUnit) -> Result<Duration, AlertError> {
    let caps = INTERVAL_RE
        .captures(text)
        .ok_or_else(|| AlertError::InvalidInterval(text.to_string()))?;

    let count: i64 = caps[1]
        .parse()
        .map_err(|_| AlertError::InvalidInterval(text.to_string()))?;
    let unit = match caps.get(2).map(|m| m.as_str().to_ascii_lowercase()) {
        Some(u) if u == "h" => IntervalUnit::Hours,
        Some(_) => IntervalUnit::Days,
        None => default_unit,
    };
    interval_from_count(count, unit)
}

/// Parse an entered date and time with the configured format (e.g. "%d/%m/%Y %H:%M").
pub fn parse_entry_time(text: &str, format: &str) -> Result<NaiveDateTime, AlertError> {
    NaiveDateTime::parse_from_str(text.trim(), format)
        .map_err(|e| AlertError::InvalidTime(format!("'{}': {}", text.trim(), e)))
}
