//! Presentation-only timezone conversion.
//!
//! Nothing in here feeds back into merge arithmetic. Reduction always
//! works on UTC instants; these helpers only decide how an instant is
//! shown to a person.

use crate::core::event::Event;
use chrono::{DateTime, Local, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;

/// Look up an IANA timezone by name, e.g. `Europe/Berlin`.
pub fn parse_timezone(name: &str) -> Result<Tz, DisplayError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| DisplayError::UnknownTimezone(name.to_string()))
}

/// Convert a UTC instant to the given zone.
pub fn to_timezone<Z: TimeZone>(timestamp: DateTime<Utc>, zone: &Z) -> DateTime<Z> {
    timestamp.with_timezone(zone)
}

/// Convert a UTC instant to the system's local zone.
pub fn to_local(timestamp: DateTime<Utc>) -> DateTime<Local> {
    timestamp.with_timezone(&Local)
}

/// An event rendered for display in a particular zone.
#[derive(Debug, Clone, Serialize)]
pub struct LocalizedEvent {
    pub start: String,
    pub end: String,
    pub timezone: String,
    pub duration_secs: f64,
    pub data: serde_json::Value,
}

impl LocalizedEvent {
    pub fn new(event: &Event, zone: Tz) -> Self {
        Self {
            start: to_timezone(event.timestamp, &zone).to_rfc3339(),
            end: to_timezone(event.end(), &zone).to_rfc3339(),
            timezone: zone.name().to_string(),
            duration_secs: event.duration_secs(),
            data: serde_json::Value::Object(event.data.clone()),
        }
    }
}

/// One-line summary, e.g. `[12:00:00 - 12:00:05] 5.0s {"app":"x"}`.
pub fn format_event<Z: TimeZone>(event: &Event, zone: &Z) -> String
where
    Z::Offset: std::fmt::Display,
{
    let data = serde_json::to_string(&event.data).unwrap_or_else(|_| "{}".to_string());
    format!(
        "[{} - {}] {:.1}s {}",
        to_timezone(event.timestamp, zone).format("%H:%M:%S"),
        to_timezone(event.end(), zone).format("%H:%M:%S"),
        event.duration_secs(),
        data
    )
}

/// Presentation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayError {
    UnknownTimezone(String),
}

impl std::fmt::Display for DisplayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisplayError::UnknownTimezone(name) => write!(f, "Unknown timezone: {name}"),
        }
    }
}

impl std::error::Error for DisplayError {}
