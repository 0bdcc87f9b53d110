//! Heartbeat event model.
//!
//! An event asserts that the activity described by `data` was ongoing
//! during `[timestamp, timestamp + duration]`. Timestamps are always held
//! in UTC; zone-aware inputs are normalized when the event is built.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Opaque activity payload, e.g. `{"app": "firefox", "title": "..."}`.
///
/// Equality is structural JSON equality: key order is irrelevant and
/// numbers are equal only when their JSON representations are equal.
pub type EventData = serde_json::Map<String, serde_json::Value>;

/// A duration-bearing activity event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Storage identifier, if the event came from a datastore
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Start of the activity (UTC)
    pub timestamp: DateTime<Utc>,
    /// How long the activity was believed ongoing, in seconds on the wire
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// What the activity was
    pub data: EventData,
}

impl Event {
    /// Create an event, rejecting negative durations.
    pub fn new(
        timestamp: DateTime<Utc>,
        duration: Duration,
        data: EventData,
    ) -> Result<Self, EventError> {
        if duration < Duration::zero() {
            return Err(EventError::NegativeDuration);
        }
        Ok(Self {
            id: None,
            timestamp,
            duration,
            data,
        })
    }

    /// Create a zero-duration heartbeat.
    pub fn heartbeat(timestamp: DateTime<Utc>, data: EventData) -> Self {
        Self {
            id: None,
            timestamp,
            duration: Duration::zero(),
            data,
        }
    }

    /// Create an event from a zone-aware timestamp, normalizing it to UTC.
    pub fn from_zoned<Tz: TimeZone>(
        timestamp: DateTime<Tz>,
        duration: Duration,
        data: EventData,
    ) -> Result<Self, EventError> {
        Self::new(timestamp.with_timezone(&Utc), duration, data)
    }

    /// Attach a storage identifier.
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// End of the covered interval.
    ///
    /// Saturates at the latest representable instant instead of panicking.
    pub fn end(&self) -> DateTime<Utc> {
        self.timestamp
            .checked_add_signed(self.duration)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Duration in fractional seconds.
    pub fn duration_secs(&self) -> f64 {
        duration_serde::as_secs_f64(&self.duration)
    }
}

/// Errors raised when building an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    NegativeDuration,
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventError::NegativeDuration => write!(f, "Event duration must not be negative"),
        }
    }
}

impl std::error::Error for EventError {}

/// Serde support for event durations as float seconds.
pub(crate) mod duration_serde {
    use chrono::Duration;
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    pub fn as_secs_f64(duration: &Duration) -> f64 {
        match duration.to_std() {
            Ok(d) => d.as_secs_f64(),
            // Negative durations only exist on hand-built events.
            Err(_) => -(duration.abs().to_std().map(|d| d.as_secs_f64()).unwrap_or(0.0)),
        }
    }

    pub fn from_secs_f64(secs: f64) -> Option<Duration> {
        if !secs.is_finite() || secs < 0.0 {
            return None;
        }
        let std = std::time::Duration::try_from_secs_f64(secs).ok()?;
        Duration::from_std(std).ok()
    }

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        as_secs_f64(duration).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        from_secs_f64(secs).ok_or_else(|| {
            de::Error::custom(format!(
                "duration must be a finite, non-negative number of seconds, got {secs}"
            ))
        })
    }
}
