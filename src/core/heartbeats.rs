//! Heartbeat reduction.
//!
//! Consecutive heartbeats with identical data are folded into a single
//! event when each one lands inside the merge window of the event that
//! is currently open:
//!
//! ```text
//! [open.timestamp, open.timestamp + open.duration + pulsetime]
//! ```
//!
//! All arithmetic happens on UTC instants. Display zones never take part.
//!
//! A same-data heartbeat that starts before the open event is treated as
//! clock skew: it is dropped with a warning and the open event is kept
//! unchanged. Anomalous out-of-order heartbeats are dropped, not preserved.

use crate::core::event::{duration_serde, Event};
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Tolerance within which two identical heartbeats count as continuous.
///
/// Always non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pulsetime(Duration);

impl Pulsetime {
    /// Wrap a duration, rejecting negative values.
    pub fn new(duration: Duration) -> Result<Self, PulsetimeError> {
        if duration < Duration::zero() {
            return Err(PulsetimeError::Negative);
        }
        Ok(Self(duration))
    }

    /// Whole seconds.
    pub fn from_secs(secs: u32) -> Self {
        Self(Duration::seconds(i64::from(secs)))
    }

    /// Fractional seconds, as supplied by configuration.
    pub fn from_secs_f64(secs: f64) -> Result<Self, PulsetimeError> {
        if !secs.is_finite() {
            return Err(PulsetimeError::NotFinite);
        }
        if secs < 0.0 {
            return Err(PulsetimeError::Negative);
        }
        duration_serde::from_secs_f64(secs)
            .map(Self)
            .ok_or(PulsetimeError::NotFinite)
    }

    pub fn zero() -> Self {
        Self(Duration::zero())
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    pub fn as_secs_f64(&self) -> f64 {
        duration_serde::as_secs_f64(&self.0)
    }
}

/// Errors raised when building a [`Pulsetime`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PulsetimeError {
    Negative,
    NotFinite,
}

impl std::fmt::Display for PulsetimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PulsetimeError::Negative => write!(f, "Pulsetime must not be negative"),
            PulsetimeError::NotFinite => write!(f, "Pulsetime must be a finite number of seconds"),
        }
    }
}

impl std::error::Error for PulsetimeError {}

/// Outcome of testing a candidate heartbeat against the open event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDecision {
    /// Merge; the open event takes this duration.
    Extend(Duration),
    /// Same data but earlier than the open event. Drop the candidate and
    /// keep the open event as is.
    SkewRefused,
    /// Different activity or outside the window; start a new event.
    Separate,
}

/// Decide how `candidate` relates to the `open` event.
pub fn merge_decision(open: &Event, candidate: &Event, pulsetime: Pulsetime) -> MergeDecision {
    if open.data != candidate.data {
        return MergeDecision::Separate;
    }

    if candidate.timestamp < open.timestamp {
        tracing::warn!(
            open = %open.timestamp,
            candidate = %candidate.timestamp,
            "Heartbeat precedes the open event, refusing to merge"
        );
        return MergeDecision::SkewRefused;
    }

    // An unrepresentable window end means the window is unbounded.
    let window_end = open
        .duration
        .checked_add(&pulsetime.as_duration())
        .and_then(|span| open.timestamp.checked_add_signed(span));
    if let Some(end) = window_end {
        if candidate.timestamp > end {
            return MergeDecision::Separate;
        }
    }

    let offset = candidate.timestamp.signed_duration_since(open.timestamp);
    let proposed = offset
        .checked_add(&candidate.duration)
        .unwrap_or(Duration::MAX);

    if proposed < Duration::zero() {
        tracing::warn!(
            open = %open.timestamp,
            candidate = %candidate.timestamp,
            "Merging heartbeats would result in a negative duration, refusing to merge"
        );
        return MergeDecision::SkewRefused;
    }

    MergeDecision::Extend(open.duration.max(proposed))
}

/// Merge `candidate` into `open`.
///
/// Returns `None` when the two do not merge. A skewed candidate returns
/// the unchanged open event, so callers must not append the candidate.
pub fn heartbeat_merge(open: &Event, candidate: &Event, pulsetime: Pulsetime) -> Option<Event> {
    match merge_decision(open, candidate, pulsetime) {
        MergeDecision::Extend(duration) => Some(Event {
            duration,
            ..open.clone()
        }),
        MergeDecision::SkewRefused => Some(open.clone()),
        MergeDecision::Separate => None,
    }
}

/// Per-run reduction counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReduceStats {
    /// Heartbeats pushed into the reducer
    pub received: u64,
    /// Events finalized so far
    pub emitted: u64,
    /// Heartbeats absorbed into the open event
    pub merged: u64,
    /// Heartbeats dropped by the skew guard
    pub skew_dropped: u64,
}

/// Streaming heartbeat reducer.
///
/// Holds the single piece of fold state, the open event. Each reducer is
/// independent, so separate streams can be reduced in parallel.
#[derive(Debug, Clone)]
pub struct HeartbeatReducer {
    pulsetime: Pulsetime,
    open: Option<Event>,
    stats: ReduceStats,
}

impl HeartbeatReducer {
    pub fn new(pulsetime: Pulsetime) -> Self {
        Self {
            pulsetime,
            open: None,
            stats: ReduceStats::default(),
        }
    }

    pub fn pulsetime(&self) -> Pulsetime {
        self.pulsetime
    }

    /// Feed the next heartbeat.
    ///
    /// Returns the previously open event if this heartbeat closed it.
    pub fn push(&mut self, heartbeat: Event) -> Option<Event> {
        self.stats.received += 1;

        let Some(open) = self.open.as_mut() else {
            self.open = Some(heartbeat);
            return None;
        };

        match merge_decision(open, &heartbeat, self.pulsetime) {
            MergeDecision::Extend(duration) => {
                open.duration = duration;
                self.stats.merged += 1;
                None
            }
            MergeDecision::SkewRefused => {
                self.stats.skew_dropped += 1;
                None
            }
            MergeDecision::Separate => {
                self.stats.emitted += 1;
                self.open.replace(heartbeat)
            }
        }
    }

    /// The event still absorbing heartbeats, if any.
    pub fn open_event(&self) -> Option<&Event> {
        self.open.as_ref()
    }

    /// Take the open event, leaving the reducer empty.
    pub fn flush(&mut self) -> Option<Event> {
        let open = self.open.take();
        if open.is_some() {
            self.stats.emitted += 1;
        }
        open
    }

    /// Consume the reducer and return the final open event.
    pub fn finish(mut self) -> Option<Event> {
        self.flush()
    }

    pub fn stats(&self) -> ReduceStats {
        self.stats
    }
}

/// Iterator adapter yielding reduced events lazily.
pub struct ReduceHeartbeats<I> {
    inner: I,
    reducer: HeartbeatReducer,
    done: bool,
}

impl<I> ReduceHeartbeats<I> {
    /// Counters for the events consumed so far.
    pub fn stats(&self) -> ReduceStats {
        self.reducer.stats()
    }
}

impl<I: Iterator<Item = Event>> Iterator for ReduceHeartbeats<I> {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        if self.done {
            return None;
        }
        for heartbeat in self.inner.by_ref() {
            if let Some(closed) = self.reducer.push(heartbeat) {
                return Some(closed);
            }
        }
        self.done = true;
        self.reducer.flush()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (_, upper) = self.inner.size_hint();
        let pending = usize::from(self.reducer.open_event().is_some());
        (pending, upper.and_then(|n| n.checked_add(pending)))
    }
}

/// Reduce a stream of heartbeats lazily.
pub fn reduce_heartbeats<I>(events: I, pulsetime: Pulsetime) -> ReduceHeartbeats<I::IntoIter>
where
    I: IntoIterator<Item = Event>,
{
    ReduceHeartbeats {
        inner: events.into_iter(),
        reducer: HeartbeatReducer::new(pulsetime),
        done: false,
    }
}

/// Reduce an ordered sequence of heartbeats.
///
/// Events must be ordered by non-decreasing timestamp. The input is not
/// sorted or otherwise checked.
pub fn heartbeat_reduce<I>(events: I, pulsetime: Pulsetime) -> Vec<Event>
where
    I: IntoIterator<Item = Event>,
{
    reduce_heartbeats(events, pulsetime).collect()
}
