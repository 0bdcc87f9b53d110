//! Core functionality for Sundial Heartbeat.
//!
//! This module contains:
//! - The event model shared by every producer and consumer
//! - Heartbeat merging and reduction
//! - Presentation helpers for showing events in a local zone

pub mod display;
pub mod event;
pub mod heartbeats;

// Re-export commonly used types
pub use display::{
    format_event, parse_timezone, to_local, to_timezone, DisplayError, LocalizedEvent,
};
pub use event::{Event, EventData, EventError};
pub use heartbeats::{
    heartbeat_merge, heartbeat_reduce, merge_decision, reduce_heartbeats, HeartbeatReducer,
    MergeDecision, Pulsetime, PulsetimeError, ReduceHeartbeats, ReduceStats,
};
