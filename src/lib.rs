//! Sundial Heartbeat - compacts activity heartbeats into duration events.
//!
//! Trackers report what the user is doing as a stream of heartbeats: small
//! events saying "activity X was ongoing at time T". This library folds
//! consecutive heartbeats for the same activity into one event whose
//! duration covers them all, without losing coverage or inventing gaps.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       Sundial Heartbeat                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────────┐   ┌─────────────┐     │
//! │  │ Event source│──▶│ HeartbeatReducer│──▶│   Reduced   │     │
//! │  │  (ordered)  │   │ (merge window)  │   │   events    │     │
//! │  └─────────────┘   └─────────────────┘   └─────────────┘     │
//! │                            │                     │           │
//! │                            ▼                     ▼           │
//! │                    ┌─────────────┐       ┌─────────────┐     │
//! │                    │ Reduction   │       │  Display    │     │
//! │                    │    Log      │       │ (local zone)│     │
//! │                    └─────────────┘       └─────────────┘     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use chrono::{Duration, TimeZone, Utc};
//! use sundial_heartbeat::{heartbeat_reduce, Event, EventData, Pulsetime};
//!
//! let mut data = EventData::new();
//! data.insert("app".into(), "editor".into());
//!
//! let start = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
//! let events = vec![
//!     Event::heartbeat(start, data.clone()),
//!     Event::heartbeat(start + Duration::seconds(5), data),
//! ];
//!
//! let reduced = heartbeat_reduce(events, Pulsetime::from_secs(10));
//! assert_eq!(reduced.len(), 1);
//! assert_eq!(reduced[0].duration, Duration::seconds(5));
//! ```

pub mod audit;
pub mod config;
pub mod core;
pub mod platform;

// Re-export key types at crate root for convenience
pub use audit::{ReductionLog, ReductionStats, SharedReductionLog};
pub use config::{Config, ConfigError};
pub use crate::core::{
    heartbeat_merge, heartbeat_reduce, reduce_heartbeats, Event, EventData, EventError,
    HeartbeatReducer, MergeDecision, Pulsetime, PulsetimeError, ReduceStats,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
