//! Audit module for Sundial Heartbeat.
//!
//! Keeps a running account of what reductions did to the heartbeat
//! stream, so compaction and dropped heartbeats stay visible.

pub mod log;

// Re-export commonly used types
pub use log::{
    create_shared_log, create_shared_log_with_persistence, ReductionLog, ReductionStats,
    SharedReductionLog,
};
