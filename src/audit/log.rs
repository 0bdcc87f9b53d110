//! Reduction audit log.
//!
//! Tracks how many heartbeats went into reductions, how many events came
//! out, and how many heartbeats the skew guard dropped. Counters are
//! atomic so independent reductions can report into one shared log.

use crate::core::ReduceStats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Cumulative reduction statistics.
#[derive(Debug)]
pub struct ReductionLog {
    /// Number of reduction runs recorded
    runs: AtomicU64,
    /// Heartbeats fed into reductions
    heartbeats_received: AtomicU64,
    /// Events produced by reductions
    events_emitted: AtomicU64,
    /// Heartbeats folded into an open event
    heartbeats_merged: AtomicU64,
    /// Heartbeats dropped as clock skew
    skew_dropped: AtomicU64,
    /// Session start time
    session_start: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl ReductionLog {
    pub fn new() -> Self {
        Self {
            runs: AtomicU64::new(0),
            heartbeats_received: AtomicU64::new(0),
            events_emitted: AtomicU64::new(0),
            heartbeats_merged: AtomicU64::new(0),
            skew_dropped: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create a log that loads from and saves to `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let log = Self::new();
        match read_persisted(&path) {
            Ok(Some(persisted)) => log.restore(persisted.counts),
            Ok(None) => {}
            Err(e) => tracing::warn!(?path, "Could not load previous reduction stats: {e}"),
        }

        Self {
            persist_path: Some(path),
            ..log
        }
    }

    /// Record the counters of one finished reduction.
    pub fn record_run(&self, stats: &ReduceStats) {
        self.runs.fetch_add(1, Ordering::Relaxed);
        self.heartbeats_received
            .fetch_add(stats.received, Ordering::Relaxed);
        self.events_emitted
            .fetch_add(stats.emitted, Ordering::Relaxed);
        self.heartbeats_merged
            .fetch_add(stats.merged, Ordering::Relaxed);
        self.skew_dropped
            .fetch_add(stats.skew_dropped, Ordering::Relaxed);
    }

    pub fn stats(&self) -> ReductionStats {
        let counts = self.counts();
        ReductionStats {
            runs: counts.runs,
            heartbeats_received: counts.heartbeats_received,
            events_emitted: counts.events_emitted,
            heartbeats_merged: counts.heartbeats_merged,
            skew_dropped: counts.skew_dropped,
            compaction_ratio: counts.compaction_ratio(),
            session_start: self.session_start,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Reduction Statistics:\n\
             - Runs: {}\n\
             - Heartbeats received: {}\n\
             - Events emitted: {}\n\
             - Heartbeats merged: {}\n\
             - Skewed heartbeats dropped: {}\n\
             - Compaction ratio: {:.3}",
            stats.runs,
            stats.heartbeats_received,
            stats.events_emitted,
            stats.heartbeats_merged,
            stats.skew_dropped,
            stats.compaction_ratio
        )
    }

    /// Write the current counters to the persistence path, if any.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let Some(path) = self.persist_path.as_deref() else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let persisted = PersistedStats {
            counts: self.counts(),
            last_updated: Utc::now(),
        };
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, &persisted).map_err(std::io::Error::other)
    }

    /// Zero every counter. The session start is kept.
    pub fn reset(&self) {
        self.restore(Counts::default());
    }

    fn counts(&self) -> Counts {
        Counts {
            runs: self.runs.load(Ordering::Relaxed),
            heartbeats_received: self.heartbeats_received.load(Ordering::Relaxed),
            events_emitted: self.events_emitted.load(Ordering::Relaxed),
            heartbeats_merged: self.heartbeats_merged.load(Ordering::Relaxed),
            skew_dropped: self.skew_dropped.load(Ordering::Relaxed),
        }
    }

    fn restore(&self, counts: Counts) {
        self.runs.store(counts.runs, Ordering::Relaxed);
        self.heartbeats_received
            .store(counts.heartbeats_received, Ordering::Relaxed);
        self.events_emitted
            .store(counts.events_emitted, Ordering::Relaxed);
        self.heartbeats_merged
            .store(counts.heartbeats_merged, Ordering::Relaxed);
        self.skew_dropped.store(counts.skew_dropped, Ordering::Relaxed);
    }
}

/// Counters from an earlier session. A missing file means a fresh start.
fn read_persisted(path: &Path) -> Result<Option<PersistedStats>, std::io::Error> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    serde_json::from_reader(BufReader::new(file))
        .map(Some)
        .map_err(std::io::Error::other)
}

impl Default for ReductionLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of reduction statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReductionStats {
    pub runs: u64,
    pub heartbeats_received: u64,
    pub events_emitted: u64,
    pub heartbeats_merged: u64,
    pub skew_dropped: u64,
    /// Emitted events per received heartbeat; 1.0 when nothing was received
    pub compaction_ratio: f64,
    pub session_start: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct Counts {
    runs: u64,
    heartbeats_received: u64,
    events_emitted: u64,
    heartbeats_merged: u64,
    skew_dropped: u64,
}

impl Counts {
    fn compaction_ratio(&self) -> f64 {
        if self.heartbeats_received == 0 {
            1.0
        } else {
            self.events_emitted as f64 / self.heartbeats_received as f64
        }
    }
}

/// On-disk form: the counters plus when they were written.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    #[serde(flatten)]
    counts: Counts,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared reduction log.
pub type SharedReductionLog = Arc<ReductionLog>;

pub fn create_shared_log() -> SharedReductionLog {
    Arc::new(ReductionLog::new())
}

pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedReductionLog {
    Arc::new(ReductionLog::with_persistence(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(received: u64, emitted: u64, merged: u64, skew_dropped: u64) -> ReduceStats {
        ReduceStats {
            received,
            emitted,
            merged,
            skew_dropped,
        }
    }

    #[test]
    fn test_record_runs() {
        let log = ReductionLog::new();

        log.record_run(&run(10, 2, 7, 1));
        log.record_run(&run(6, 3, 3, 0));

        let stats = log.stats();
        assert_eq!(stats.runs, 2);
        assert_eq!(stats.heartbeats_received, 16);
        assert_eq!(stats.events_emitted, 5);
        assert_eq!(stats.heartbeats_merged, 10);
        assert_eq!(stats.skew_dropped, 1);
        assert!((stats.compaction_ratio - 5.0 / 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_shared_log_across_threads() {
        let log = create_shared_log();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || log.record_run(&run(5, 1, 4, 0)))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(log.stats().runs, 4);
        assert_eq!(log.stats().heartbeats_received, 20);
    }

    #[test]
    fn test_reset() {
        let log = ReductionLog::new();
        log.record_run(&run(100, 50, 50, 0));
        log.reset();

        let stats = log.stats();
        assert_eq!(stats.runs, 0);
        assert_eq!(stats.heartbeats_received, 0);
        assert_eq!(stats.compaction_ratio, 1.0);
    }

    #[test]
    fn test_persistence() {
        let path = std::env::temp_dir()
            .join("sundial-heartbeat-audit-test")
            .join(format!("reductions-{}.json", std::process::id()));

        let log = ReductionLog::with_persistence(path.clone());
        log.reset();
        log.record_run(&run(4, 1, 2, 1));
        log.save().unwrap();

        let reloaded = ReductionLog::with_persistence(path.clone());
        let _ = std::fs::remove_file(&path);

        let stats = reloaded.stats();
        assert_eq!(stats.runs, 1);
        assert_eq!(stats.skew_dropped, 1);
    }

    #[test]
    fn test_unreadable_persisted_stats_start_fresh() {
        let path = std::env::temp_dir()
            .join("sundial-heartbeat-audit-test")
            .join(format!("corrupt-{}.json", std::process::id()));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not json").unwrap();

        let log = ReductionLog::with_persistence(path.clone());
        assert_eq!(log.stats().runs, 0);

        // Saving replaces the bad file with readable counters
        log.record_run(&run(3, 1, 2, 0));
        log.save().unwrap();
        let reloaded = ReductionLog::with_persistence(path.clone());
        let _ = std::fs::remove_file(&path);

        assert_eq!(reloaded.stats().runs, 1);
        assert_eq!(reloaded.stats().heartbeats_merged, 2);
    }

    #[test]
    fn test_save_without_path_is_noop() {
        let log = ReductionLog::new();
        log.record_run(&run(1, 1, 0, 0));
        assert!(log.save().is_ok());
    }

    #[test]
    fn test_summary_format() {
        let summary = ReductionLog::new().summary();
        assert!(summary.contains("Heartbeats received"));
        assert!(summary.contains("Skewed heartbeats dropped"));
    }
}
