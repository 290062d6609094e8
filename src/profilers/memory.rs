use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::error::SqlFetchError;
use crate::traits::Profiler;
use crate::types::BindValues;

/// How a profiled execution ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileOutcome {
    Success,
    /// The rendered error message.
    Failure(String),
}

/// One profiled statement execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileEntry {
    pub statement: String,
    pub values: BindValues,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration: Duration,
    pub outcome: ProfileOutcome,
}

/// A profiler that keeps every execution in memory.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use sqlfetch::profilers::MemoryProfiler;
///
/// let profiler = Arc::new(MemoryProfiler::new());
/// profiler.set_active(false);
/// assert!(profiler.entries().is_empty());
/// ```
pub struct MemoryProfiler {
    active: AtomicBool,
    entries: Mutex<Vec<ProfileEntry>>,
}

impl MemoryProfiler {
    /// Create an active profiler with no entries.
    pub fn new() -> Self {
        Self {
            active: AtomicBool::new(true),
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Turn recording on or off. Entries already recorded are kept.
    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Relaxed);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    pub fn entries(&self) -> Vec<ProfileEntry> {
        self.entries.lock().clone()
    }

    pub fn reset(&self) {
        self.entries.lock().clear();
    }

    fn record(
        &self,
        statement: &str,
        values: &BindValues,
        duration: Duration,
        outcome: ProfileOutcome,
    ) {
        if !self.is_active() {
            return;
        }
        let finished_at = Utc::now();
        let started_at = chrono::Duration::from_std(duration)
            .ok()
            .and_then(|d| finished_at.checked_sub_signed(d))
            .unwrap_or(finished_at);

        self.entries.lock().push(ProfileEntry {
            statement: statement.to_string(),
            values: values.clone(),
            started_at,
            finished_at,
            duration,
            outcome,
        });
    }
}

impl Default for MemoryProfiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Profiler for MemoryProfiler {
    fn on_success(&self, statement: &str, values: &BindValues, duration: Duration) {
        self.record(statement, values, duration, ProfileOutcome::Success);
    }

    fn on_failure(
        &self,
        statement: &str,
        values: &BindValues,
        duration: Duration,
        error: &SqlFetchError,
    ) {
        self.record(
            statement,
            values,
            duration,
            ProfileOutcome::Failure(error.to_string()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DriverError;

    #[test]
    fn test_records_success_and_failure() {
        let profiler = MemoryProfiler::new();
        let values = BindValues::from([("id", 1)]);

        profiler.on_success("SELECT 1", &values, Duration::from_millis(5));
        profiler.on_failure(
            "SELECT x",
            &BindValues::new(),
            Duration::from_millis(1),
            &SqlFetchError::ConnectionFailed(DriverError::new("gone")),
        );

        let entries = profiler.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].statement, "SELECT 1");
        assert_eq!(entries[0].values, values);
        assert_eq!(entries[0].outcome, ProfileOutcome::Success);
        assert!(entries[0].started_at <= entries[0].finished_at);
        assert!(matches!(&entries[1].outcome, ProfileOutcome::Failure(m) if m.contains("gone")));
    }

    #[test]
    fn test_inactive_profiler_records_nothing() {
        let profiler = MemoryProfiler::new();
        profiler.set_active(false);
        profiler.on_success("SELECT 1", &BindValues::new(), Duration::ZERO);
        assert!(profiler.entries().is_empty());

        profiler.set_active(true);
        profiler.on_success("SELECT 1", &BindValues::new(), Duration::ZERO);
        profiler.reset();
        assert!(profiler.entries().is_empty());
    }
}
