use std::time::Duration;

use crate::error::SqlFetchError;
use crate::types::BindValues;

/// Observer notified around every statement execution.
///
/// Implementations must not assume their calls can influence the query:
/// return values are ignored and panics are caught and logged by the caller.
pub trait Profiler: Send + Sync {
    fn on_before(&self, _statement: &str, _values: &BindValues) {}

    fn on_success(&self, _statement: &str, _values: &BindValues, _duration: Duration) {}

    fn on_failure(
        &self,
        _statement: &str,
        _values: &BindValues,
        _duration: Duration,
        _error: &SqlFetchError,
    ) {
    }
}

/// Profiler that records nothing. Used when no profiler is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProfiler;

impl Profiler for NoopProfiler {}
