//! Trace-level scoped timers, grounded on the teacher's `ScopedTimer`. The engine never
//! installs a process-wide logger; a caller's `log` backend of choice decides what surfaces.

use log::{log_enabled, Level};
use std::time::{Duration, Instant};

/// Logs entry/exit of a labelled section at trace level via `Drop`.
pub struct ScopedTimer<'a> {
    label: &'a str,
    start: Instant,
}

impl<'a> ScopedTimer<'a> {
    pub fn new(label: &'a str) -> Self {
        if log_enabled!(Level::Trace) {
            log::trace!("step: start {label}");
        }
        Self { label, start: Instant::now() }
    }
}

impl<'a> Drop for ScopedTimer<'a> {
    fn drop(&mut self) {
        if log_enabled!(Level::Trace) {
            log::trace!("step: end {} ({} us)", self.label, self.start.elapsed().as_micros());
        }
    }
}

/// Convenience hook a caller can invoke after `World::step` to log a budget overrun.
/// Never called internally: the engine does not impose a frame budget on itself.
pub fn warn_if_frame_budget_exceeded(duration: Duration, budget_ms: f32) {
    if duration.as_secs_f32() * 1000.0 > budget_ms {
        log::warn!(
            "step exceeded budget: {:.2} ms > {:.2} ms",
            duration.as_secs_f32() * 1000.0,
            budget_ms
        );
    }
}
