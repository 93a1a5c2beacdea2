//! Progress reporting for long editor operations

use std::time::{Duration, Instant};

/// Logs a task when it starts and how long it took when dropped
pub struct ScopedSlowTask {
    label: String,
    start: Instant,
}

impl ScopedSlowTask {
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        log::info!("{label}");
        Self {
            label,
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for ScopedSlowTask {
    fn drop(&mut self) {
        log::debug!("{} done in {:.2?}", self.label, self.elapsed());
    }
}
