//! Periodic refresh serialization.

use std::time::{Duration, Instant};

/// Allows one refresh cycle in flight at a time.
#[derive(Debug, Default)]
pub struct RefreshGate {
    started: Option<Instant>,
    skipped: u64,
}

impl RefreshGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` (and counts a skip) while a cycle is running.
    pub fn try_begin(&mut self, now: Instant) -> bool {
        if self.started.is_some() {
            self.skipped += 1;
            return false;
        }
        self.started = Some(now);
        true
    }

    /// Ends the running cycle, returning how long it took.
    pub fn finish(&mut self, now: Instant) -> Option<Duration> {
        self.started
            .take()
            .map(|started| now.saturating_duration_since(started))
    }

    pub fn in_flight(&self) -> bool {
        self.started.is_some()
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}
