use std::time::{Duration, Instant};

/// Trailing-edge debounce timer.
///
/// Every [`Debouncer::trigger`] pushes the deadline to `now + window`; the
/// owner fires once the deadline has passed without another trigger. Time is
/// always passed in, so the timer never reads a clock on its own.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
    coalesced: u32,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
            coalesced: 0,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Records a trigger at `now`, resetting the deadline.
    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
        self.coalesced = self.coalesced.saturating_add(1);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }

    /// Fires if due: clears the pending state and returns how many triggers
    /// were coalesced into this firing.
    pub fn fire(&mut self, now: Instant) -> Option<u32> {
        if !self.is_due(now) {
            return None;
        }
        self.deadline = None;
        Some(std::mem::take(&mut self.coalesced))
    }

    /// Fires regardless of the deadline, if anything is pending.
    pub fn flush(&mut self) -> Option<u32> {
        self.deadline.take()?;
        Some(std::mem::take(&mut self.coalesced))
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
        self.coalesced = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::Debouncer;
    use std::time::{Duration, Instant};

    #[test]
    fn rapid_triggers_coalesce_into_one_firing() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(200));
        for i in 0..5 {
            d.trigger(t0 + Duration::from_millis(i * 50));
        }
        // Last trigger at 200ms, so the deadline is 400ms.
        assert_eq!(d.fire(t0 + Duration::from_millis(399)), None);
        assert_eq!(d.fire(t0 + Duration::from_millis(400)), Some(5));
        assert!(!d.is_pending());
        assert_eq!(d.fire(t0 + Duration::from_secs(5)), None);
    }

    #[test]
    fn flush_ignores_deadline() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(200));
        assert_eq!(d.flush(), None);
        d.trigger(t0);
        assert_eq!(d.flush(), Some(1));
        assert!(d.deadline().is_none());
    }

    #[test]
    fn cancel_drops_pending_trigger() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(10));
        d.trigger(t0);
        d.cancel();
        assert_eq!(d.fire(t0 + Duration::from_secs(1)), None);
    }
}
