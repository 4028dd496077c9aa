use std::collections::BTreeMap;
use std::fmt;

/// Session counters tracked across refresh cycles.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Counter {
    RefreshCycles,
    RefreshSkipped,
    FeedFailures,
    FeedsUnchanged,
    ProjectsAdded,
    ProjectsUpdated,
    ProjectsRemoved,
    MarkersCreated,
    MarkersMoved,
    MarkersDestroyed,
    DashboardRecomputes,
}

impl Counter {
    pub fn name(&self) -> &'static str {
        match self {
            Counter::RefreshCycles => "refresh_cycles",
            Counter::RefreshSkipped => "refresh_skipped",
            Counter::FeedFailures => "feed_failures",
            Counter::FeedsUnchanged => "feeds_unchanged",
            Counter::ProjectsAdded => "projects_added",
            Counter::ProjectsUpdated => "projects_updated",
            Counter::ProjectsRemoved => "projects_removed",
            Counter::MarkersCreated => "markers_created",
            Counter::MarkersMoved => "markers_moved",
            Counter::MarkersDestroyed => "markers_destroyed",
            Counter::DashboardRecomputes => "dashboard_recomputes",
        }
    }
}

/// Point-in-time values that are overwritten rather than accumulated.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Gauge {
    Projects,
    VisibleMarkers,
    CountedProjects,
    PendingMarkers,
}

impl Gauge {
    pub fn name(&self) -> &'static str {
        match self {
            Gauge::Projects => "projects",
            Gauge::VisibleMarkers => "visible_markers",
            Gauge::CountedProjects => "counted_projects",
            Gauge::PendingMarkers => "pending_markers",
        }
    }
}

/// Deterministic metrics aggregation.
///
/// Sorted maps keep snapshots and log lines in a stable order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Metrics {
    counters: BTreeMap<Counter, u64>,
    gauges: BTreeMap<Gauge, u64>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self, counter: Counter) -> u64 {
        self.counters.get(&counter).copied().unwrap_or(0)
    }

    pub fn inc(&mut self, counter: Counter, by: u64) {
        if by == 0 {
            return;
        }
        *self.counters.entry(counter).or_insert(0) += by;
    }

    pub fn gauge(&self, gauge: Gauge) -> Option<u64> {
        self.gauges.get(&gauge).copied()
    }

    pub fn set(&mut self, gauge: Gauge, value: u64) {
        self.gauges.insert(gauge, value);
    }

    /// Stable `(name, value)` pairs, counters first.
    pub fn snapshot(&self) -> Vec<(&'static str, u64)> {
        self.counters
            .iter()
            .map(|(k, v)| (k.name(), *v))
            .chain(self.gauges.iter().map(|(k, v)| (k.name(), *v)))
            .collect()
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, value) in self.snapshot() {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            write!(f, "{name}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Counter, Gauge, Metrics};

    #[test]
    fn counters_accumulate() {
        let mut m = Metrics::new();
        m.inc(Counter::MarkersCreated, 300);
        m.inc(Counter::MarkersCreated, 12);
        assert_eq!(m.counter(Counter::MarkersCreated), 312);
        assert_eq!(m.counter(Counter::FeedFailures), 0);
    }

    #[test]
    fn gauges_overwrite() {
        let mut m = Metrics::new();
        assert_eq!(m.gauge(Gauge::Projects), None);
        m.set(Gauge::Projects, 10);
        m.set(Gauge::Projects, 11);
        assert_eq!(m.gauge(Gauge::Projects), Some(11));
    }

    #[test]
    fn display_is_stably_ordered() {
        let mut m = Metrics::new();
        m.inc(Counter::FeedFailures, 1);
        m.inc(Counter::RefreshCycles, 2);
        m.set(Gauge::VisibleMarkers, 7);
        assert_eq!(
            m.to_string(),
            "refresh_cycles=2 feed_failures=1 visible_markers=7"
        );
    }
}
