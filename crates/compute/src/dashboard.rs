//! Summary counts over the dashboard-count set.

use std::time::{Duration, Instant};

use catalog::filter::VisibleSets;
use catalog::project::Category;
use catalog::repository::ProjectRepository;
use foundation::selection::SlotSet;
use runtime::debounce::Debouncer;

use crate::status::{StatusBreakdownMode, status_breakdown};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// Categories always listed on the dashboard, even at zero.
pub const DASHBOARD_CATEGORIES: [Category; 4] =
    [Category::Bwa, Category::Nadi, Category::Pop, Category::Tower];

/// Dashboard outputs.
pub trait DashboardSurface {
    fn set_total(&mut self, total: usize);
    fn set_category_counts(&mut self, counts: &[(Category, usize)]);
    fn set_status_breakdown(&mut self, breakdown: &[(String, usize)]);
    fn show_notice(&mut self, message: &str);
    fn set_selected_area(&mut self, label: &str);
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardSummary {
    pub total: usize,
    /// Every entry of [`DASHBOARD_CATEGORIES`], then `Unknown` if non-zero.
    pub by_category: Vec<(Category, usize)>,
    pub status: Vec<(String, usize)>,
}

impl DashboardSummary {
    pub fn compute(repo: &ProjectRepository, counted: &SlotSet, mode: StatusBreakdownMode) -> Self {
        let projects: Vec<_> = counted.iter().filter_map(|slot| repo.project(slot)).collect();

        let mut by_category: Vec<(Category, usize)> = DASHBOARD_CATEGORIES
            .into_iter()
            .map(|c| (c, projects.iter().filter(|p| p.category == c).count()))
            .collect();
        let unknown = projects
            .iter()
            .filter(|p| p.category == Category::Unknown)
            .count();
        if unknown > 0 {
            by_category.push((Category::Unknown, unknown));
        }

        Self {
            total: projects.len(),
            by_category,
            status: status_breakdown(projects.iter().map(|p| p.status.as_str()), mode),
        }
    }

    pub fn count(&self, category: Category) -> usize {
        self.by_category
            .iter()
            .find(|(c, _)| *c == category)
            .map_or(0, |(_, n)| *n)
    }

    pub fn publish(&self, surface: &mut dyn DashboardSurface) {
        surface.set_total(self.total);
        surface.set_category_counts(&self.by_category);
        surface.set_status_breakdown(&self.status);
    }
}

/// Owns the debounce timer in front of the dashboard recompute.
#[derive(Debug)]
pub struct DashboardAggregator {
    debouncer: Debouncer,
    mode: StatusBreakdownMode,
    last: Option<DashboardSummary>,
    recomputes: u64,
}

impl Default for DashboardAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE, StatusBreakdownMode::default())
    }
}

impl DashboardAggregator {
    pub fn new(window: Duration, mode: StatusBreakdownMode) -> Self {
        Self {
            debouncer: Debouncer::new(window),
            mode,
            last: None,
            recomputes: 0,
        }
    }

    pub fn mode(&self) -> StatusBreakdownMode {
        self.mode
    }

    pub fn last(&self) -> Option<&DashboardSummary> {
        self.last.as_ref()
    }

    pub fn recomputes(&self) -> u64 {
        self.recomputes
    }

    /// Schedules a recompute, pushing back any pending one.
    pub fn request(&mut self, now: Instant) {
        self.debouncer.trigger(now);
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// Recomputes if the debounce window has elapsed.
    pub fn poll(
        &mut self,
        now: Instant,
        repo: &ProjectRepository,
        visible: &VisibleSets,
        surface: &mut dyn DashboardSurface,
    ) -> Option<&DashboardSummary> {
        let coalesced = self.debouncer.fire(now)?;
        tracing::trace!(coalesced, "dashboard debounce fired");
        Some(self.recompute(repo, visible, surface))
    }

    /// Recomputes now if anything is pending.
    pub fn flush(
        &mut self,
        repo: &ProjectRepository,
        visible: &VisibleSets,
        surface: &mut dyn DashboardSurface,
    ) -> Option<&DashboardSummary> {
        self.debouncer.flush()?;
        Some(self.recompute(repo, visible, surface))
    }

    pub fn recompute(
        &mut self,
        repo: &ProjectRepository,
        visible: &VisibleSets,
        surface: &mut dyn DashboardSurface,
    ) -> &DashboardSummary {
        self.debouncer.cancel();
        let summary = DashboardSummary::compute(repo, &visible.counted, self.mode);
        summary.publish(surface);
        self.recomputes += 1;
        self.last.insert(summary)
    }
}

/// Dashboard that keeps the last value of every output.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecordingDashboard {
    pub total: Option<usize>,
    pub category_counts: Vec<(Category, usize)>,
    pub status: Vec<(String, usize)>,
    pub notices: Vec<String>,
    pub selected_area: Option<String>,
    pub updates: usize,
}

impl DashboardSurface for RecordingDashboard {
    fn set_total(&mut self, total: usize) {
        self.total = Some(total);
        self.updates += 1;
    }

    fn set_category_counts(&mut self, counts: &[(Category, usize)]) {
        self.category_counts = counts.to_vec();
    }

    fn set_status_breakdown(&mut self, breakdown: &[(String, usize)]) {
        self.status = breakdown.to_vec();
    }

    fn show_notice(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }

    fn set_selected_area(&mut self, label: &str) {
        self.selected_area = Some(label.to_string());
    }
}
