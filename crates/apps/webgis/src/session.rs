//! One client session: the project data, the filter and every visual
//! binding derived from them.
//!
//! Every repository mutation is followed by an area-index rebuild and a
//! visibility pass before anything else reads the state.

use std::time::{Duration, Instant};

use catalog::area_index::AreaIndex;
use catalog::filter::{compute_visible, FilterState, VisibilityPolicy, VisibleSets};
use catalog::loader::{FailurePolicy, FeedFetch, FeedIngest};
use catalog::project::{AdminLevel, Category, Project};
use catalog::repository::{ProjectRepository, ReconcileReport};
use compute::dashboard::{DashboardAggregator, DashboardSummary, DashboardSurface};
use compute::status::StatusBreakdownMode;
use formats::boundary::BoundaryCollection;
use foundation::ids::ProjectId;
use layers::boundary::{AreaPick, BoundaryLayers, WHOLE_REGION_LABEL};
use runtime::budget::BatchProgress;
use runtime::metrics::{Counter, Gauge, Metrics};
use scene::markers::{MarkerClick, MarkerReconciler};
use scene::surface::{LayerHandle, MapSurface, MarkerHandle};
use tracing::{info, warn};

use crate::config::AppConfig;

pub const LOAD_FAILURE_NOTICE: &str = "Gagal memuatkan data projek. Sila cuba lagi sebentar.";

#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub batch_size: u32,
    pub debounce: Duration,
    pub status_mode: StatusBreakdownMode,
    pub visibility: VisibilityPolicy,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for SessionOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            debounce: config.debounce,
            status_mode: config.status_mode,
            visibility: config.visibility,
        }
    }
}

/// What one load or refresh cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleSummary {
    pub initial: bool,
    pub report: ReconcileReport,
    pub failures: usize,
    pub unchanged: usize,
    pub all_failed: bool,
}

pub struct Session<M, D> {
    repo: ProjectRepository,
    index: AreaIndex,
    filter: FilterState,
    policy: VisibilityPolicy,
    visible: VisibleSets,
    markers: MarkerReconciler,
    boundaries: BoundaryLayers,
    dashboard: DashboardAggregator,
    ingest: FeedIngest,
    metrics: Metrics,
    loaded_once: bool,
    map: M,
    panel: D,
}

impl<M: MapSurface, D: DashboardSurface> Session<M, D> {
    pub fn new(options: SessionOptions, map: M, mut panel: D) -> Self {
        panel.set_selected_area(WHOLE_REGION_LABEL);
        let repo = ProjectRepository::new();
        let index = AreaIndex::build(&repo);
        Self {
            repo,
            index,
            filter: FilterState::new(),
            policy: options.visibility,
            visible: VisibleSets::default(),
            markers: MarkerReconciler::new(options.batch_size),
            boundaries: BoundaryLayers::new(),
            dashboard: DashboardAggregator::new(options.debounce, options.status_mode),
            ingest: FeedIngest::new(),
            metrics: Metrics::new(),
            loaded_once: false,
            map,
            panel,
        }
    }

    pub fn repository(&self) -> &ProjectRepository {
        &self.repo
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn visible(&self) -> &VisibleSets {
        &self.visible
    }

    pub fn markers(&self) -> &MarkerReconciler {
        &self.markers
    }

    pub fn boundaries(&self) -> &BoundaryLayers {
        &self.boundaries
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn panel(&self) -> &D {
        &self.panel
    }

    pub fn last_summary(&self) -> Option<&DashboardSummary> {
        self.dashboard.last()
    }

    pub fn has_loaded(&self) -> bool {
        self.loaded_once
    }

    pub fn record_skipped_refresh(&mut self) {
        self.metrics.inc(Counter::RefreshSkipped, 1);
    }

    /// Normalizes fetched feeds and reconciles the result.
    ///
    /// The first cycle drops failing feeds; later cycles keep their last good
    /// data. A refresh in which no feed produced anything changes nothing.
    pub fn ingest(&mut self, fetched: Vec<FeedFetch>, now: Instant) -> CycleSummary {
        let initial = !self.loaded_once;
        let policy = if initial {
            FailurePolicy::Empty
        } else {
            FailurePolicy::KeepLastGood
        };
        let outcome = self.ingest.ingest_all(fetched, policy);
        let failures = outcome.failures();
        let unchanged = outcome.unchanged();
        let all_failed = outcome.all_failed();

        let report = if all_failed && !initial {
            warn!("every feed failed; keeping the current projects");
            ReconcileReport::default()
        } else {
            if all_failed {
                warn!("initial load failed for every feed");
                self.panel.show_notice(LOAD_FAILURE_NOTICE);
            }
            self.apply_snapshot(outcome.projects, now)
        };
        self.loaded_once = true;

        self.metrics.inc(Counter::RefreshCycles, 1);
        self.metrics.inc(Counter::FeedFailures, failures as u64);
        self.metrics.inc(Counter::FeedsUnchanged, unchanged as u64);
        info!(
            initial,
            projects = self.repo.len(),
            added = report.added.len(),
            updated = report.updated.len(),
            removed = report.removed.len(),
            failures,
            "feeds reconciled"
        );

        CycleSummary {
            initial,
            report,
            failures,
            unchanged,
            all_failed,
        }
    }

    /// Makes the repository equal to `projects` and brings every derived
    /// structure up to date with it.
    pub fn apply_snapshot(&mut self, projects: Vec<Project>, now: Instant) -> ReconcileReport {
        let report = self.repo.reconcile(projects);
        if report.duplicates > 0 {
            warn!(duplicates = report.duplicates, "duplicate project ids dropped");
        }
        self.index.rebuild(&self.repo);
        let stats = self.markers.apply_report(&self.repo, &report, &mut self.map);

        self.metrics.inc(Counter::ProjectsAdded, report.added.len() as u64);
        self.metrics.inc(Counter::ProjectsUpdated, report.updated.len() as u64);
        self.metrics.inc(Counter::ProjectsRemoved, report.removed.len() as u64);
        self.metrics.inc(Counter::MarkersMoved, stats.moved as u64);
        self.metrics.inc(Counter::MarkersDestroyed, stats.destroyed as u64);
        self.metrics.set(Gauge::Projects, self.repo.len() as u64);

        self.refresh_visibility(now);
        report
    }

    pub fn pending_markers(&self) -> usize {
        self.markers.pending()
    }

    /// Creates one batch of queued markers.
    pub fn create_marker_batch(&mut self, now: Instant) -> BatchProgress {
        let progress = self
            .markers
            .create_batch(&self.repo, &self.visible, &mut self.map);
        self.metrics.inc(Counter::MarkersCreated, progress.done as u64);
        self.metrics.set(Gauge::PendingMarkers, progress.remaining as u64);
        self.metrics
            .set(Gauge::VisibleMarkers, self.markers.visible_count() as u64);
        if progress.done > 0 {
            self.dashboard.request(now);
        }
        progress
    }

    /// Creates every queued marker at once.
    pub fn drain_markers(&mut self, now: Instant) -> usize {
        let mut created = 0;
        while self.pending_markers() > 0 {
            created += self.create_marker_batch(now).done;
        }
        created
    }

    pub fn dashboard_deadline(&self) -> Option<Instant> {
        self.dashboard.deadline()
    }

    pub fn poll_dashboard(&mut self, now: Instant) -> bool {
        let fired = self
            .dashboard
            .poll(now, &self.repo, &self.visible, &mut self.panel)
            .is_some();
        if fired {
            self.metrics.inc(Counter::DashboardRecomputes, 1);
        }
        fired
    }

    pub fn flush_dashboard(&mut self) -> bool {
        let fired = self
            .dashboard
            .flush(&self.repo, &self.visible, &mut self.panel)
            .is_some();
        if fired {
            self.metrics.inc(Counter::DashboardRecomputes, 1);
        }
        fired
    }

    pub fn set_category(&mut self, category: Category, on: bool, now: Instant) -> bool {
        let changed = self.filter.set_category(category, on);
        if changed {
            self.refresh_visibility(now);
        }
        changed
    }

    /// Returns whether the category is now active.
    pub fn toggle_category(&mut self, category: Category, now: Instant) -> bool {
        let on = self.filter.toggle_category(category);
        self.refresh_visibility(now);
        on
    }

    pub fn set_search(&mut self, text: &str, now: Instant) {
        if self.filter.search() == text {
            return;
        }
        self.filter.set_search(text);
        self.refresh_visibility(now);
    }

    pub fn install_boundary(&mut self, level: AdminLevel, layer: BoundaryCollection) -> LayerHandle {
        self.boundaries.install(level, layer, &mut self.map)
    }

    pub fn activate_layer(&mut self, level: AdminLevel) {
        self.boundaries.activate(level, &mut self.map);
    }

    pub fn select_area(&mut self, level: AdminLevel, feature: usize, now: Instant) -> Option<AreaPick> {
        let pick = self
            .boundaries
            .select_area(level, feature, &mut self.filter, &mut self.map)?;
        self.panel.set_selected_area(&pick.label);
        self.refresh_visibility(now);
        Some(pick)
    }

    pub fn select_area_named(&mut self, level: AdminLevel, name: &str, now: Instant) -> Option<AreaPick> {
        let feature = self.boundaries.find_feature(level, name)?;
        self.select_area(level, feature, now)
    }

    pub fn clear_area(&mut self, now: Instant) {
        self.boundaries.deactivate_area(&mut self.filter, &mut self.map);
        self.panel.set_selected_area(WHOLE_REGION_LABEL);
        self.refresh_visibility(now);
    }

    pub fn hover_area(&mut self, level: AdminLevel, feature: usize) {
        self.boundaries.hover(level, feature, &mut self.map);
    }

    pub fn unhover_area(&mut self) {
        self.boundaries.unhover(&mut self.map);
    }

    /// Shows the project's detail and labels the dashboard with its district.
    /// Filters are untouched.
    pub fn click_marker(&mut self, handle: MarkerHandle) -> Option<MarkerClick> {
        let click = self.markers.click(handle, &self.repo, &mut self.map)?;
        let label = if click.district.is_empty() {
            WHOLE_REGION_LABEL
        } else {
            click.district.as_str()
        };
        self.panel.set_selected_area(label);
        Some(click)
    }

    pub fn click_project(&mut self, id: &ProjectId) -> Option<MarkerClick> {
        let handle = self.markers.handle(id)?;
        self.click_marker(handle)
    }

    fn refresh_visibility(&mut self, now: Instant) {
        if !self.index.is_current(&self.repo) {
            self.index.rebuild(&self.repo);
        }
        self.visible = compute_visible(&self.repo, &self.filter, &self.index, self.policy);
        self.markers
            .apply_visibility(&self.repo, &self.visible, &mut self.map);
        self.dashboard.request(now);

        self.metrics
            .set(Gauge::VisibleMarkers, self.markers.visible_count() as u64);
        self.metrics
            .set(Gauge::CountedProjects, self.visible.counted.len() as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::{Session, SessionOptions, LOAD_FAILURE_NOTICE};
    use catalog::loader::{FeedError, FeedFetch};
    use catalog::project::{AdminLevel, Category, FeedIdentity};
    use compute::dashboard::RecordingDashboard;
    use formats::boundary::BoundaryCollection;
    use foundation::ids::ProjectId;
    use layers::boundary::WHOLE_REGION_LABEL;
    use runtime::metrics::Counter;
    use scene::markers::MarkerState;
    use scene::surface::{RecordingSurface, SurfaceCall};
    use std::time::Instant;

    type TestSession = Session<RecordingSurface, RecordingDashboard>;

    fn session() -> TestSession {
        Session::new(
            SessionOptions::default(),
            RecordingSurface::new(),
            RecordingDashboard::default(),
        )
    }

    /// `(site, district, lat, lng, status)`
    fn envelope(rows: &[(&str, &str, f64, f64, &str)]) -> String {
        let rows: Vec<String> = rows
            .iter()
            .map(|(site, district, lat, lng, status)| {
                format!(
                    r#"{{"c":[{{"v":"{site}"}},{{"v":"{district}"}},{{"v":{lat}}},{{"v":{lng}}},{{"v":"{status}"}}]}}"#
                )
            })
            .collect();
        format!(
            r#"google.visualization.Query.setResponse({{"status":"ok","table":{{"cols":[{{"label":"SITE_NAME"}},{{"label":"DISTRICT"}},{{"label":"LATITUDE"}},{{"label":"LONGITUDE"}},{{"label":"STATUS"}}],"rows":[{}]}}}});"#,
            rows.join(",")
        )
    }

    fn ok(key: &str, category: Category, body: String) -> FeedFetch {
        FeedFetch {
            feed: FeedIdentity::new(key, category),
            result: Ok(body),
        }
    }

    fn failed(key: &str, category: Category) -> FeedFetch {
        FeedFetch {
            feed: FeedIdentity::new(key, category),
            result: Err(FeedError::new("timeout")),
        }
    }

    fn districts() -> BoundaryCollection {
        BoundaryCollection::from_geojson_str(
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","properties":{"NAME":"Kota Kinabalu"},
                 "geometry":{"type":"Polygon","coordinates":[[[116.0,5.8],[116.2,5.8],[116.2,6.1],[116.0,5.8]]]}},
                {"type":"Feature","properties":{"NAME":"Tawau"},
                 "geometry":{"type":"Polygon","coordinates":[[[117.8,4.1],[118.1,4.1],[118.1,4.4],[117.8,4.1]]]}}]}"#,
        )
        .unwrap()
    }

    fn kk_fixture(s: &mut TestSession, now: Instant) {
        let towers = envelope(&[
            ("T1", "Kota Kinabalu", 5.97, 116.07, "Siap"),
            ("T2", "Kota Kinabalu", 5.98, 116.08, "Pembinaan"),
            ("T3", "Kota Kinabalu", 5.99, 116.09, "Siap"),
            ("T4", "Tawau", 4.25, 117.89, "Siap"),
            ("T5", "Sandakan", 5.84, 118.11, "Siap"),
        ]);
        let nadi = envelope(&[("N1", "Kota Kinabalu", 5.95, 116.06, "Siap")]);
        s.ingest(
            vec![
                ok("tower", Category::Tower, towers),
                ok("db_pim", Category::Nadi, nadi),
            ],
            now,
        );
        s.drain_markers(now);
    }

    #[test]
    fn area_selection_narrows_markers_but_counts_every_category() {
        let now = Instant::now();
        let mut s = session();
        s.install_boundary(AdminLevel::District, districts());
        kk_fixture(&mut s, now);

        s.set_category(Category::Nadi, false, now);
        let pick = s
            .select_area_named(AdminLevel::District, "Kota Kinabalu", now)
            .unwrap();
        assert_eq!(pick.label, "Kota Kinabalu");
        s.flush_dashboard();

        assert_eq!(s.visible().markers.len(), 3);
        assert_eq!(s.map().visible_marker_count(), 3);
        assert_eq!(s.panel().total, Some(4));
        assert_eq!(s.panel().selected_area.as_deref(), Some("Kota Kinabalu"));
        assert_eq!(s.last_summary().map(|d| d.count(Category::Tower)), Some(3));
    }

    #[test]
    fn one_failed_feed_still_loads_the_rest() {
        let now = Instant::now();
        let mut s = session();
        let summary = s.ingest(
            vec![
                ok("db_bwa", Category::Bwa, envelope(&[("B1", "Kudat", 6.88, 116.84, "")])),
                failed("db_pim", Category::Nadi),
                ok("db_POP", Category::Pop, envelope(&[("P1", "Tawau", 4.2, 117.9, "")])),
                ok("tower", Category::Tower, envelope(&[("T1", "Tawau", 4.3, 117.8, "")])),
            ],
            now,
        );
        assert_eq!(summary.failures, 1);
        assert!(!summary.all_failed);
        assert_eq!(s.repository().len(), 3);
        assert!(s.panel().notices.is_empty());
    }

    #[test]
    fn total_initial_failure_shows_one_notice_and_stays_usable() {
        let now = Instant::now();
        let mut s = session();
        let summary = s.ingest(
            vec![failed("a", Category::Bwa), failed("b", Category::Tower)],
            now,
        );
        assert!(summary.all_failed);
        assert_eq!(s.panel().notices, vec![LOAD_FAILURE_NOTICE.to_string()]);
        assert!(s.repository().is_empty());

        s.toggle_category(Category::Bwa, now);
        s.set_search("anything", now);
        assert!(s.flush_dashboard());
        assert_eq!(s.panel().total, Some(0));
    }

    #[test]
    fn refresh_keeps_markers_of_a_feed_that_went_down() {
        let now = Instant::now();
        let mut s = session();
        kk_fixture(&mut s, now);
        let handle = s.markers().handle(&ProjectId::new("tower_0")).unwrap();

        let nadi = envelope(&[("N1", "Kota Kinabalu", 5.95, 116.06, "Siap")]);
        let summary = s.ingest(
            vec![failed("tower", Category::Tower), ok("db_pim", Category::Nadi, nadi)],
            now,
        );
        s.drain_markers(now);

        assert!(!summary.initial);
        assert!(summary.report.is_noop());
        assert_eq!(summary.unchanged, 1);
        assert_eq!(s.repository().len(), 6);
        assert_eq!(s.markers().handle(&ProjectId::new("tower_0")), Some(handle));
        assert_eq!(
            s.map()
                .count_calls(|c| matches!(c, SurfaceCall::CreateMarker(_))),
            6
        );
    }

    #[test]
    fn refresh_removes_and_adds_markers() {
        let now = Instant::now();
        let mut s = session();
        s.ingest(
            vec![ok(
                "f1",
                Category::Tower,
                envelope(&[("A", "Tawau", 4.2, 117.9, ""), ("B", "Tawau", 4.3, 117.8, "")]),
            )],
            now,
        );
        s.drain_markers(now);
        let kept = s.markers().handle(&ProjectId::new("f1_1")).unwrap();

        // Row 0 loses its site name and is rejected; a new row 2 appears.
        s.ingest(
            vec![ok(
                "f1",
                Category::Tower,
                envelope(&[
                    ("", "Tawau", 4.2, 117.9, ""),
                    ("B", "Tawau", 4.3, 117.8, ""),
                    ("C", "Kudat", 6.9, 116.8, ""),
                ]),
            )],
            now,
        );
        s.drain_markers(now);

        assert_eq!(s.markers().state(&ProjectId::new("f1_0")), MarkerState::Absent);
        assert_eq!(s.markers().handle(&ProjectId::new("f1_1")), Some(kept));
        assert_eq!(s.markers().state(&ProjectId::new("f1_2")), MarkerState::Visible);
        assert_eq!(s.metrics().counter(Counter::MarkersDestroyed), 1);
        assert_eq!(s.metrics().counter(Counter::MarkersCreated), 3);
        assert_eq!(s.metrics().counter(Counter::RefreshCycles), 2);
    }

    #[test]
    fn marker_click_labels_the_district_without_filtering() {
        let now = Instant::now();
        let mut s = session();
        kk_fixture(&mut s, now);

        let click = s.click_project(&ProjectId::new("tower_3")).unwrap();
        assert_eq!(click.district, "Tawau");
        assert_eq!(s.panel().selected_area.as_deref(), Some("Tawau"));
        assert!(s.filter().area().is_none());
        assert_eq!(s.visible().markers.len(), 6);
    }

    #[test]
    fn clearing_the_area_restores_the_whole_region() {
        let now = Instant::now();
        let mut s = session();
        s.install_boundary(AdminLevel::District, districts());
        kk_fixture(&mut s, now);

        s.select_area_named(AdminLevel::District, "Tawau", now);
        assert_eq!(s.visible().markers.len(), 1);
        s.clear_area(now);
        assert_eq!(s.visible().markers.len(), 6);
        assert_eq!(s.panel().selected_area.as_deref(), Some(WHOLE_REGION_LABEL));
        assert_eq!(s.boundaries().active(), Some(AdminLevel::District));
    }

    #[test]
    fn boundary_arriving_after_projects_is_usable() {
        let now = Instant::now();
        let mut s = session();
        s.activate_layer(AdminLevel::District);
        kk_fixture(&mut s, now);
        assert!(s.select_area_named(AdminLevel::District, "Tawau", now).is_none());

        s.install_boundary(AdminLevel::District, districts());
        assert_eq!(s.map().visible_layers(), vec!["district"]);
        assert!(s.select_area_named(AdminLevel::District, "Tawau", now).is_some());
    }
}
