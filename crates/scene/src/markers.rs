//! Project ↔ marker bindings.
//!
//! Each project id moves through `Absent → Hidden ↔ Visible → Absent`.
//! A marker is created once per id and only destroyed when the id leaves the
//! repository; filter changes only flip visibility.

use std::collections::{HashMap, HashSet, VecDeque};

use catalog::filter::VisibleSets;
use catalog::repository::{ProjectRepository, ReconcileReport};
use foundation::geo::LatLng;
use foundation::ids::ProjectId;
use runtime::budget::{BatchBudget, BatchProgress};

use crate::detail::ProjectDetail;
use crate::style::marker_style;
use crate::surface::{MapSurface, MarkerHandle};

pub const DEFAULT_BATCH_SIZE: u32 = 300;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MarkerState {
    Absent,
    Hidden,
    Visible,
}

#[derive(Debug, Clone)]
struct Binding {
    handle: MarkerHandle,
    position: LatLng,
    title: String,
    visible: bool,
}

/// What [`MarkerReconciler::apply_report`] did.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct MarkerSyncStats {
    pub queued: usize,
    pub retitled: usize,
    pub moved: usize,
    pub destroyed: usize,
}

/// Result of clicking a marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerClick {
    pub id: ProjectId,
    pub district: String,
    pub detail: ProjectDetail,
}

#[derive(Debug)]
pub struct MarkerReconciler {
    bindings: HashMap<ProjectId, Binding>,
    by_handle: HashMap<MarkerHandle, ProjectId>,
    backlog: VecDeque<ProjectId>,
    queued: HashSet<ProjectId>,
    batch_size: u32,
}

impl Default for MarkerReconciler {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

impl MarkerReconciler {
    pub fn new(batch_size: u32) -> Self {
        Self {
            bindings: HashMap::new(),
            by_handle: HashMap::new(),
            backlog: VecDeque::new(),
            queued: HashSet::new(),
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> u32 {
        self.batch_size
    }

    /// Number of live markers.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Ids waiting for their marker to be created.
    pub fn pending(&self) -> usize {
        self.backlog.len()
    }

    pub fn visible_count(&self) -> usize {
        self.bindings.values().filter(|b| b.visible).count()
    }

    pub fn state(&self, id: &ProjectId) -> MarkerState {
        match self.bindings.get(id) {
            None => MarkerState::Absent,
            Some(b) if b.visible => MarkerState::Visible,
            Some(_) => MarkerState::Hidden,
        }
    }

    pub fn handle(&self, id: &ProjectId) -> Option<MarkerHandle> {
        self.bindings.get(id).map(|b| b.handle)
    }

    pub fn project_id(&self, handle: MarkerHandle) -> Option<&ProjectId> {
        self.by_handle.get(&handle)
    }

    /// Applies a repository reconciliation: destroys markers of removed ids,
    /// moves and retitles markers of updated projects and queues new ids for
    /// creation.
    pub fn apply_report(
        &mut self,
        repo: &ProjectRepository,
        report: &ReconcileReport,
        surface: &mut dyn MapSurface,
    ) -> MarkerSyncStats {
        let mut stats = MarkerSyncStats::default();

        for id in &report.removed {
            self.queued.remove(id);
            if let Some(binding) = self.bindings.remove(id) {
                self.by_handle.remove(&binding.handle);
                surface.destroy_marker(binding.handle);
                stats.destroyed += 1;
            }
        }
        let queued = &self.queued;
        self.backlog.retain(|id| queued.contains(id));

        for id in &report.updated {
            let (Some(binding), Some(project)) = (self.bindings.get_mut(id), repo.get(id)) else {
                continue;
            };
            if !binding.position.same_position(&project.position) {
                surface.set_marker_position(binding.handle, project.position);
                binding.position = project.position;
                stats.moved += 1;
            }
            if binding.title != project.site_name {
                surface.set_marker_title(binding.handle, &project.site_name);
                binding.title.clone_from(&project.site_name);
                stats.retitled += 1;
            }
        }

        for id in &report.added {
            if self.enqueue(id) {
                stats.queued += 1;
            }
        }

        tracing::debug!(
            queued = stats.queued,
            moved = stats.moved,
            retitled = stats.retitled,
            destroyed = stats.destroyed,
            "marker bindings reconciled"
        );
        stats
    }

    /// Queues every repository project that has no marker yet.
    pub fn queue_missing(&mut self, repo: &ProjectRepository) -> usize {
        let missing: Vec<ProjectId> = repo
            .iter()
            .map(|(_, p)| p.id.clone())
            .filter(|id| !self.bindings.contains_key(id))
            .collect();
        missing.iter().filter(|id| self.enqueue(id)).count()
    }

    /// Creates up to one batch of queued markers.
    ///
    /// New markers are shown right away when `visible` is current for `repo`
    /// and contains them.
    pub fn create_batch(
        &mut self,
        repo: &ProjectRepository,
        visible: &VisibleSets,
        surface: &mut dyn MapSurface,
    ) -> BatchProgress {
        let mut budget = BatchBudget::new(self.batch_size);
        let current = visible.generation == repo.generation();
        let mut done = 0;

        while budget.try_consume(1) {
            let Some(id) = self.backlog.pop_front() else {
                break;
            };
            self.queued.remove(&id);
            if self.bindings.contains_key(&id) {
                continue;
            }
            let Some(slot) = repo.slot_of(&id) else {
                continue;
            };
            let Some(project) = repo.project(slot) else {
                continue;
            };

            let handle = surface.create_marker(
                project.position,
                marker_style(project.category),
                &project.site_name,
            );
            let show = current && visible.markers.contains(slot);
            if show {
                surface.set_marker_visible(handle, true);
            }
            self.bindings.insert(
                id.clone(),
                Binding {
                    handle,
                    position: project.position,
                    title: project.site_name.clone(),
                    visible: show,
                },
            );
            self.by_handle.insert(handle, id);
            done += 1;
        }

        BatchProgress {
            done,
            remaining: self.backlog.len(),
        }
    }

    /// Drives `Hidden ↔ Visible` from the marker-visible set. Returns how many
    /// markers changed.
    pub fn apply_visibility(
        &mut self,
        repo: &ProjectRepository,
        visible: &VisibleSets,
        surface: &mut dyn MapSurface,
    ) -> usize {
        let mut changed = 0;
        for (slot, project) in repo.iter() {
            let Some(binding) = self.bindings.get_mut(&project.id) else {
                continue;
            };
            let show = visible.markers.contains(slot);
            if binding.visible != show {
                surface.set_marker_visible(binding.handle, show);
                binding.visible = show;
                changed += 1;
            }
        }
        changed
    }

    /// Shows the clicked project's detail. Filter state is not touched.
    pub fn click(
        &self,
        handle: MarkerHandle,
        repo: &ProjectRepository,
        surface: &mut dyn MapSurface,
    ) -> Option<MarkerClick> {
        let id = self.by_handle.get(&handle)?;
        let project = repo.get(id)?;
        let detail = ProjectDetail::from_project(project);
        surface.show_detail(project.position, &detail);
        Some(MarkerClick {
            id: id.clone(),
            district: project.district.clone(),
            detail,
        })
    }

    fn enqueue(&mut self, id: &ProjectId) -> bool {
        if self.bindings.contains_key(id) || !self.queued.insert(id.clone()) {
            return false;
        }
        self.backlog.push_back(id.clone());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{MarkerReconciler, MarkerState};
    use crate::surface::{RecordingSurface, SurfaceCall};
    use catalog::area_index::AreaIndex;
    use catalog::filter::{FilterState, VisibilityPolicy, VisibleSets, compute_visible};
    use catalog::project::{Category, Project};
    use catalog::repository::ProjectRepository;
    use foundation::geo::LatLng;
    use foundation::ids::ProjectId;
    use pretty_assertions::assert_eq;

    fn project(id: &str, category: Category, pos: (f64, f64)) -> Project {
        Project {
            id: ProjectId::new(id),
            site_name: format!("Site {id}"),
            district: "Kota Kinabalu".to_string(),
            dun: String::new(),
            parliament: String::new(),
            position: LatLng::new(pos.0, pos.1),
            status: String::new(),
            category,
            extra_fields: Vec::new(),
        }
    }

    fn tower(id: &str) -> Project {
        project(id, Category::Tower, (5.97, 116.07))
    }

    fn visible(repo: &ProjectRepository, filter: &FilterState) -> VisibleSets {
        compute_visible(repo, filter, &AreaIndex::build(repo), VisibilityPolicy::default())
    }

    fn drain(
        markers: &mut MarkerReconciler,
        repo: &ProjectRepository,
        sets: &VisibleSets,
        surface: &mut RecordingSurface,
    ) {
        while markers.pending() > 0 {
            markers.create_batch(repo, sets, surface);
        }
    }

    fn creates(surface: &RecordingSurface) -> usize {
        surface.count_calls(|c| matches!(c, SurfaceCall::CreateMarker(_)))
    }

    fn destroys(surface: &RecordingSurface) -> usize {
        surface.count_calls(|c| matches!(c, SurfaceCall::DestroyMarker(_)))
    }

    #[test]
    fn reconcile_reuses_surviving_markers() {
        let mut repo = ProjectRepository::new();
        let mut markers = MarkerReconciler::default();
        let mut surface = RecordingSurface::new();
        let filter = FilterState::new();

        let report = repo.reconcile(vec![tower("f1_0"), tower("f1_1")]);
        markers.apply_report(&repo, &report, &mut surface);
        drain(&mut markers, &repo, &visible(&repo, &filter), &mut surface);
        let kept = markers.handle(&ProjectId::new("f1_1")).unwrap();
        let dropped = markers.handle(&ProjectId::new("f1_0")).unwrap();
        surface.take_calls();

        let report = repo.reconcile(vec![tower("f1_1"), tower("f1_2")]);
        let stats = markers.apply_report(&repo, &report, &mut surface);
        drain(&mut markers, &repo, &visible(&repo, &filter), &mut surface);

        assert_eq!(stats.destroyed, 1);
        assert_eq!(creates(&surface), 1);
        assert_eq!(destroys(&surface), 1);
        assert!(surface.calls().contains(&SurfaceCall::DestroyMarker(dropped)));
        assert_eq!(markers.handle(&ProjectId::new("f1_1")), Some(kept));
        assert_eq!(markers.state(&ProjectId::new("f1_0")), MarkerState::Absent);
        assert_eq!(markers.state(&ProjectId::new("f1_2")), MarkerState::Visible);
        assert_eq!(markers.len(), 2);
    }

    #[test]
    fn toggling_categories_never_recreates() {
        let repo = ProjectRepository::from_snapshot(vec![
            tower("t1"),
            project("n1", Category::Nadi, (5.9, 116.1)),
        ]);
        let mut markers = MarkerReconciler::default();
        let mut surface = RecordingSurface::new();
        let mut filter = FilterState::new();
        markers.queue_missing(&repo);
        drain(&mut markers, &repo, &visible(&repo, &filter), &mut surface);
        assert_eq!(surface.visible_marker_count(), 2);

        for _ in 0..5 {
            filter.toggle_category(Category::Tower);
            markers.apply_visibility(&repo, &visible(&repo, &filter), &mut surface);
        }
        assert_eq!(markers.state(&ProjectId::new("t1")), MarkerState::Hidden);
        assert_eq!(markers.state(&ProjectId::new("n1")), MarkerState::Visible);
        assert_eq!(creates(&surface), 2);
        assert_eq!(destroys(&surface), 0);
        assert_eq!(surface.visible_marker_count(), 1);
    }

    #[test]
    fn creation_is_batched() {
        let snapshot: Vec<Project> = (0..700).map(|i| tower(&format!("t_{i}"))).collect();
        let repo = ProjectRepository::from_snapshot(snapshot);
        let sets = visible(&repo, &FilterState::new());
        let mut markers = MarkerReconciler::new(300);
        let mut surface = RecordingSurface::new();
        assert_eq!(markers.queue_missing(&repo), 700);

        let progress: Vec<(usize, usize)> = (0..3)
            .map(|_| {
                let p = markers.create_batch(&repo, &sets, &mut surface);
                (p.done, p.remaining)
            })
            .collect();
        assert_eq!(progress, vec![(300, 400), (300, 100), (100, 0)]);
        assert_eq!(surface.marker_count(), 700);
    }

    #[test]
    fn unmapped_projects_get_a_hidden_marker() {
        let repo = ProjectRepository::from_snapshot(vec![project("z", Category::Pop, (0.0, 0.0))]);
        let mut markers = MarkerReconciler::default();
        let mut surface = RecordingSurface::new();
        markers.queue_missing(&repo);
        drain(&mut markers, &repo, &visible(&repo, &FilterState::new()), &mut surface);
        assert_eq!(markers.state(&ProjectId::new("z")), MarkerState::Hidden);
        assert_eq!(surface.visible_marker_count(), 0);
    }

    #[test]
    fn position_changes_move_the_marker_in_place() {
        let mut repo = ProjectRepository::from_snapshot(vec![tower("t1")]);
        let mut markers = MarkerReconciler::default();
        let mut surface = RecordingSurface::new();
        markers.queue_missing(&repo);
        drain(&mut markers, &repo, &visible(&repo, &FilterState::new()), &mut surface);
        let handle = markers.handle(&ProjectId::new("t1")).unwrap();

        let mut jitter = tower("t1");
        jitter.position = LatLng::new(5.970_000_01, 116.07);
        jitter.status = "Siap".to_string();
        let report = repo.reconcile(vec![jitter]);
        assert_eq!(markers.apply_report(&repo, &report, &mut surface).moved, 0);

        let moved = project("t1", Category::Tower, (6.0, 116.5));
        let report = repo.reconcile(vec![moved]);
        assert_eq!(markers.apply_report(&repo, &report, &mut surface).moved, 1);
        assert_eq!(
            surface.marker(handle).map(|m| m.position),
            Some(LatLng::new(6.0, 116.5))
        );
        assert_eq!(creates(&surface), 1);
    }

    #[test]
    fn renamed_site_updates_the_marker_title() {
        let mut repo = ProjectRepository::from_snapshot(vec![tower("t1")]);
        let mut markers = MarkerReconciler::default();
        let mut surface = RecordingSurface::new();
        markers.queue_missing(&repo);
        drain(&mut markers, &repo, &visible(&repo, &FilterState::new()), &mut surface);
        let handle = markers.handle(&ProjectId::new("t1")).unwrap();

        let mut renamed = tower("t1");
        renamed.site_name = "Menara Baru".to_string();
        let report = repo.reconcile(vec![renamed]);
        let stats = markers.apply_report(&repo, &report, &mut surface);

        assert_eq!(stats.retitled, 1);
        assert_eq!(stats.moved, 0);
        assert_eq!(
            surface.marker(handle).map(|m| m.title.as_str()),
            Some("Menara Baru")
        );
        assert_eq!(markers.handle(&ProjectId::new("t1")), Some(handle));
        assert_eq!(creates(&surface), 1);

        let report = repo.reconcile(vec![{
            let mut same = tower("t1");
            same.site_name = "Menara Baru".to_string();
            same.status = "Siap".to_string();
            same
        }]);
        assert_eq!(markers.apply_report(&repo, &report, &mut surface).retitled, 0);
    }

    #[test]
    fn removing_a_queued_id_skips_its_creation() {
        let mut repo = ProjectRepository::new();
        let mut markers = MarkerReconciler::default();
        let mut surface = RecordingSurface::new();

        let report = repo.reconcile(vec![tower("a"), tower("b")]);
        markers.apply_report(&repo, &report, &mut surface);
        let report = repo.reconcile(vec![tower("b")]);
        markers.apply_report(&repo, &report, &mut surface);
        assert_eq!(markers.pending(), 1);

        drain(&mut markers, &repo, &visible(&repo, &FilterState::new()), &mut surface);
        assert_eq!(creates(&surface), 1);
        assert_eq!(markers.state(&ProjectId::new("a")), MarkerState::Absent);
    }

    #[test]
    fn click_returns_detail_and_district() {
        let repo = ProjectRepository::from_snapshot(vec![tower("t1")]);
        let mut markers = MarkerReconciler::default();
        let mut surface = RecordingSurface::new();
        markers.queue_missing(&repo);
        drain(&mut markers, &repo, &visible(&repo, &FilterState::new()), &mut surface);

        let handle = markers.handle(&ProjectId::new("t1")).unwrap();
        let click = markers.click(handle, &repo, &mut surface).unwrap();
        assert_eq!(click.district, "Kota Kinabalu");
        assert_eq!(click.detail.title, "Site t1");
        assert!(
            surface
                .calls()
                .contains(&SurfaceCall::ShowDetail("Site t1".to_string()))
        );
    }
}
