use std::borrow::Cow;
use std::collections::BTreeSet;

use foundation::selection::SlotSet;

use crate::area_index::AreaIndex;
use crate::project::{AdminLevel, Category};
use crate::repository::ProjectRepository;

/// Area chosen on a boundary layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaSelection {
    pub level: AdminLevel,
    pub name: String,
}

/// Active categories, optional area and optional search text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    active: BTreeSet<Category>,
    area: Option<AreaSelection>,
    search: String,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            active: Category::ALL.into_iter().collect(),
            area: None,
            search: String::new(),
        }
    }
}

impl FilterState {
    /// Every category on, no area, no search.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self, category: Category) -> bool {
        self.active.contains(&category)
    }

    pub fn active_categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.active.iter().copied()
    }

    /// Returns `true` when the state changed.
    pub fn set_category(&mut self, category: Category, on: bool) -> bool {
        if on {
            self.active.insert(category)
        } else {
            self.active.remove(&category)
        }
    }

    pub fn toggle_category(&mut self, category: Category) -> bool {
        let on = !self.is_active(category);
        self.set_category(category, on);
        on
    }

    pub fn area(&self) -> Option<&AreaSelection> {
        self.area.as_ref()
    }

    pub fn select_area(&mut self, level: AdminLevel, name: impl Into<String>) {
        self.area = Some(AreaSelection {
            level,
            name: name.into(),
        });
    }

    pub fn clear_area(&mut self) -> bool {
        self.area.take().is_some()
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_search(&mut self, text: impl Into<String>) {
        self.search = text.into();
    }
}

/// Whether category toggles narrow the dashboard counts.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum CountPolicy {
    /// Counts follow area and search only.
    #[default]
    AreaAndSearch,
    IncludeCategories,
}

/// Whether (0,0) projects are counted on the dashboard. They are never drawn.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum UnmappedPolicy {
    #[default]
    Count,
    Exclude,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct VisibilityPolicy {
    pub count: CountPolicy,
    pub unmapped: UnmappedPolicy,
}

/// Output of one filter evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibleSets {
    /// Projects the dashboard counts.
    pub counted: SlotSet,
    /// Projects whose marker is shown. Always a subset of the area/search
    /// result, filtered to active categories and mappable positions.
    pub markers: SlotSet,
    /// Repository generation these sets were computed against.
    pub generation: u64,
}

/// Evaluates `filter` against the repository.
///
/// A stale `index` is not trusted: a fresh one is built for this call.
pub fn compute_visible(
    repo: &ProjectRepository,
    filter: &FilterState,
    index: &AreaIndex,
    policy: VisibilityPolicy,
) -> VisibleSets {
    let index = if index.is_current(repo) {
        Cow::Borrowed(index)
    } else {
        tracing::warn!(
            generation = repo.generation(),
            "area index is stale; rebuilding for this query"
        );
        Cow::Owned(AreaIndex::build(repo))
    };

    let mut scoped = repo.occupied();
    if let Some(area) = filter.area() {
        scoped.intersect_in_place(index.lookup(&area.name));
    }

    let needle = filter.search().trim().to_lowercase();
    if !needle.is_empty() {
        scoped.retain(|slot| {
            repo.project(slot)
                .is_some_and(|p| p.matches_search(&needle))
        });
    }

    let mut markers = scoped.clone();
    markers.retain(|slot| {
        repo.project(slot)
            .is_some_and(|p| filter.is_active(p.category) && p.is_mappable())
    });

    let mut counted = scoped;
    if policy.unmapped == UnmappedPolicy::Exclude {
        counted.retain(|slot| repo.project(slot).is_some_and(|p| p.is_mappable()));
    }
    if policy.count == CountPolicy::IncludeCategories {
        counted.retain(|slot| {
            repo.project(slot)
                .is_some_and(|p| filter.is_active(p.category))
        });
    }

    VisibleSets {
        counted,
        markers,
        generation: repo.generation(),
    }
}
