use std::collections::HashMap;

use foundation::ids::ProjectId;
use foundation::selection::SlotSet;

use crate::project::AdminLevel;
use crate::repository::ProjectRepository;

/// Area name → projects whose district, DUN or parliament equals that name.
///
/// Names are matched exactly after trimming (case-sensitive). The index is
/// always rebuilt from scratch; it remembers the repository generation it
/// was built from so stale reads can be detected.
#[derive(Debug, Default, Clone)]
pub struct AreaIndex {
    by_area: HashMap<String, SlotSet>,
    built_from: Option<u64>,
    empty: SlotSet,
}

impl AreaIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(repo: &ProjectRepository) -> Self {
        let mut index = Self::new();
        index.rebuild(repo);
        index
    }

    /// Single pass over the repository.
    pub fn rebuild(&mut self, repo: &ProjectRepository) {
        self.by_area.clear();
        for (slot, project) in repo.iter() {
            for level in AdminLevel::ALL {
                let name = project.area(level).trim();
                if name.is_empty() {
                    continue;
                }
                self.by_area.entry(name.to_string()).or_default().insert(slot);
            }
        }
        self.built_from = Some(repo.generation());
    }

    pub fn is_current(&self, repo: &ProjectRepository) -> bool {
        self.built_from == Some(repo.generation())
    }

    /// Slots for `name`; unknown names yield the empty set.
    pub fn lookup(&self, name: &str) -> &SlotSet {
        self.by_area.get(name.trim()).unwrap_or(&self.empty)
    }

    pub fn lookup_ids(&self, name: &str, repo: &ProjectRepository) -> Vec<ProjectId> {
        self.lookup(name)
            .iter()
            .filter_map(|slot| repo.project(slot))
            .map(|p| p.id.clone())
            .collect()
    }

    /// Known area names, sorted.
    pub fn area_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_area.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
