use std::collections::{HashMap, HashSet};

use foundation::ids::{ProjectId, Slot};
use foundation::selection::SlotSet;

use crate::project::Project;

/// What a reconciliation changed, in slot order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub added: Vec<ProjectId>,
    pub updated: Vec<ProjectId>,
    pub removed: Vec<ProjectId>,
    pub unchanged: usize,
    /// Snapshot entries dropped because their id had already been seen.
    pub duplicates: usize,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// Current, deduplicated set of projects keyed by [`ProjectId`].
///
/// Each project lives in a dense slot; freed slots are recycled. Every
/// mutation bumps [`ProjectRepository::generation`] so derived indexes can
/// tell whether they are current.
#[derive(Debug, Default, Clone)]
pub struct ProjectRepository {
    slots: Vec<Option<Project>>,
    by_id: HashMap<ProjectId, Slot>,
    free: Vec<Slot>,
    generation: u64,
}

impl ProjectRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Vec<Project>) -> Self {
        let mut repo = Self::new();
        repo.reconcile(snapshot);
        repo
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn get(&self, id: &ProjectId) -> Option<&Project> {
        self.slot_of(id).and_then(|slot| self.project(slot))
    }

    pub fn slot_of(&self, id: &ProjectId) -> Option<Slot> {
        self.by_id.get(id).copied()
    }

    pub fn project(&self, slot: Slot) -> Option<&Project> {
        self.slots.get(slot.index() as usize)?.as_ref()
    }

    /// Occupied slots in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (Slot, &Project)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(idx, p)| p.as_ref().map(|p| (Slot(idx as u32), p)))
    }

    pub fn occupied(&self) -> SlotSet {
        self.iter().map(|(slot, _)| slot).collect()
    }

    pub fn ids(&self) -> HashSet<ProjectId> {
        self.by_id.keys().cloned().collect()
    }

    /// Makes the stored set equal to `snapshot`.
    ///
    /// Known ids are updated in place (keeping their slot), new ids are
    /// inserted, and ids missing from the snapshot are removed. When an id
    /// appears more than once the first occurrence wins.
    pub fn reconcile(&mut self, snapshot: Vec<Project>) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let mut seen: HashSet<ProjectId> = HashSet::with_capacity(snapshot.len());

        for project in snapshot {
            if !seen.insert(project.id.clone()) {
                report.duplicates += 1;
                continue;
            }
            match self.by_id.get(&project.id).copied() {
                Some(slot) => {
                    let stored = &mut self.slots[slot.index() as usize];
                    if stored.as_ref() == Some(&project) {
                        report.unchanged += 1;
                    } else {
                        report.updated.push(project.id.clone());
                        *stored = Some(project);
                    }
                }
                None => {
                    let slot = self.alloc_slot();
                    report.added.push(project.id.clone());
                    self.by_id.insert(project.id.clone(), slot);
                    self.slots[slot.index() as usize] = Some(project);
                }
            }
        }

        let stale: Vec<Slot> = self
            .iter()
            .filter(|(_, p)| !seen.contains(&p.id))
            .map(|(slot, _)| slot)
            .collect();
        for slot in stale {
            if let Some(project) = self.slots[slot.index() as usize].take() {
                self.by_id.remove(&project.id);
                self.free.push(slot);
                report.removed.push(project.id);
            }
        }

        self.generation += 1;
        report
    }

    fn alloc_slot(&mut self) -> Slot {
        if let Some(slot) = self.free.pop() {
            return slot;
        }
        self.slots.push(None);
        Slot((self.slots.len() - 1) as u32)
    }
}
