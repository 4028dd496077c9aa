use std::fmt;

/// Stable project identity: `"{feed}_{row}"`.
///
/// Derived from where a row came from, never from its content, so the same
/// spreadsheet row keeps its id across refreshes even when it is edited.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectId(String);

impl ProjectId {
    pub fn new(id: impl Into<String>) -> Self {
        ProjectId(id.into())
    }

    pub fn from_row(feed: &str, row_index: usize) -> Self {
        ProjectId(format!("{feed}_{row_index}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProjectId {
    fn from(s: &str) -> Self {
        ProjectId::new(s)
    }
}

/// Dense storage slot of a project inside a repository snapshot.
///
/// Slots are recycled after removal; they are only meaningful together with
/// the repository generation they were read from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Slot(pub u32);

impl Slot {
    pub fn index(&self) -> u32 {
        self.0
    }
}
