use foundation::geo::LatLng;
use foundation::ids::ProjectId;
use serde::{Deserialize, Serialize};

/// Project type. Decided by the feed a row came from, never by row content.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    Bwa,
    Nadi,
    Pop,
    Tower,
    Unknown,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Bwa,
        Category::Nadi,
        Category::Pop,
        Category::Tower,
        Category::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Bwa => "BWA",
            Category::Nadi => "NADI",
            Category::Pop => "POP",
            Category::Tower => "TOWER",
            Category::Unknown => "UNKNOWN",
        }
    }

    /// Case-insensitive; anything unrecognised maps to `Unknown`.
    pub fn parse(s: &str) -> Category {
        let s = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .unwrap_or(Category::Unknown)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Administrative level of a boundary layer and of a project's area fields.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminLevel {
    District,
    /// State constituency.
    Dun,
    /// Parliamentary constituency.
    Parliament,
}

impl AdminLevel {
    pub const ALL: [AdminLevel; 3] = [AdminLevel::District, AdminLevel::Dun, AdminLevel::Parliament];

    pub fn as_str(&self) -> &'static str {
        match self {
            AdminLevel::District => "district",
            AdminLevel::Dun => "dun",
            AdminLevel::Parliament => "parliament",
        }
    }
}

impl std::fmt::Display for AdminLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which feed a row came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedIdentity {
    pub key: String,
    pub category: Category,
}

impl FeedIdentity {
    pub fn new(key: impl Into<String>, category: Category) -> Self {
        Self {
            key: key.into(),
            category,
        }
    }
}

/// Canonical project record every feed row is normalized into.
///
/// `site_name` is never empty; rows without one are rejected during
/// normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub id: ProjectId,
    pub site_name: String,
    pub district: String,
    pub dun: String,
    pub parliament: String,
    pub position: LatLng,
    pub status: String,
    pub category: Category,
    pub extra_fields: Vec<(String, String)>,
}

impl Project {
    pub fn area(&self, level: AdminLevel) -> &str {
        match level {
            AdminLevel::District => &self.district,
            AdminLevel::Dun => &self.dun,
            AdminLevel::Parliament => &self.parliament,
        }
    }

    pub fn is_mappable(&self) -> bool {
        self.position.is_mappable()
    }

    /// `needle` must already be lowercased.
    pub fn matches_search(&self, needle: &str) -> bool {
        [&self.site_name, &self.district, &self.parliament]
            .into_iter()
            .any(|field| field.to_lowercase().contains(needle))
    }
}
