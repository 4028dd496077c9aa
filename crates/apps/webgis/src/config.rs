//! Startup configuration from `WEBGIS_*` environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use catalog::filter::{CountPolicy, UnmappedPolicy, VisibilityPolicy};
use catalog::project::{AdminLevel, Category, FeedIdentity};
use compute::status::StatusBreakdownMode;
use foundation::geo::LatLng;
use serde::{Deserialize, Serialize};

pub const SHEET_URL_TEMPLATE: &str =
    "https://docs.google.com/spreadsheets/d/{id}/gviz/tq?tqx=out:json";

pub const MAP_CENTER: LatLng = LatLng::new(5.9804, 116.0735);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedSpec {
    pub key: String,
    pub category: Category,
    #[serde(default)]
    pub sheet_id: String,
    /// Full URL; overrides `sheet_id` when set.
    #[serde(default)]
    pub url: String,
}

impl FeedSpec {
    pub fn sheet(key: &str, sheet_id: &str, category: Category) -> Self {
        Self {
            key: key.to_string(),
            category,
            sheet_id: sheet_id.to_string(),
            url: String::new(),
        }
    }

    pub fn resolved_url(&self) -> String {
        if self.url.trim().is_empty() {
            SHEET_URL_TEMPLATE.replace("{id}", self.sheet_id.trim())
        } else {
            self.url.trim().to_string()
        }
    }

    pub fn identity(&self) -> FeedIdentity {
        FeedIdentity::new(self.key.clone(), self.category)
    }
}

pub fn default_feeds() -> Vec<FeedSpec> {
    vec![
        FeedSpec::sheet("db_bwa", "1594VRWEs0PF56KXeSPudZTWkbGuS5UZmxXGrKqo4bUU", Category::Bwa),
        FeedSpec::sheet("db_pim", "1WyZiw72LOVytssXAuymJS_TIgckLCUqY56pB0QhawZU", Category::Nadi),
        FeedSpec::sheet("db_POP", "1JLqLtZPa4Kd6hEbRA2wgMgADX2h2-tdsXnG-YivSgU8", Category::Pop),
        FeedSpec::sheet("tower", "1b0Aipp0MQvP8HWc-z28dugkGn5sWdNAx6ZE5-Mu13-0", Category::Tower),
    ]
}

/// Where the feed list comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedList {
    Builtin,
    Inline(Vec<FeedSpec>),
    /// JSON file holding a `FeedSpec` array.
    File(PathBuf),
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue { key: &'static str, value: String },
    Feeds(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue { key, value } => write!(f, "invalid {key}: {value:?}"),
            ConfigError::Feeds(msg) => write!(f, "feed list: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub refresh_interval: Duration,
    pub batch_size: u32,
    pub debounce: Duration,
    pub http_timeout: Duration,
    pub boundary_dir: PathBuf,
    pub initial_layer: AdminLevel,
    pub status_mode: StatusBreakdownMode,
    pub visibility: VisibilityPolicy,
    pub feeds: FeedList,
    pub map_center: LatLng,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(60),
            batch_size: scene::markers::DEFAULT_BATCH_SIZE,
            debounce: compute::dashboard::DEFAULT_DEBOUNCE,
            http_timeout: Duration::from_secs(30),
            boundary_dir: PathBuf::from("data"),
            initial_layer: AdminLevel::District,
            status_mode: StatusBreakdownMode::Raw,
            visibility: VisibilityPolicy::default(),
            feeds: FeedList::Builtin,
            map_center: MAP_CENTER,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let refresh_secs = var_u64(&get, "WEBGIS_REFRESH_SECS", defaults.refresh_interval.as_secs());
        let debounce_ms = var_u64(&get, "WEBGIS_DEBOUNCE_MS", defaults.debounce.as_millis() as u64);
        let timeout_secs = var_u64(&get, "WEBGIS_HTTP_TIMEOUT_SECS", defaults.http_timeout.as_secs());

        let status_mode = match get("WEBGIS_STATUS_MODE") {
            Some(v) => StatusBreakdownMode::parse(&v).ok_or(ConfigError::InvalidValue {
                key: "WEBGIS_STATUS_MODE",
                value: v,
            })?,
            None => defaults.status_mode,
        };
        let count = match get("WEBGIS_COUNT_POLICY") {
            Some(v) => parse_count_policy(&v).ok_or(ConfigError::InvalidValue {
                key: "WEBGIS_COUNT_POLICY",
                value: v,
            })?,
            None => defaults.visibility.count,
        };
        let unmapped = match get("WEBGIS_UNMAPPED_POLICY") {
            Some(v) => parse_unmapped_policy(&v).ok_or(ConfigError::InvalidValue {
                key: "WEBGIS_UNMAPPED_POLICY",
                value: v,
            })?,
            None => defaults.visibility.unmapped,
        };
        let initial_layer = match get("WEBGIS_INITIAL_LAYER") {
            Some(v) => parse_level(&v).ok_or(ConfigError::InvalidValue {
                key: "WEBGIS_INITIAL_LAYER",
                value: v,
            })?,
            None => defaults.initial_layer,
        };

        let feeds = match get("WEBGIS_FEEDS") {
            Some(v) if v.trim_start().starts_with('[') => {
                let specs: Vec<FeedSpec> =
                    serde_json::from_str(&v).map_err(|e| ConfigError::Feeds(e.to_string()))?;
                FeedList::Inline(specs)
            }
            Some(v) => FeedList::File(PathBuf::from(v.trim())),
            None => FeedList::Builtin,
        };

        Ok(Self {
            refresh_interval: Duration::from_secs(refresh_secs.max(1)),
            batch_size: var_u64(&get, "WEBGIS_BATCH_SIZE", u64::from(defaults.batch_size))
                .clamp(1, u64::from(u32::MAX)) as u32,
            debounce: Duration::from_millis(debounce_ms),
            http_timeout: Duration::from_secs(timeout_secs.max(1)),
            boundary_dir: get("WEBGIS_BOUNDARY_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.boundary_dir),
            initial_layer,
            status_mode,
            visibility: VisibilityPolicy { count, unmapped },
            feeds,
            map_center: defaults.map_center,
        })
    }
}

fn var_u64(get: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> u64 {
    get(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

pub fn parse_count_policy(s: &str) -> Option<CountPolicy> {
    match s.trim().to_ascii_lowercase().as_str() {
        "area-and-search" | "area" => Some(CountPolicy::AreaAndSearch),
        "include-categories" | "categories" => Some(CountPolicy::IncludeCategories),
        _ => None,
    }
}

pub fn parse_unmapped_policy(s: &str) -> Option<UnmappedPolicy> {
    match s.trim().to_ascii_lowercase().as_str() {
        "count" => Some(UnmappedPolicy::Count),
        "exclude" => Some(UnmappedPolicy::Exclude),
        _ => None,
    }
}

pub fn parse_level(s: &str) -> Option<AdminLevel> {
    let s = s.trim();
    AdminLevel::ALL
        .into_iter()
        .find(|l| l.as_str().eq_ignore_ascii_case(s))
}

#[cfg(test)]
mod tests {
    use super::{default_feeds, AppConfig, ConfigError, FeedList, FeedSpec};
    use catalog::filter::{CountPolicy, UnmappedPolicy};
    use catalog::project::{AdminLevel, Category};
    use compute::status::StatusBreakdownMode;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_env() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.refresh_interval, Duration::from_secs(60));
        assert_eq!(cfg.batch_size, 300);
        assert_eq!(cfg.debounce, Duration::from_millis(200));
        assert_eq!(cfg.status_mode, StatusBreakdownMode::Raw);
        assert_eq!(cfg.visibility.count, CountPolicy::AreaAndSearch);
        assert_eq!(cfg.visibility.unmapped, UnmappedPolicy::Count);
        assert_eq!(cfg.initial_layer, AdminLevel::District);
        assert_eq!(cfg.feeds, FeedList::Builtin);
    }

    #[test]
    fn scalar_overrides() {
        let cfg = config(&[
            ("WEBGIS_REFRESH_SECS", "15"),
            ("WEBGIS_BATCH_SIZE", "50"),
            ("WEBGIS_DEBOUNCE_MS", "not-a-number"),
            ("WEBGIS_STATUS_MODE", "bucketed"),
            ("WEBGIS_COUNT_POLICY", "include-categories"),
            ("WEBGIS_UNMAPPED_POLICY", "exclude"),
            ("WEBGIS_BOUNDARY_DIR", "/srv/geo"),
            ("WEBGIS_INITIAL_LAYER", "DUN"),
        ])
        .unwrap();
        assert_eq!(cfg.refresh_interval, Duration::from_secs(15));
        assert_eq!(cfg.batch_size, 50);
        assert_eq!(cfg.debounce, Duration::from_millis(200));
        assert_eq!(cfg.status_mode, StatusBreakdownMode::Bucketed);
        assert_eq!(cfg.visibility.count, CountPolicy::IncludeCategories);
        assert_eq!(cfg.visibility.unmapped, UnmappedPolicy::Exclude);
        assert_eq!(cfg.boundary_dir, PathBuf::from("/srv/geo"));
        assert_eq!(cfg.initial_layer, AdminLevel::Dun);
    }

    #[test]
    fn invalid_policy_is_an_error() {
        let err = config(&[("WEBGIS_COUNT_POLICY", "sometimes")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "WEBGIS_COUNT_POLICY",
                ..
            }
        ));
    }

    #[test]
    fn inline_and_file_feed_lists() {
        let cfg = config(&[(
            "WEBGIS_FEEDS",
            r#"[{"key":"towers","category":"TOWER","url":"http://localhost:8080/towers"}]"#,
        )])
        .unwrap();
        let FeedList::Inline(specs) = cfg.feeds else {
            panic!("expected inline feeds");
        };
        assert_eq!(specs[0].category, Category::Tower);
        assert_eq!(specs[0].resolved_url(), "http://localhost:8080/towers");

        let cfg = config(&[("WEBGIS_FEEDS", "/etc/webgis/feeds.json")]).unwrap();
        assert_eq!(cfg.feeds, FeedList::File(PathBuf::from("/etc/webgis/feeds.json")));

        assert!(config(&[("WEBGIS_FEEDS", "[{")]).is_err());
    }

    #[test]
    fn builtin_feeds_resolve_to_sheet_urls() {
        let feeds = default_feeds();
        let keys: Vec<&str> = feeds.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["db_bwa", "db_pim", "db_POP", "tower"]);
        let spec = FeedSpec::sheet("x", "abc", Category::Pop);
        assert_eq!(
            spec.resolved_url(),
            "https://docs.google.com/spreadsheets/d/abc/gviz/tq?tqx=out:json"
        );
    }
}
