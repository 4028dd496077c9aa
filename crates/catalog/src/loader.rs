//! Concurrent feed loading.
//!
//! Sources are fetched together and joined; each feed then succeeds or fails
//! on its own. A failing feed never aborts the load, it only changes what
//! that feed contributes (see [`FailurePolicy`]).

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use formats::envelope::parse_envelope;
use futures_util::future::join_all;

use crate::normalize::normalize_table;
use crate::project::{FeedIdentity, Project};

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Error returned by a [`FeedSource`].
#[derive(Debug)]
pub struct FeedError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for FeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for FeedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl FeedError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Something that can produce the raw envelope text of one feed.
///
/// Methods return boxed futures for dyn-compatibility.
pub trait FeedSource: Send + Sync {
    fn identity(&self) -> &FeedIdentity;

    fn fetch(&self) -> BoxFuture<'_, Result<String, FeedError>>;
}

/// In-memory source, mostly for tests and offline runs.
pub struct StaticFeedSource {
    identity: FeedIdentity,
    body: Result<String, String>,
}

impl StaticFeedSource {
    pub fn new(identity: FeedIdentity, body: impl Into<String>) -> Self {
        Self {
            identity,
            body: Ok(body.into()),
        }
    }

    pub fn failing(identity: FeedIdentity, message: impl Into<String>) -> Self {
        Self {
            identity,
            body: Err(message.into()),
        }
    }
}

impl FeedSource for StaticFeedSource {
    fn identity(&self) -> &FeedIdentity {
        &self.identity
    }

    fn fetch(&self) -> BoxFuture<'_, Result<String, FeedError>> {
        Box::pin(async move { self.body.clone().map_err(FeedError::new) })
    }
}

/// Raw result of fetching one feed.
#[derive(Debug)]
pub struct FeedFetch {
    pub feed: FeedIdentity,
    pub result: Result<String, FeedError>,
}

/// Fetches every source concurrently. Results keep the order of `sources`.
pub async fn fetch_all(sources: &[Arc<dyn FeedSource>]) -> Vec<FeedFetch> {
    join_all(sources.iter().map(|source| async move {
        FeedFetch {
            feed: source.identity().clone(),
            result: source.fetch().await,
        }
    }))
    .await
}

/// What a failing feed contributes.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Nothing.
    #[default]
    Empty,
    /// Its last successfully normalized projects, if any.
    KeepLastGood,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedStatus {
    Loaded { projects: usize },
    /// Same content as last time; previous normalization reused.
    Unchanged { projects: usize },
    /// Failed, last good projects kept.
    Retained { projects: usize, error: String },
    Failed { error: String },
}

impl FeedStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, FeedStatus::Retained { .. } | FeedStatus::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedReport {
    pub feed: FeedIdentity,
    pub status: FeedStatus,
}

/// Combined snapshot of every feed, in feed order.
#[derive(Debug, Clone, Default)]
pub struct LoadOutcome {
    pub projects: Vec<Project>,
    pub reports: Vec<FeedReport>,
}

impl LoadOutcome {
    /// `true` when there was at least one feed and none produced data.
    pub fn all_failed(&self) -> bool {
        !self.reports.is_empty()
            && self
                .reports
                .iter()
                .all(|r| matches!(r.status, FeedStatus::Failed { .. }))
    }

    pub fn failures(&self) -> usize {
        self.reports.iter().filter(|r| r.status.is_failure()).count()
    }

    pub fn unchanged(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.status, FeedStatus::Unchanged { .. }))
            .count()
    }
}

#[derive(Debug, Clone)]
struct CachedFeed {
    fingerprint: blake3::Hash,
    projects: Vec<Project>,
}

/// Turns fetched feed text into projects, remembering each feed's last good
/// result keyed by feed key.
#[derive(Debug, Default)]
pub struct FeedIngest {
    cache: HashMap<String, CachedFeed>,
}

impl FeedIngest {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load_all(
        &mut self,
        sources: &[Arc<dyn FeedSource>],
        policy: FailurePolicy,
    ) -> LoadOutcome {
        let fetched = fetch_all(sources).await;
        self.ingest_all(fetched, policy)
    }

    pub fn ingest_all(&mut self, fetched: Vec<FeedFetch>, policy: FailurePolicy) -> LoadOutcome {
        let mut outcome = LoadOutcome::default();
        for fetch in fetched {
            let (projects, status) = self.ingest(&fetch.feed, fetch.result, policy);
            outcome.projects.extend(projects);
            outcome.reports.push(FeedReport {
                feed: fetch.feed,
                status,
            });
        }
        outcome
    }

    pub fn ingest(
        &mut self,
        feed: &FeedIdentity,
        fetched: Result<String, FeedError>,
        policy: FailurePolicy,
    ) -> (Vec<Project>, FeedStatus) {
        let text = match fetched {
            Ok(text) => text,
            Err(err) => return self.fail(feed, err.to_string(), policy),
        };

        let fingerprint = blake3::hash(text.as_bytes());
        if let Some(cached) = self.cache.get(&feed.key) {
            if cached.fingerprint == fingerprint {
                tracing::debug!(feed = %feed.key, "feed unchanged");
                let projects = cached.projects.clone();
                let count = projects.len();
                return (projects, FeedStatus::Unchanged { projects: count });
            }
        }

        let table = match parse_envelope(&text) {
            Ok(table) => table,
            Err(err) => return self.fail(feed, err.to_string(), policy),
        };
        let projects = normalize_table(feed, &table);
        tracing::info!(
            feed = %feed.key,
            rows = table.row_count(),
            projects = projects.len(),
            "feed loaded"
        );
        self.cache.insert(
            feed.key.clone(),
            CachedFeed {
                fingerprint,
                projects: projects.clone(),
            },
        );
        let count = projects.len();
        (projects, FeedStatus::Loaded { projects: count })
    }

    fn fail(
        &self,
        feed: &FeedIdentity,
        error: String,
        policy: FailurePolicy,
    ) -> (Vec<Project>, FeedStatus) {
        let retained = match policy {
            FailurePolicy::KeepLastGood => self.cache.get(&feed.key),
            FailurePolicy::Empty => None,
        };
        match retained {
            Some(cached) => {
                tracing::warn!(feed = %feed.key, %error, "feed failed; keeping last good data");
                let projects = cached.projects.clone();
                let count = projects.len();
                (projects, FeedStatus::Retained { projects: count, error })
            }
            None => {
                tracing::warn!(feed = %feed.key, %error, "feed failed");
                (Vec::new(), FeedStatus::Failed { error })
            }
        }
    }
}
