//! Project catalog: normalization, the in-memory repository and the
//! derived indexes the map view is filtered with.

pub mod aliases;
pub mod area_index;
pub mod filter;
pub mod loader;
pub mod normalize;
pub mod project;
pub mod repository;

pub use aliases::{CanonicalField, FIELD_ALIASES};
pub use area_index::AreaIndex;
pub use filter::{
    AreaSelection, CountPolicy, FilterState, UnmappedPolicy, VisibilityPolicy, VisibleSets,
    compute_visible,
};
pub use loader::{
    BoxFuture, FailurePolicy, FeedError, FeedFetch, FeedIngest, FeedReport, FeedSource,
    FeedStatus, LoadOutcome, StaticFeedSource, fetch_all,
};
pub use normalize::{normalize_row, normalize_table};
pub use project::{AdminLevel, Category, FeedIdentity, Project};
pub use repository::{ProjectRepository, ReconcileReport};
