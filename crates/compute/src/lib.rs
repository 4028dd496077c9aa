pub mod dashboard;
pub mod status;

pub use dashboard::{
    DASHBOARD_CATEGORIES, DEFAULT_DEBOUNCE, DashboardAggregator, DashboardSummary,
    DashboardSurface, RecordingDashboard,
};
pub use status::{StatusBreakdownMode, StatusBucket, UNKNOWN_STATUS, status_breakdown};
