pub mod detail;
pub mod markers;
pub mod style;
pub mod surface;

pub use detail::{ProjectDetail, escape_html};
pub use markers::{DEFAULT_BATCH_SIZE, MarkerClick, MarkerReconciler, MarkerState, MarkerSyncStats};
pub use style::{MarkerStyle, PolygonStyle, marker_style};
pub use surface::{
    LayerHandle, MapSurface, MarkerHandle, RecordedLayer, RecordedMarker, RecordingSurface,
    SurfaceCall,
};
