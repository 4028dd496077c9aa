pub mod boundary;
pub mod symbology;

pub use boundary::{
    AREA_NAME_KEYS, AreaPick, BoundaryLayers, WHOLE_REGION_LABEL, area_label, area_name,
};
pub use symbology::{FeatureState, LayerSymbology, feature_style};
