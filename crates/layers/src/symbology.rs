use catalog::project::AdminLevel;
use scene::style::PolygonStyle;

/// Per-feature highlight state.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FeatureState {
    Normal,
    Hover,
    Selected,
}

/// Stroke and fill colours of one boundary layer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LayerSymbology {
    pub stroke: &'static str,
    pub fill: &'static str,
}

impl LayerSymbology {
    pub const fn for_level(level: AdminLevel) -> Self {
        match level {
            AdminLevel::District => Self {
                stroke: "#FF0000",
                fill: "#FFCDD2",
            },
            AdminLevel::Dun => Self {
                stroke: "#00AA00",
                fill: "#C8E6C9",
            },
            AdminLevel::Parliament => Self {
                stroke: "#2196F3",
                fill: "#BBDEFB",
            },
        }
    }

    pub fn style(&self, state: FeatureState) -> PolygonStyle {
        let (weight, fill_opacity) = match state {
            FeatureState::Normal => (2.0, 0.08),
            FeatureState::Hover => (3.0, 0.2),
            FeatureState::Selected => (4.0, 0.35),
        };
        PolygonStyle {
            stroke_color: self.stroke,
            stroke_weight: weight,
            stroke_opacity: 1.0,
            fill_color: if state == FeatureState::Selected {
                self.stroke
            } else {
                self.fill
            },
            fill_opacity,
        }
    }
}

pub fn feature_style(level: AdminLevel, state: FeatureState) -> PolygonStyle {
    LayerSymbology::for_level(level).style(state)
}
