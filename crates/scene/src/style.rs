use catalog::project::Category;

/// Marker appearance token handed to the map surface.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MarkerStyle {
    /// CSS hex colour, e.g. `#FF5722`.
    pub color: &'static str,
    pub icon: &'static str,
}

pub const fn marker_style(category: Category) -> MarkerStyle {
    match category {
        Category::Bwa => MarkerStyle {
            color: "#FF5722",
            icon: "🗼",
        },
        Category::Nadi => MarkerStyle {
            color: "#2196F3",
            icon: "📡",
        },
        Category::Pop => MarkerStyle {
            color: "#4CAF50",
            icon: "🌐",
        },
        Category::Tower => MarkerStyle {
            color: "#FF9800",
            icon: "📶",
        },
        Category::Unknown => MarkerStyle {
            color: "#000000",
            icon: "📍",
        },
    }
}

/// Stroke and fill of one boundary polygon.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PolygonStyle {
    pub stroke_color: &'static str,
    pub stroke_weight: f32,
    pub stroke_opacity: f32,
    pub fill_color: &'static str,
    pub fill_opacity: f32,
}

impl Default for PolygonStyle {
    fn default() -> Self {
        Self {
            stroke_color: "#333333",
            stroke_weight: 1.0,
            stroke_opacity: 1.0,
            fill_color: "#333333",
            fill_opacity: 0.1,
        }
    }
}
