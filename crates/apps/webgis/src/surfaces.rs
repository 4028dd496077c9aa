//! Headless surfaces that report through `tracing`.

use catalog::project::Category;
use compute::dashboard::DashboardSurface;
use formats::boundary::BoundaryFeature;
use foundation::bounds::GeoBounds;
use foundation::geo::LatLng;
use foundation::handles::HandleAllocator;
use scene::detail::ProjectDetail;
use scene::style::{MarkerStyle, PolygonStyle};
use scene::surface::{LayerHandle, MapSurface, MarkerHandle};
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct TracingMapSurface {
    markers: HandleAllocator,
    layers: HandleAllocator,
}

impl TracingMapSurface {
    pub fn new(center: LatLng) -> Self {
        info!(lat = center.lat, lng = center.lng, "map ready");
        Self::default()
    }

    pub fn live_markers(&self) -> usize {
        self.markers.live_count()
    }
}

impl MapSurface for TracingMapSurface {
    fn create_marker(&mut self, position: LatLng, style: MarkerStyle, title: &str) -> MarkerHandle {
        let handle = MarkerHandle(self.markers.alloc());
        debug!(
            marker = handle.0.index(),
            lat = position.lat,
            lng = position.lng,
            color = style.color,
            title,
            "marker created"
        );
        handle
    }

    fn set_marker_position(&mut self, marker: MarkerHandle, position: LatLng) {
        debug!(marker = marker.0.index(), lat = position.lat, lng = position.lng, "marker moved");
    }

    fn set_marker_visible(&mut self, marker: MarkerHandle, visible: bool) {
        debug!(marker = marker.0.index(), visible, "marker visibility");
    }

    fn set_marker_title(&mut self, marker: MarkerHandle, title: &str) {
        debug!(marker = marker.0.index(), title, "marker retitled");
    }

    fn destroy_marker(&mut self, marker: MarkerHandle) {
        self.markers.release(marker.0);
        debug!(marker = marker.0.index(), "marker destroyed");
    }

    fn create_polygon_layer(
        &mut self,
        name: &str,
        features: &[BoundaryFeature],
        style: PolygonStyle,
    ) -> LayerHandle {
        let handle = LayerHandle(self.layers.alloc());
        info!(
            layer = name,
            features = features.len(),
            stroke = style.stroke_color,
            "polygon layer created"
        );
        handle
    }

    fn set_layer_visible(&mut self, layer: LayerHandle, visible: bool) {
        debug!(layer = layer.0.index(), visible, "layer visibility");
    }

    fn destroy_layer(&mut self, layer: LayerHandle) {
        self.layers.release(layer.0);
        info!(layer = layer.0.index(), "polygon layer destroyed");
    }

    fn set_feature_style(&mut self, layer: LayerHandle, feature: usize, style: PolygonStyle) {
        debug!(layer = layer.0.index(), feature, weight = style.stroke_weight, "feature style");
    }

    fn fit_bounds(&mut self, bounds: GeoBounds) {
        info!(
            south = bounds.south,
            west = bounds.west,
            north = bounds.north,
            east = bounds.east,
            "fit bounds"
        );
    }

    fn show_detail(&mut self, position: LatLng, detail: &ProjectDetail) {
        let rows: Vec<String> = detail.rows.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        info!(
            lat = position.lat,
            lng = position.lng,
            title = %detail.title,
            category = %detail.category,
            details = %rows.join("; "),
            "project detail"
        );
    }
}

#[derive(Debug, Default)]
pub struct TracingDashboard;

impl DashboardSurface for TracingDashboard {
    fn set_total(&mut self, total: usize) {
        info!(total, "dashboard total");
    }

    fn set_category_counts(&mut self, counts: &[(Category, usize)]) {
        let text: Vec<String> = counts.iter().map(|(c, n)| format!("{c}={n}")).collect();
        info!(counts = %text.join(" "), "dashboard categories");
    }

    fn set_status_breakdown(&mut self, breakdown: &[(String, usize)]) {
        let text: Vec<String> = breakdown.iter().map(|(s, n)| format!("{s}={n}")).collect();
        info!(status = %text.join(", "), "dashboard status");
    }

    fn show_notice(&mut self, message: &str) {
        tracing::warn!(%message, "dashboard notice");
    }

    fn set_selected_area(&mut self, label: &str) {
        info!(area = label, "selected area");
    }
}
