use std::collections::HashMap;

use foundation::bounds::GeoBounds;
use foundation::geo::LatLng;
use foundation::handles::{Handle, HandleAllocator};
use formats::boundary::BoundaryFeature;

use crate::detail::ProjectDetail;
use crate::style::{MarkerStyle, PolygonStyle};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct MarkerHandle(pub Handle);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct LayerHandle(pub Handle);

/// The drawing side of the map.
///
/// Implementations own the actual visual objects; callers only hold handles.
/// Markers start hidden. Feature indices refer to the slice passed to
/// [`MapSurface::create_polygon_layer`].
pub trait MapSurface {
    fn create_marker(&mut self, position: LatLng, style: MarkerStyle, title: &str) -> MarkerHandle;
    fn set_marker_position(&mut self, marker: MarkerHandle, position: LatLng);
    fn set_marker_visible(&mut self, marker: MarkerHandle, visible: bool);
    fn set_marker_title(&mut self, marker: MarkerHandle, title: &str);
    fn destroy_marker(&mut self, marker: MarkerHandle);

    /// Layers start hidden.
    fn create_polygon_layer(
        &mut self,
        name: &str,
        features: &[BoundaryFeature],
        style: PolygonStyle,
    ) -> LayerHandle;
    fn set_layer_visible(&mut self, layer: LayerHandle, visible: bool);
    /// Removes the layer and all of its polygons from the map.
    fn destroy_layer(&mut self, layer: LayerHandle);
    fn set_feature_style(&mut self, layer: LayerHandle, feature: usize, style: PolygonStyle);

    fn fit_bounds(&mut self, bounds: GeoBounds);
    fn show_detail(&mut self, position: LatLng, detail: &ProjectDetail);
}

/// Every call a [`RecordingSurface`] received, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    CreateMarker(MarkerHandle),
    MoveMarker(MarkerHandle, LatLng),
    ShowMarker(MarkerHandle, bool),
    RetitleMarker(MarkerHandle, String),
    DestroyMarker(MarkerHandle),
    CreateLayer(LayerHandle, String),
    ShowLayer(LayerHandle, bool),
    DestroyLayer(LayerHandle),
    StyleFeature(LayerHandle, usize, PolygonStyle),
    FitBounds(GeoBounds),
    ShowDetail(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedMarker {
    pub position: LatLng,
    pub style: MarkerStyle,
    pub title: String,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedLayer {
    pub name: String,
    pub visible: bool,
    pub styles: Vec<PolygonStyle>,
}

/// Headless surface that keeps the resulting map state and a call log.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    marker_handles: HandleAllocator,
    layer_handles: HandleAllocator,
    markers: HashMap<MarkerHandle, RecordedMarker>,
    layers: HashMap<LayerHandle, RecordedLayer>,
    calls: Vec<SurfaceCall>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[SurfaceCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<SurfaceCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn marker(&self, handle: MarkerHandle) -> Option<&RecordedMarker> {
        self.markers.get(&handle)
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn visible_marker_count(&self) -> usize {
        self.markers.values().filter(|m| m.visible).count()
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layer(&self, handle: LayerHandle) -> Option<&RecordedLayer> {
        self.layers.get(&handle)
    }

    pub fn visible_layers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .layers
            .values()
            .filter(|l| l.visible)
            .map(|l| l.name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    pub fn count_calls(&self, pred: impl Fn(&SurfaceCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }
}

impl MapSurface for RecordingSurface {
    fn create_marker(&mut self, position: LatLng, style: MarkerStyle, title: &str) -> MarkerHandle {
        let handle = MarkerHandle(self.marker_handles.alloc());
        self.markers.insert(
            handle,
            RecordedMarker {
                position,
                style,
                title: title.to_string(),
                visible: false,
            },
        );
        self.calls.push(SurfaceCall::CreateMarker(handle));
        handle
    }

    fn set_marker_position(&mut self, marker: MarkerHandle, position: LatLng) {
        if let Some(m) = self.markers.get_mut(&marker) {
            m.position = position;
        }
        self.calls.push(SurfaceCall::MoveMarker(marker, position));
    }

    fn set_marker_visible(&mut self, marker: MarkerHandle, visible: bool) {
        if let Some(m) = self.markers.get_mut(&marker) {
            m.visible = visible;
        }
        self.calls.push(SurfaceCall::ShowMarker(marker, visible));
    }

    fn set_marker_title(&mut self, marker: MarkerHandle, title: &str) {
        if let Some(m) = self.markers.get_mut(&marker) {
            m.title = title.to_string();
        }
        self.calls
            .push(SurfaceCall::RetitleMarker(marker, title.to_string()));
    }

    fn destroy_marker(&mut self, marker: MarkerHandle) {
        self.marker_handles.release(marker.0);
        self.markers.remove(&marker);
        self.calls.push(SurfaceCall::DestroyMarker(marker));
    }

    fn create_polygon_layer(
        &mut self,
        name: &str,
        features: &[BoundaryFeature],
        style: PolygonStyle,
    ) -> LayerHandle {
        let handle = LayerHandle(self.layer_handles.alloc());
        self.layers.insert(
            handle,
            RecordedLayer {
                name: name.to_string(),
                visible: false,
                styles: vec![style; features.len()],
            },
        );
        self.calls.push(SurfaceCall::CreateLayer(handle, name.to_string()));
        handle
    }

    fn set_layer_visible(&mut self, layer: LayerHandle, visible: bool) {
        if let Some(l) = self.layers.get_mut(&layer) {
            l.visible = visible;
        }
        self.calls.push(SurfaceCall::ShowLayer(layer, visible));
    }

    fn destroy_layer(&mut self, layer: LayerHandle) {
        self.layer_handles.release(layer.0);
        self.layers.remove(&layer);
        self.calls.push(SurfaceCall::DestroyLayer(layer));
    }

    fn set_feature_style(&mut self, layer: LayerHandle, feature: usize, style: PolygonStyle) {
        if let Some(slot) = self
            .layers
            .get_mut(&layer)
            .and_then(|l| l.styles.get_mut(feature))
        {
            *slot = style;
        }
        self.calls.push(SurfaceCall::StyleFeature(layer, feature, style));
    }

    fn fit_bounds(&mut self, bounds: GeoBounds) {
        self.calls.push(SurfaceCall::FitBounds(bounds));
    }

    fn show_detail(&mut self, _position: LatLng, detail: &ProjectDetail) {
        self.calls.push(SurfaceCall::ShowDetail(detail.title.clone()));
    }
}
