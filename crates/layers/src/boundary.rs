//! Administrative boundary overlays.
//!
//! Ordering contract:
//! - At most one layer is visible at a time.
//! - At most one feature (on the active layer) is highlighted.

use std::collections::BTreeMap;

use catalog::filter::FilterState;
use catalog::project::AdminLevel;
use formats::boundary::{BoundaryCollection, BoundaryFeature};
use scene::surface::{LayerHandle, MapSurface};

use crate::symbology::{FeatureState, feature_style};

/// Label used when no area is selected or a feature has no usable name.
pub const WHOLE_REGION_LABEL: &str = "Semua Sabah";

/// Property keys probed for a feature's area name, in priority order.
pub const AREA_NAME_KEYS: &[&str] = &[
    "NAME",
    "name",
    "Name",
    "DISTRICT",
    "DAERAH",
    "district",
    "DUN",
    "dun",
    "PARLIMEN",
    "PARLAMEN",
    "PARLIAMENT",
    "parliament",
];

/// First non-empty name property of `feature`.
pub fn area_name(feature: &BoundaryFeature) -> Option<String> {
    AREA_NAME_KEYS
        .iter()
        .filter_map(|key| feature.property_text(key))
        .find(|name| !name.is_empty())
}

pub fn area_label(feature: &BoundaryFeature) -> String {
    area_name(feature).unwrap_or_else(|| WHOLE_REGION_LABEL.to_string())
}

#[derive(Debug)]
struct InstalledLayer {
    handle: LayerHandle,
    collection: BoundaryCollection,
}

/// Result of picking an area on a boundary layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaPick {
    pub level: AdminLevel,
    pub feature: usize,
    /// `None` when the feature has no name; the area filter is cleared then.
    pub name: Option<String>,
    pub label: String,
}

#[derive(Debug, Default)]
pub struct BoundaryLayers {
    layers: BTreeMap<AdminLevel, InstalledLayer>,
    active: Option<AdminLevel>,
    highlighted: Option<(AdminLevel, usize)>,
    hovered: Option<(AdminLevel, usize)>,
}

impl BoundaryLayers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<AdminLevel> {
        self.active
    }

    pub fn is_installed(&self, level: AdminLevel) -> bool {
        self.layers.contains_key(&level)
    }

    pub fn highlighted(&self) -> Option<(AdminLevel, usize)> {
        self.highlighted
    }

    pub fn feature(&self, level: AdminLevel, index: usize) -> Option<&BoundaryFeature> {
        self.layers.get(&level)?.collection.features.get(index)
    }

    pub fn feature_count(&self, level: AdminLevel) -> usize {
        self.layers
            .get(&level)
            .map_or(0, |l| l.collection.features.len())
    }

    /// Index of the first feature on `level` whose area name equals `name`
    /// (trimmed, case-insensitive).
    pub fn find_feature(&self, level: AdminLevel, name: &str) -> Option<usize> {
        let name = name.trim();
        self.layers.get(&level)?.collection.features.iter().position(|f| {
            area_name(f).is_some_and(|n| n.eq_ignore_ascii_case(name))
        })
    }

    /// Hands a parsed layer to the surface. The layer is shown only if it is
    /// the active one, which may have been chosen before the data arrived.
    pub fn install(
        &mut self,
        level: AdminLevel,
        collection: BoundaryCollection,
        surface: &mut dyn MapSurface,
    ) -> LayerHandle {
        if let Some(old) = self.layers.remove(&level) {
            surface.destroy_layer(old.handle);
            if self.highlighted.is_some_and(|(l, _)| l == level) {
                self.highlighted = None;
            }
            if self.hovered.is_some_and(|(l, _)| l == level) {
                self.hovered = None;
            }
        }

        let handle = surface.create_polygon_layer(
            level.as_str(),
            &collection.features,
            feature_style(level, FeatureState::Normal),
        );
        let visible = self.active == Some(level);
        if visible {
            surface.set_layer_visible(handle, true);
        }
        tracing::info!(
            layer = %level,
            features = collection.features.len(),
            skipped = collection.skipped,
            visible,
            "boundary layer installed"
        );
        self.layers
            .insert(level, InstalledLayer { handle, collection });
        handle
    }

    /// Shows `level`, hides every other layer and clears the highlight.
    pub fn activate(&mut self, level: AdminLevel, surface: &mut dyn MapSurface) {
        self.clear_highlight(surface);
        self.unhover(surface);
        for (key, layer) in &self.layers {
            if *key != level {
                surface.set_layer_visible(layer.handle, false);
            }
        }
        if let Some(layer) = self.layers.get(&level) {
            surface.set_layer_visible(layer.handle, true);
        }
        self.active = Some(level);
    }

    /// Picks one polygon: activates its layer, highlights it alone, narrows
    /// the filter to its area and fits the viewport to it.
    ///
    /// The caller recomputes visibility afterwards.
    pub fn select_area(
        &mut self,
        level: AdminLevel,
        feature: usize,
        filter: &mut FilterState,
        surface: &mut dyn MapSurface,
    ) -> Option<AreaPick> {
        let layer = self.layers.get(&level)?;
        let handle = layer.handle;
        let picked = layer.collection.features.get(feature)?;
        let name = area_name(picked);
        let bounds = picked.bounds();

        if self.active != Some(level) {
            self.activate(level, surface);
        } else {
            self.clear_highlight(surface);
        }
        if self.hovered == Some((level, feature)) {
            self.hovered = None;
        }
        surface.set_feature_style(handle, feature, feature_style(level, FeatureState::Selected));
        self.highlighted = Some((level, feature));

        match &name {
            Some(n) => filter.select_area(level, n.clone()),
            None => {
                filter.clear_area();
            }
        }
        if let Some(bounds) = bounds {
            surface.fit_bounds(bounds);
        }

        let label = name.clone().unwrap_or_else(|| WHOLE_REGION_LABEL.to_string());
        tracing::debug!(layer = %level, feature, area = %label, "area selected");
        Some(AreaPick {
            level,
            feature,
            name,
            label,
        })
    }

    /// Clears the area filter and the highlight; the active layer stays visible.
    pub fn deactivate_area(&mut self, filter: &mut FilterState, surface: &mut dyn MapSurface) -> bool {
        self.clear_highlight(surface);
        filter.clear_area()
    }

    /// Hover styling. Ignored for the highlighted feature and hidden layers.
    pub fn hover(&mut self, level: AdminLevel, feature: usize, surface: &mut dyn MapSurface) {
        if self.active != Some(level)
            || self.highlighted == Some((level, feature))
            || self.feature(level, feature).is_none()
        {
            return;
        }
        self.unhover(surface);
        if let Some(layer) = self.layers.get(&level) {
            surface.set_feature_style(layer.handle, feature, feature_style(level, FeatureState::Hover));
            self.hovered = Some((level, feature));
        }
    }

    pub fn unhover(&mut self, surface: &mut dyn MapSurface) {
        if let Some((level, feature)) = self.hovered.take() {
            self.restore(level, feature, surface);
        }
    }

    fn clear_highlight(&mut self, surface: &mut dyn MapSurface) {
        if let Some((level, feature)) = self.highlighted.take() {
            self.restore(level, feature, surface);
        }
    }

    fn restore(&self, level: AdminLevel, feature: usize, surface: &mut dyn MapSurface) {
        if let Some(layer) = self.layers.get(&level) {
            surface.set_feature_style(layer.handle, feature, feature_style(level, FeatureState::Normal));
        }
    }
}
