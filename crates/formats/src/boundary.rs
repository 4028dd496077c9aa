use foundation::bounds::GeoBounds;
use foundation::geo::LatLng;
use serde_json::{Map, Value};

/// Closed ring of positions; the closing duplicate, if present, is kept.
pub type Ring = Vec<LatLng>;

/// Outer ring followed by holes.
pub type Polygon = Vec<Ring>;

#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryFeature {
    pub id: Option<String>,
    pub properties: Map<String, Value>,
    pub polygons: Vec<Polygon>,
}

impl BoundaryFeature {
    /// Bounds of every outer ring, or `None` when the geometry is empty.
    pub fn bounds(&self) -> Option<GeoBounds> {
        GeoBounds::from_points(
            self.polygons
                .iter()
                .filter_map(|poly| poly.first())
                .flat_map(|ring| ring.iter().copied()),
        )
    }

    /// String form of a property value; numbers are stringified, everything
    /// else (null, arrays, objects) reads as absent.
    pub fn property_text(&self, key: &str) -> Option<String> {
        match self.properties.get(key)? {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Polygon features of one administrative layer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoundaryCollection {
    pub features: Vec<BoundaryFeature>,
    /// Features dropped because their geometry was not (Multi)Polygon.
    pub skipped: usize,
}

#[derive(Debug)]
pub enum BoundaryError {
    Json(String),
    NotAFeatureCollection,
    InvalidFeature { index: usize, reason: String },
}

impl std::fmt::Display for BoundaryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoundaryError::Json(msg) => write!(f, "boundary JSON parse error: {msg}"),
            BoundaryError::NotAFeatureCollection => {
                write!(f, "expected GeoJSON FeatureCollection")
            }
            BoundaryError::InvalidFeature { index, reason } => {
                write!(f, "invalid feature at index {index}: {reason}")
            }
        }
    }
}

impl std::error::Error for BoundaryError {}

impl BoundaryCollection {
    pub fn from_geojson_str(payload: &str) -> Result<Self, BoundaryError> {
        let value: Value =
            serde_json::from_str(payload).map_err(|e| BoundaryError::Json(e.to_string()))?;
        Self::from_geojson_value(&value)
    }

    pub fn from_geojson_value(value: &Value) -> Result<Self, BoundaryError> {
        let obj = value
            .as_object()
            .ok_or(BoundaryError::NotAFeatureCollection)?;
        if obj.get("type").and_then(|v| v.as_str()) != Some("FeatureCollection") {
            return Err(BoundaryError::NotAFeatureCollection);
        }
        let features_val = obj
            .get("features")
            .and_then(|v| v.as_array())
            .ok_or(BoundaryError::NotAFeatureCollection)?;

        let mut out = BoundaryCollection::default();
        for (index, feat_val) in features_val.iter().enumerate() {
            let invalid = |reason: &str| BoundaryError::InvalidFeature {
                index,
                reason: reason.to_string(),
            };
            let feat_obj = feat_val
                .as_object()
                .ok_or_else(|| invalid("feature must be an object"))?;
            if feat_obj.get("type").and_then(|v| v.as_str()) != Some("Feature") {
                return Err(invalid("feature type must be \"Feature\""));
            }

            let id = match feat_obj.get("id") {
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            };
            let properties = feat_obj
                .get("properties")
                .and_then(|v| v.as_object())
                .cloned()
                .unwrap_or_default();

            let polygons = match feat_obj.get("geometry") {
                Some(Value::Object(geom)) => match geom.get("type").and_then(|v| v.as_str()) {
                    Some("Polygon") => coordinates(geom)
                        .and_then(parse_polygon)
                        .map(|poly| vec![poly])
                        .map_err(|r| invalid(&r))?,
                    Some("MultiPolygon") => coordinates(geom)
                        .and_then(parse_multi_polygon)
                        .map_err(|r| invalid(&r))?,
                    _ => {
                        out.skipped += 1;
                        continue;
                    }
                },
                _ => {
                    out.skipped += 1;
                    continue;
                }
            };

            out.features.push(BoundaryFeature {
                id,
                properties,
                polygons,
            });
        }
        Ok(out)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

fn coordinates(geom: &Map<String, Value>) -> Result<&Value, String> {
    geom.get("coordinates")
        .ok_or("geometry missing coordinates".to_string())
}

fn parse_position(coords: &Value) -> Result<LatLng, String> {
    let arr = coords
        .as_array()
        .ok_or("position must be an array".to_string())?;
    if arr.len() < 2 {
        return Err("position must have [lon, lat]".to_string());
    }
    let lon = arr[0].as_f64().ok_or("lon must be a number".to_string())?;
    let lat = arr[1].as_f64().ok_or("lat must be a number".to_string())?;
    Ok(LatLng::new(lat, lon))
}

fn parse_ring(coords: &Value) -> Result<Ring, String> {
    let arr = coords
        .as_array()
        .ok_or("ring must be an array".to_string())?;
    arr.iter().map(parse_position).collect()
}

fn parse_polygon(coords: &Value) -> Result<Polygon, String> {
    let rings = coords
        .as_array()
        .ok_or("Polygon coordinates must be an array of rings".to_string())?;
    rings.iter().map(parse_ring).collect()
}

fn parse_multi_polygon(coords: &Value) -> Result<Vec<Polygon>, String> {
    let polys = coords
        .as_array()
        .ok_or("MultiPolygon coordinates must be an array of polygons".to_string())?;
    polys.iter().map(parse_polygon).collect()
}

#[cfg(test)]
mod tests {
    use super::{BoundaryCollection, BoundaryError};

    const DISTRICTS: &str = r#"{
      "type": "FeatureCollection",
      "features": [
        {"type": "Feature", "properties": {"NAME": "Kota Kinabalu"},
         "geometry": {"type": "Polygon", "coordinates": [[[116.0, 5.9], [116.2, 5.9], [116.2, 6.1], [116.0, 6.1], [116.0, 5.9]]]}},
        {"type": "Feature", "id": 7, "properties": {"DAERAH": "Tawau"},
         "geometry": {"type": "MultiPolygon", "coordinates": [[[[117.8, 4.2], [118.0, 4.2], [118.0, 4.4], [117.8, 4.2]]], [[[118.1, 4.1], [118.2, 4.1], [118.2, 4.2], [118.1, 4.1]]]]}},
        {"type": "Feature", "properties": {"NAME": "Label"},
         "geometry": {"type": "Point", "coordinates": [116.0, 5.9]}},
        {"type": "Feature", "properties": {}, "geometry": null}
      ]
    }"#;

    #[test]
    fn keeps_polygon_features_and_counts_the_rest() {
        let c = BoundaryCollection::from_geojson_str(DISTRICTS).expect("parse");
        assert_eq!(c.len(), 2);
        assert_eq!(c.skipped, 2);
        assert_eq!(c.features[1].id.as_deref(), Some("7"));
        assert_eq!(c.features[1].polygons.len(), 2);
        assert_eq!(
            c.features[0].property_text("NAME").as_deref(),
            Some("Kota Kinabalu")
        );
    }

    #[test]
    fn feature_bounds_swap_geojson_axis_order() {
        let c = BoundaryCollection::from_geojson_str(DISTRICTS).unwrap();
        let b = c.features[0].bounds().unwrap();
        assert_eq!(b.south, 5.9);
        assert_eq!(b.north, 6.1);
        assert_eq!(b.west, 116.0);
        assert_eq!(b.east, 116.2);
    }

    #[test]
    fn rejects_non_collections() {
        let err = BoundaryCollection::from_geojson_str(r#"{"type": "Feature"}"#).unwrap_err();
        assert!(matches!(err, BoundaryError::NotAFeatureCollection));
        let err = BoundaryCollection::from_geojson_str("not json").unwrap_err();
        assert!(matches!(err, BoundaryError::Json(_)));
    }

    #[test]
    fn malformed_polygon_fails_the_layer() {
        let payload = r#"{"type":"FeatureCollection","features":[
          {"type":"Feature","properties":{},"geometry":{"type":"Polygon","coordinates":[[["a", 1]]]}}]}"#;
        let err = BoundaryCollection::from_geojson_str(payload).unwrap_err();
        assert!(matches!(err, BoundaryError::InvalidFeature { index: 0, .. }));
    }
}
