/// WGS84 position in degrees.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Decimal digits kept when comparing marker positions.
pub const POSITION_PRECISION_DIGITS: i32 = 6;

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// `(0, 0)` marks a row whose coordinates were missing or unparsable.
    pub fn is_unmapped(&self) -> bool {
        self.lat == 0.0 && self.lng == 0.0
    }

    pub fn is_mappable(&self) -> bool {
        !self.is_unmapped()
    }

    /// Equality at [`POSITION_PRECISION_DIGITS`] decimal digits.
    pub fn same_position(&self, other: &LatLng) -> bool {
        quantize(self.lat) == quantize(other.lat) && quantize(self.lng) == quantize(other.lng)
    }
}

fn quantize(v: f64) -> i64 {
    let scale = 10f64.powi(POSITION_PRECISION_DIGITS);
    (v * scale).round() as i64
}
