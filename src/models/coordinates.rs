use serde::{Deserialize, Serialize};

/// Geographic position of a station or a proposed station.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Both components exactly zero. Used as "no coordinates given" marker.
    pub fn has_zero_coords(&self) -> bool {
        self.lat == 0.0 && self.lon == 0.0
    }

    pub fn is_valid(&self) -> bool {
        self.lat.abs() < 90.0 && self.lon.abs() < 180.0 && !self.has_zero_coords()
    }
}
