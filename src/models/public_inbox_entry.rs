use serde::{Deserialize, Serialize};

use super::Coordinates;

/// Anonymous projection of a pending photo upload. Excludes the
/// photographer and all moderation metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicInboxEntry {
    pub country_code: Option<String>,
    pub station_id: Option<String>,
    pub title: String,
    pub coordinates: Coordinates,
}

impl PublicInboxEntry {
    pub fn lat(&self) -> f64 {
        self.coordinates.lat
    }

    pub fn lon(&self) -> f64 {
        self.coordinates.lon
    }
}
