use serde::{Deserialize, Serialize};

use super::{Coordinates, Photo};

/// Unique station identity: country code plus a per-country station id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StationKey {
    pub country: String,
    pub id: String,
}

impl StationKey {
    pub fn new(country: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            id: id.into(),
        }
    }
}

impl std::fmt::Display for StationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.country, self.id)
    }
}

/// A railway station with its attached photos.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    pub key: StationKey,
    pub title: String,
    pub coordinates: Coordinates,
    pub ds100: Option<String>,
    pub photos: Vec<Photo>,
    pub active: bool,
}

impl Station {
    pub fn has_photo(&self) -> bool {
        !self.photos.is_empty()
    }

    pub fn primary_photo(&self) -> Option<&Photo> {
        self.photos.iter().find(|photo| photo.primary)
    }
}

impl PartialEq for Station {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Station {}
