use serde::{Deserialize, Serialize};

use super::Coordinates;

/// How an admin reconciles a conflicted import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictResolution {
    DoNothing,
    OverwriteExistingPhoto,
    ImportAsNewPrimaryPhoto,
    ImportAsNewSecondaryPhoto,
    IgnoreNearbyStation,
}

impl ConflictResolution {
    pub fn solves_photo_conflict(&self) -> bool {
        matches!(
            self,
            ConflictResolution::OverwriteExistingPhoto
                | ConflictResolution::ImportAsNewPrimaryPhoto
                | ConflictResolution::ImportAsNewSecondaryPhoto
        )
    }

    pub fn solves_station_conflict(&self) -> bool {
        matches!(self, ConflictResolution::IgnoreNearbyStation)
    }
}

/// Parameters of an admin moderation command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxCommand {
    pub id: i64,
    pub country_code: Option<String>,
    pub station_id: Option<String>,
    pub title: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub reject_reason: Option<String>,
    pub ds100: Option<String>,
    pub active: Option<bool>,
    pub conflict_resolution: Option<ConflictResolution>,
}

impl InboxCommand {
    pub fn has_coords(&self) -> bool {
        self.coordinates
            .map(|coordinates| !coordinates.has_zero_coords())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn photo_conflict_resolutions() {
        assert!(ConflictResolution::OverwriteExistingPhoto.solves_photo_conflict());
        assert!(ConflictResolution::ImportAsNewPrimaryPhoto.solves_photo_conflict());
        assert!(ConflictResolution::ImportAsNewSecondaryPhoto.solves_photo_conflict());
        assert!(!ConflictResolution::DoNothing.solves_photo_conflict());
        assert!(!ConflictResolution::IgnoreNearbyStation.solves_photo_conflict());
    }

    #[test]
    fn station_conflict_resolutions() {
        assert!(ConflictResolution::IgnoreNearbyStation.solves_station_conflict());
        assert!(!ConflictResolution::ImportAsNewPrimaryPhoto.solves_station_conflict());
    }
}
