use serde::{Deserialize, Serialize};

use super::Coordinates;

/// What a user can report about existing catalog data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProblemReportType {
    WrongLocation,
    StationActive,
    StationInactive,
    StationNonexistent,
    WrongPhoto,
    PhotoOutdated,
    Other,
    WrongName,
    Duplicate,
}

impl ProblemReportType {
    /// Report types that only make sense against an existing photo.
    pub fn needs_photo(&self) -> bool {
        matches!(
            self,
            ProblemReportType::WrongPhoto | ProblemReportType::PhotoOutdated
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProblemReportType::WrongLocation => "WRONG_LOCATION",
            ProblemReportType::StationActive => "STATION_ACTIVE",
            ProblemReportType::StationInactive => "STATION_INACTIVE",
            ProblemReportType::StationNonexistent => "STATION_NONEXISTENT",
            ProblemReportType::WrongPhoto => "WRONG_PHOTO",
            ProblemReportType::PhotoOutdated => "PHOTO_OUTDATED",
            ProblemReportType::Other => "OTHER",
            ProblemReportType::WrongName => "WRONG_NAME",
            ProblemReportType::Duplicate => "DUPLICATE",
        }
    }

    pub fn of(name: &str) -> Option<Self> {
        match name {
            "WRONG_LOCATION" => Some(ProblemReportType::WrongLocation),
            "STATION_ACTIVE" => Some(ProblemReportType::StationActive),
            "STATION_INACTIVE" => Some(ProblemReportType::StationInactive),
            "STATION_NONEXISTENT" => Some(ProblemReportType::StationNonexistent),
            "WRONG_PHOTO" => Some(ProblemReportType::WrongPhoto),
            "PHOTO_OUTDATED" => Some(ProblemReportType::PhotoOutdated),
            "OTHER" => Some(ProblemReportType::Other),
            "WRONG_NAME" => Some(ProblemReportType::WrongName),
            "DUPLICATE" => Some(ProblemReportType::Duplicate),
            _ => None,
        }
    }
}

/// A user-submitted report about an existing station or photo.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemReport {
    pub country_code: String,
    pub station_id: String,
    pub title: Option<String>,
    pub photo_id: Option<i64>,
    #[serde(rename = "type")]
    pub report_type: ProblemReportType,
    pub comment: Option<String>,
    pub coordinates: Option<Coordinates>,
}
