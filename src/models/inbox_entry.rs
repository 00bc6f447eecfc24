use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Coordinates, ProblemReportType};

/// Name of an upload in the inbox directories.
pub fn create_inbox_filename(id: i64, extension: &str) -> String {
    format!("{id}.{extension}")
}

/// One user submission: either a photo upload or a problem report.
///
/// Entries are immutable values; enrichment for the admin view goes
/// through [`InboxEntry::with_enrichment`] instead of field mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxEntry {
    pub id: i64,
    pub country_code: Option<String>,
    pub station_id: Option<String>,
    pub photo_id: Option<i64>,
    /// Title of the target station, when it exists.
    pub title: Option<String>,
    /// Proposed new title carried by a problem report.
    pub new_title: Option<String>,
    /// Coordinates of the target station, when it exists.
    pub coordinates: Option<Coordinates>,
    /// Proposed coordinates for a missing station or location fix.
    pub new_coordinates: Option<Coordinates>,
    pub photographer_id: i64,
    pub photographer_nickname: Option<String>,
    pub photographer_email: Option<String>,
    pub extension: Option<String>,
    pub comment: Option<String>,
    pub reject_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub done: bool,
    pub existing_photo_url_path: Option<String>,
    pub crc32: Option<u32>,
    pub conflict: bool,
    pub problem_report_type: Option<ProblemReportType>,
    pub processed: bool,
    pub inbox_url: Option<String>,
    pub ds100: Option<String>,
    pub active: Option<bool>,
    pub notified: bool,
    pub posted: bool,
}

impl InboxEntry {
    pub fn is_photo_upload(&self) -> bool {
        self.problem_report_type.is_none() && self.extension.is_some()
    }

    pub fn is_problem_report(&self) -> bool {
        self.problem_report_type.is_some()
    }

    /// `"<id>.<extension>"`, derivable only for photo payloads.
    pub fn filename(&self) -> Option<String> {
        self.extension
            .as_deref()
            .map(|extension| create_inbox_filename(self.id, extension))
    }

    pub fn has_photo(&self) -> bool {
        self.existing_photo_url_path.is_some()
    }

    pub fn lat(&self) -> Option<f64> {
        self.coordinates.map(|c| c.lat)
    }

    pub fn lon(&self) -> Option<f64> {
        self.coordinates.map(|c| c.lon)
    }

    pub fn new_lat(&self) -> Option<f64> {
        self.new_coordinates.map(|c| c.lat)
    }

    pub fn new_lon(&self) -> Option<f64> {
        self.new_coordinates.map(|c| c.lon)
    }

    /// Copy with the admin-view fields attached.
    pub fn with_enrichment(self, processed: bool, inbox_url: Option<String>, conflict: bool) -> Self {
        Self {
            processed,
            inbox_url,
            conflict,
            ..self
        }
    }
}
