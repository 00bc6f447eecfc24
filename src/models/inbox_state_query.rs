use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Coordinates, ProblemReportType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InboxState {
    Unknown,
    Review,
    Conflict,
    Accepted,
    Rejected,
}

/// Per-user view of one inbox entry's progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxStateQuery {
    pub id: i64,
    pub country_code: Option<String>,
    pub station_id: Option<String>,
    pub title: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub new_title: Option<String>,
    pub new_coordinates: Option<Coordinates>,
    pub state: InboxState,
    pub comment: Option<String>,
    pub problem_report_type: Option<ProblemReportType>,
    pub rejected_reason: Option<String>,
    pub filename: Option<String>,
    pub inbox_url: Option<String>,
    pub crc32: Option<u32>,
    pub created_at: DateTime<Utc>,
}
