use serde::{Deserialize, Serialize};

/// Outcome of a submission (photo upload or problem report).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InboxResponseState {
    Review,
    LatLonOutOfRange,
    NotEnoughData,
    UnsupportedContentType,
    PhotoTooLarge,
    Conflict,
    Unauthorized,
    Error,
}

/// Structured submission response handed to the web layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxResponse {
    pub id: Option<i64>,
    pub state: InboxResponseState,
    pub message: Option<String>,
    pub filename: Option<String>,
    pub inbox_url: Option<String>,
    pub crc32: Option<u32>,
}

impl InboxResponse {
    pub fn of(state: InboxResponseState, message: impl Into<String>) -> Self {
        Self {
            id: None,
            state,
            message: Some(message.into()),
            filename: None,
            inbox_url: None,
            crc32: None,
        }
    }

    pub fn review(id: i64) -> Self {
        Self {
            id: Some(id),
            state: InboxResponseState::Review,
            message: None,
            filename: None,
            inbox_url: None,
            crc32: None,
        }
    }
}
