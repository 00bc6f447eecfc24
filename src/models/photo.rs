use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{License, StationKey, User};

/// A published photo of a station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub id: i64,
    pub station_key: StationKey,
    /// At most one photo per station is primary.
    pub primary: bool,
    pub url_path: String,
    pub photographer: User,
    pub created_at: DateTime<Utc>,
    pub license: License,
    pub outdated: bool,
}

impl Photo {
    /// Ordering key: primary photos sort before secondary, then by id.
    pub fn sort_key(&self) -> (bool, i64) {
        (!self.primary, self.id)
    }

    pub fn with_id(self, id: i64) -> Self {
        Self { id, ..self }
    }

    pub fn with_primary(self, primary: bool) -> Self {
        Self { primary, ..self }
    }
}
