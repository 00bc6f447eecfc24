use serde::{Deserialize, Serialize};

/// Per-country (or global) catalog statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistic {
    pub country_code: Option<String>,
    pub total: i64,
    pub with_photo: i64,
    pub photographers: i64,
}

impl Statistic {
    pub fn without_photo(&self) -> i64 {
        self.total - self.with_photo
    }
}
