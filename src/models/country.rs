use serde::{Deserialize, Serialize};

use super::License;

/// A country participating in the catalog. Identity is the ISO code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Country {
    pub code: String,
    pub name: String,
    pub email: Option<String>,
    pub timetable_url_template: Option<String>,
    /// When set, photos imported for this country carry this license
    /// instead of the photographer's.
    pub override_license: Option<License>,
    pub active: bool,
}

impl Country {
    pub fn email(&self) -> &str {
        self.email.as_deref().unwrap_or("info@railpix.example")
    }
}

impl PartialEq for Country {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

impl Eq for Country {}
