use serde::{Deserialize, Serialize};

/// Photo licenses accepted by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum License {
    CC_BY_30,
    CC_BY_NC_40_INT,
    CC_BY_NC_SA_30_DE,
    CC_BY_SA_40,
    CC0_10,
    UNKNOWN,
}

impl License {
    pub fn display_name(&self) -> &'static str {
        match self {
            License::CC_BY_30 => "CC BY 3.0",
            License::CC_BY_NC_40_INT => "CC BY-NC 4.0 International",
            License::CC_BY_NC_SA_30_DE => "CC BY-NC-SA 3.0 DE",
            License::CC_BY_SA_40 => "CC BY-SA 4.0",
            License::CC0_10 => "CC0 1.0 Universell (CC0 1.0)",
            License::UNKNOWN => "Unknown License",
        }
    }

    pub fn url(&self) -> Option<&'static str> {
        match self {
            License::CC_BY_30 => Some("https://creativecommons.org/licenses/by/3.0/"),
            License::CC_BY_NC_40_INT => Some("https://creativecommons.org/licenses/by-nc/4.0/"),
            License::CC_BY_NC_SA_30_DE => {
                Some("https://creativecommons.org/licenses/by-nc-sa/3.0/de/")
            }
            License::CC_BY_SA_40 => Some("https://creativecommons.org/licenses/by-sa/4.0/"),
            License::CC0_10 => Some("https://creativecommons.org/publicdomain/zero/1.0/"),
            License::UNKNOWN => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            License::CC_BY_30 => "CC_BY_30",
            License::CC_BY_NC_40_INT => "CC_BY_NC_40_INT",
            License::CC_BY_NC_SA_30_DE => "CC_BY_NC_SA_30_DE",
            License::CC_BY_SA_40 => "CC_BY_SA_40",
            License::CC0_10 => "CC0_10",
            License::UNKNOWN => "UNKNOWN",
        }
    }

    /// Parse a stored license name, falling back to `UNKNOWN`.
    pub fn of(name: Option<&str>) -> License {
        match name {
            Some("CC_BY_30") => License::CC_BY_30,
            Some("CC_BY_NC_40_INT") => License::CC_BY_NC_40_INT,
            Some("CC_BY_NC_SA_30_DE") => License::CC_BY_NC_SA_30_DE,
            Some("CC_BY_SA_40") => License::CC_BY_SA_40,
            Some("CC0_10") => License::CC0_10,
            _ => License::UNKNOWN,
        }
    }
}
