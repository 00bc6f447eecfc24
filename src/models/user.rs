use serde::{Deserialize, Serialize};
use url::Url;

use super::License;

pub const EMAIL_VERIFIED: &str = "VERIFIED";
pub const EMAIL_VERIFIED_AT_NEXT_LOGIN: &str = "NEXT_LOGIN";
pub const ANONYM: &str = "Anonym";

/// A registered photographer or admin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub url: Option<String>,
    pub license: License,
    pub email: Option<String>,
    pub own_photos: bool,
    pub anonymous: bool,
    pub admin: bool,
    pub email_verification: Option<String>,
    pub send_notifications: bool,
    pub locale: String,
}

impl User {
    pub fn display_name(&self) -> &str {
        if self.anonymous {
            ANONYM
        } else {
            &self.name
        }
    }

    pub fn display_url(&self) -> &str {
        match &self.url {
            Some(url) if !self.anonymous && !url.trim().is_empty() => url,
            _ => "https://railpix.example",
        }
    }

    /// Name and a plausible email address are the registration minimum.
    pub fn is_valid_for_registration(&self) -> bool {
        !self.name.trim().is_empty()
            && self
                .email
                .as_deref()
                .is_some_and(|email| is_plausible_email(email))
    }

    /// Registration minimum plus an http(s) link, if one is set at all.
    pub fn is_valid(&self) -> bool {
        if !self.is_valid_for_registration() {
            return false;
        }
        match self.url.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(url) => Url::parse(url)
                .map(|parsed| matches!(parsed.scheme(), "http" | "https"))
                .unwrap_or(false),
        }
    }

    pub fn is_email_verified(&self) -> bool {
        self.email_verification.as_deref() == Some(EMAIL_VERIFIED)
    }

    /// Uploads require a complete profile, a verified address, declared
    /// photo ownership and the permissive license.
    pub fn is_eligible_to_upload_photo(&self) -> bool {
        self.is_valid() && self.is_email_verified() && self.own_photos && self.license == License::CC0_10
    }

    pub fn is_eligible_to_report_problem(&self) -> bool {
        self.is_email_verified() && self.is_valid()
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.trim().split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_user() -> User {
        User {
            id: 42,
            name: "nickname".to_owned(),
            url: Some("https://example.com/me".to_owned()),
            license: License::CC0_10,
            email: Some("nickname@example.com".to_owned()),
            own_photos: true,
            anonymous: false,
            admin: false,
            email_verification: Some(EMAIL_VERIFIED.to_owned()),
            send_notifications: true,
            locale: "en".to_owned(),
        }
    }

    #[test]
    fn eligible_to_upload() {
        assert!(valid_user().is_eligible_to_upload_photo());
    }

    #[test]
    fn not_eligible_without_verified_email() {
        let user = User {
            email_verification: Some(EMAIL_VERIFIED_AT_NEXT_LOGIN.to_owned()),
            ..valid_user()
        };
        assert!(!user.is_eligible_to_upload_photo());
        assert!(!user.is_eligible_to_report_problem());
    }

    #[test]
    fn not_eligible_without_own_photos() {
        let user = User {
            own_photos: false,
            ..valid_user()
        };
        assert!(!user.is_eligible_to_upload_photo());
    }

    #[test]
    fn not_eligible_with_restrictive_license() {
        let user = User {
            license: License::CC_BY_NC_40_INT,
            ..valid_user()
        };
        assert!(!user.is_eligible_to_upload_photo());
    }

    #[test]
    fn invalid_url_scheme_rejected() {
        let user = User {
            url: Some("ftp://example.com".to_owned()),
            ..valid_user()
        };
        assert!(!user.is_valid());
    }

    #[test]
    fn missing_url_is_fine() {
        let user = User {
            url: None,
            ..valid_user()
        };
        assert!(user.is_valid());
    }

    #[test]
    fn anonymous_display_name() {
        let user = User {
            anonymous: true,
            ..valid_user()
        };
        assert_eq!(user.display_name(), ANONYM);
        assert_eq!(user.display_url(), "https://railpix.example");
    }
}
