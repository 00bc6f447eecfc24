//! Thin HTTP layer over the services. Submission endpoints map the
//! response-state enumeration to fixed status codes; admin endpoints
//! surface validation failures as plain-text 400s.

mod auth;
mod handlers;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::Router;

use crate::models::InboxResponseState;
use crate::ports::{CountryPort, StationPort, UserPort};
use crate::services::{InboxService, StatisticService};

pub use auth::{AdminUser, AuthUser};

#[derive(Clone)]
pub struct AppState {
    pub inbox_service: Arc<InboxService>,
    pub statistic_service: Arc<StatisticService>,
    pub station_port: Arc<dyn StationPort>,
    pub country_port: Arc<dyn CountryPort>,
    pub user_port: Arc<dyn UserPort>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/photoUpload", post(handlers::photo_upload))
        .route(
            "/photoUpload/multipart",
            post(handlers::photo_upload_multipart),
        )
        .route("/reportProblem", post(handlers::report_problem))
        .route("/publicInbox", get(handlers::public_inbox))
        .route(
            "/userInbox",
            get(handlers::user_inbox).post(handlers::user_inbox_by_ids),
        )
        .route("/userInbox/{id}", delete(handlers::delete_user_inbox_entry))
        .route(
            "/adminInbox",
            get(handlers::admin_inbox).post(handlers::admin_command),
        )
        .route("/adminInboxCount", get(handlers::admin_inbox_count))
        .route("/stats", get(handlers::stats))
        .route("/countries", get(handlers::countries))
        .route(
            "/photoStationsByCountry/{country}",
            get(handlers::stations_by_country),
        )
        // uploads may be larger than axum's default 2 MB body cap; the
        // real limit is enforced while streaming to storage
        .layer(DefaultBodyLimit::max(
            crate::storage::MAX_UPLOAD_SIZE as usize + 64 * 1024,
        ))
        .with_state(state)
}

/// Fixed status code for every submission response state.
pub fn status_for(state: InboxResponseState) -> StatusCode {
    match state {
        InboxResponseState::Review => StatusCode::ACCEPTED,
        InboxResponseState::LatLonOutOfRange
        | InboxResponseState::NotEnoughData
        | InboxResponseState::UnsupportedContentType => StatusCode::BAD_REQUEST,
        InboxResponseState::PhotoTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        InboxResponseState::Conflict => StatusCode::CONFLICT,
        InboxResponseState::Unauthorized => StatusCode::UNAUTHORIZED,
        InboxResponseState::Error => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_status_mapping() {
        assert_eq!(status_for(InboxResponseState::Review), StatusCode::ACCEPTED);
        assert_eq!(
            status_for(InboxResponseState::LatLonOutOfRange),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(InboxResponseState::NotEnoughData),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(InboxResponseState::UnsupportedContentType),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(InboxResponseState::PhotoTooLarge),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            status_for(InboxResponseState::Conflict),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(InboxResponseState::Unauthorized),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_for(InboxResponseState::Error),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
