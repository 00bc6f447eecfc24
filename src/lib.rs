//! Backend of a crowdsourced railway station photo catalog: photo and
//! problem-report submissions, an admin moderation inbox, and public
//! station/country/statistics endpoints.

pub mod adapters;
pub mod clock;
pub mod config;
pub mod error;
pub mod images;
pub mod models;
pub mod ports;
mod serve;
pub mod services;
pub mod storage;
pub mod tasks;
pub mod web;

pub use serve::run;

/// The application user agent, e.g. `railpix/0.1.0`.
pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// The index (/) route.
async fn index() -> impl axum::response::IntoResponse {
    r"
railpix - a crowdsourced railway station photo catalog

Upload photos of railway stations, report problems with catalog data,
and browse the public inbox while admins review submissions.

Most API routes live at the root, e.g. /photoUpload and /publicInbox.
    "
}
