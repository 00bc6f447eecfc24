//! Adapters behind the outbound ports: persistence and notification.

pub mod db;
pub mod mailer;
pub mod mastodon;
pub mod monitor;
