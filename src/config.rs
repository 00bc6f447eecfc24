//! Application configuration, merged from a TOML file and
//! `RAILPIX_`-prefixed environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
pub struct AppConfig {
    pub listen_address: Option<SocketAddr>,
    /// Database connection string, e.g. `sqlite://data/railpix.db`.
    #[serde(default = "default_db")]
    pub db: String,
    /// Root of the photo working directory tree.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
    /// Retention for done/rejected upload copies.
    pub keep_file_copies_days: Option<u32>,
    #[serde(default = "default_inbox_base_url")]
    pub inbox_base_url: String,
    #[serde(default = "default_photo_base_url")]
    pub photo_base_url: String,
    /// Base url of the public map, linked from social media posts.
    #[serde(default = "default_station_url")]
    pub station_url: String,
    pub mailer: Option<MailerConfig>,
    pub matrix: Option<MatrixConfig>,
    pub mastodon: Option<MastodonConfig>,
    #[serde(default)]
    pub tasks: TasksConfig,
}

#[derive(Deserialize, Debug, Clone)]
pub struct MailerConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct MatrixConfig {
    /// Room message endpoint, e.g.
    /// `https://matrix.example/_matrix/client/r0/rooms/!room:example/send/m.room.message`.
    pub room_url: String,
    /// Media upload endpoint, e.g.
    /// `https://matrix.example/_matrix/media/r0/upload`.
    pub upload_url: String,
    pub access_token: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct MastodonConfig {
    pub instance_url: String,
    pub token: String,
}

/// Periods of the background jobs, in seconds.
#[derive(Deserialize, Debug, Clone)]
pub struct TasksConfig {
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
    #[serde(default = "default_notify_interval")]
    pub notify_interval_secs: u64,
    #[serde(default = "default_post_interval")]
    pub post_interval_secs: u64,
    #[serde(default = "default_random_post_interval")]
    pub random_post_interval_secs: u64,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            cleanup_interval_secs: default_cleanup_interval(),
            notify_interval_secs: default_notify_interval(),
            post_interval_secs: default_post_interval(),
            random_post_interval_secs: default_random_post_interval(),
        }
    }
}

fn default_db() -> String {
    "sqlite://data/railpix.db".to_owned()
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("data/photos")
}

fn default_inbox_base_url() -> String {
    "http://localhost:8000/inbox".to_owned()
}

fn default_photo_base_url() -> String {
    "http://localhost:8000/photos".to_owned()
}

fn default_station_url() -> String {
    "http://localhost:8000/map".to_owned()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_cleanup_interval() -> u64 {
    60 * 60 * 24
}

fn default_notify_interval() -> u64 {
    60 * 60 * 24
}

fn default_post_interval() -> u64 {
    60 * 60
}

fn default_random_post_interval() -> u64 {
    60 * 60 * 24
}
