//! Status posts to a Mastodon instance.

use std::time::Duration;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::MastodonConfig;
use crate::ports::MastodonPort;

#[derive(Serialize)]
struct Toot {
    status: String,
    visibility: &'static str,
}

pub struct MastodonClient {
    client: reqwest::Client,
    config: MastodonConfig,
}

impl MastodonClient {
    pub fn new(config: MastodonConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client");
        Self { client, config }
    }
}

impl MastodonPort for MastodonClient {
    fn post_photo(&self, status: String) {
        if self.config.instance_url.trim().is_empty() || self.config.token.trim().is_empty() {
            warn!("photo not tooted: {status}");
            return;
        }
        info!("sending toot for new photo: {status}");
        let client = self.client.clone();
        let config = self.config.clone();
        tokio::spawn(async move {
            let result = client
                .post(format!("{}/api/v1/statuses", config.instance_url))
                .bearer_auth(&config.token)
                .json(&Toot {
                    status,
                    visibility: "unlisted",
                })
                .send()
                .await;
            match result {
                Ok(response) if response.status().is_success() => {
                    info!(
                        "got json response: {}",
                        response.text().await.unwrap_or_default()
                    );
                }
                Ok(response) => {
                    error!(
                        "error posting status, status {}: {}",
                        response.status(),
                        response.text().await.unwrap_or_default()
                    );
                }
                Err(err) => error!("error sending toot: {err}"),
            }
        });
    }
}

/// Poster used when no Mastodon instance is configured.
pub struct NoopMastodon;

impl MastodonPort for NoopMastodon {
    fn post_photo(&self, status: String) {
        info!("mastodon disabled, not posting: {status}");
    }
}
