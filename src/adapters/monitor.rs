//! Operational chat notifications via a Matrix room.
//!
//! Dispatch is fire-and-forget: messages are posted from spawned tasks
//! with fixed timeouts so a slow homeserver never blocks a request.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::MatrixConfig;
use crate::images::{extension_to_mime_type, get_extension};
use crate::ports::MonitorPort;

#[derive(Serialize)]
struct MatrixTextMessage {
    msgtype: &'static str,
    body: String,
}

#[derive(Serialize)]
struct MatrixImageMessage {
    msgtype: &'static str,
    body: String,
    url: String,
}

#[derive(Deserialize)]
struct MatrixUploadResponse {
    content_uri: String,
}

pub struct MatrixMonitor {
    client: reqwest::Client,
    config: MatrixConfig,
}

impl MatrixMonitor {
    pub fn new(config: MatrixConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client");
        Self { client, config }
    }

    async fn send_room_message(
        client: &reqwest::Client,
        config: &MatrixConfig,
        message: impl Serialize,
    ) -> anyhow::Result<()> {
        let response = client
            .post(format!(
                "{}?access_token={}",
                config.room_url, config.access_token
            ))
            .json(&message)
            .send()
            .await?;
        let status = response.status();
        let content = response.text().await.unwrap_or_default();
        if status.is_success() {
            info!("got json response: {content}");
        } else {
            error!("error reading json, status {status}: {content}");
        }
        Ok(())
    }

    async fn send_photo(
        client: &reqwest::Client,
        config: &MatrixConfig,
        photo: &Path,
    ) -> anyhow::Result<()> {
        let filename = photo
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content_type = get_extension(&filename)
            .as_deref()
            .and_then(extension_to_mime_type)
            .unwrap_or("application/octet-stream");
        let bytes = tokio::fs::read(photo).await?;

        let response = client
            .post(format!(
                "{}?filename={filename}&access_token={}",
                config.upload_url, config.access_token
            ))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            error!(
                "error uploading photo to matrix, status {status}: {}",
                response.text().await.unwrap_or_default()
            );
            return Ok(());
        }
        let upload: MatrixUploadResponse = response.json().await?;

        Self::send_room_message(
            client,
            config,
            MatrixImageMessage {
                msgtype: "m.image",
                body: filename,
                url: upload.content_uri,
            },
        )
        .await
    }
}

impl MonitorPort for MatrixMonitor {
    fn send_message(&self, message: String) {
        self.send_message_with_file(message, None);
    }

    fn send_message_with_file(&self, message: String, file: Option<&Path>) {
        info!("sending message: {message}");
        if self.config.room_url.trim().is_empty() {
            warn!("skipping message, missing Matrix room URL config");
            return;
        }
        let client = self.client.clone();
        let config = self.config.clone();
        let file = file.map(Path::to_path_buf);
        tokio::spawn(async move {
            if let Err(err) = Self::send_room_message(
                &client,
                &config,
                MatrixTextMessage {
                    msgtype: "m.text",
                    body: message,
                },
            )
            .await
            {
                warn!("error sending Matrix message: {err}");
                return;
            }
            if let Some(file) = file {
                if let Err(err) = Self::send_photo(&client, &config, &file).await {
                    warn!("error sending Matrix photo: {err}");
                }
            }
        });
    }
}

/// Fallback monitor that only writes to the log.
pub struct LoggingMonitor;

impl MonitorPort for LoggingMonitor {
    fn send_message(&self, message: String) {
        info!("monitor: {message}");
    }

    fn send_message_with_file(&self, message: String, file: Option<&Path>) {
        info!("monitor: {message} (file: {file:?})");
    }
}
