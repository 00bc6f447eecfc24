//! Periodic background jobs. Each job runs on its own timer with no
//! cross-job ordering; all of them are at-least-once and idempotent via
//! the notified/posted flags and the age-based file retention.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::config::TasksConfig;
use crate::ports::PhotoStoragePort;
use crate::services::{NotifyUsersService, SocialMediaService};

pub fn spawn_background_tasks(
    config: &TasksConfig,
    storage: Arc<dyn PhotoStoragePort>,
    notify_users: Arc<NotifyUsersService>,
    social_media: Arc<SocialMediaService>,
) {
    spawn_periodic("storage-cleanup", config.cleanup_interval_secs, move || {
        let storage = storage.clone();
        async move {
            storage.cleanup_old_copies().await;
            Ok(())
        }
    });

    spawn_periodic("notify-users", config.notify_interval_secs, move || {
        let notify_users = notify_users.clone();
        async move { notify_users.notify_users().await }
    });

    let poster = social_media.clone();
    spawn_periodic("mastodon-post", config.post_interval_secs, move || {
        let poster = poster.clone();
        async move { poster.post_recently_imported_photo_not_yet_posted().await }
    });

    spawn_periodic(
        "mastodon-random-post",
        config.random_post_interval_secs,
        move || {
            let social_media = social_media.clone();
            async move { social_media.post_daily_random_photo().await }
        },
    );
}

fn spawn_periodic<F, Fut>(name: &'static str, period_secs: u64, mut job: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: std::future::Future<Output = anyhow::Result<()>> + Send,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(period_secs));
        // the first tick completes immediately; skip it so jobs don't all
        // fire at startup
        ticker.tick().await;
        loop {
            ticker.tick().await;
            info!("running background task {name}");
            if let Err(err) = job().await {
                error!("background task {name} failed: {err:#}");
            }
        }
    });
}
