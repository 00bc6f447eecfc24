//! Social media posts about imported photos.

use std::sync::Arc;

use rand::Rng as _;

use crate::models::ANONYM;
use crate::ports::{InboxPort, MastodonPort, PhotoPort, StationPort, UserPort};

pub struct SocialMediaService {
    inbox_port: Arc<dyn InboxPort>,
    photo_port: Arc<dyn PhotoPort>,
    station_port: Arc<dyn StationPort>,
    user_port: Arc<dyn UserPort>,
    mastodon_port: Arc<dyn MastodonPort>,
    station_url: String,
}

impl SocialMediaService {
    pub fn new(
        inbox_port: Arc<dyn InboxPort>,
        photo_port: Arc<dyn PhotoPort>,
        station_port: Arc<dyn StationPort>,
        user_port: Arc<dyn UserPort>,
        mastodon_port: Arc<dyn MastodonPort>,
        station_url: String,
    ) -> Self {
        Self {
            inbox_port,
            photo_port,
            station_port,
            user_port,
            mastodon_port,
            station_url,
        }
    }

    /// Post the oldest imported-but-unposted photo and mark it posted.
    pub async fn post_recently_imported_photo_not_yet_posted(&self) -> anyhow::Result<()> {
        let Some(entry) = self
            .inbox_port
            .find_oldest_imported_photo_not_yet_posted()
            .await?
        else {
            return Ok(());
        };
        let photographer = self.user_port.find_by_id(entry.photographer_id).await?;

        let mut status = format!(
            "New railway station photo: {}\nby {}\n{}?countryCode={}&stationId={}&photoId={}",
            entry.title.as_deref().unwrap_or_default(),
            photographer
                .as_ref()
                .map(|user| user.display_name())
                .unwrap_or(ANONYM),
            self.station_url,
            entry.country_code.as_deref().unwrap_or_default(),
            entry.station_id.as_deref().unwrap_or_default(),
            entry.photo_id.unwrap_or_default(),
        );
        if let Some(comment) = entry.comment.as_deref().filter(|c| !c.trim().is_empty()) {
            status.push('\n');
            status.push_str(comment);
        }
        status.push_str("\n#newrailwaystationphoto");

        self.mastodon_port.post_photo(status);
        self.inbox_port.update_posted(entry.id).await?;
        Ok(())
    }

    /// Post a random catalog photo.
    pub async fn post_daily_random_photo(&self) -> anyhow::Result<()> {
        let photo_count = self.photo_port.count_photos().await?;
        if photo_count == 0 {
            return Ok(());
        }
        let n = rand::thread_rng().gen_range(0..photo_count);
        let Some(photo_id) = self.photo_port.find_nth_photo_id(n).await? else {
            return Ok(());
        };
        let Some(station) = self.station_port.find_by_photo_id(photo_id).await? else {
            return Ok(());
        };
        let Some(photo) = station
            .photos
            .iter()
            .find(|photo| photo.id == photo_id)
            .or_else(|| station.photos.first())
        else {
            return Ok(());
        };

        let status = format!(
            "Random daily railway station photo: {}\nby {}\n{}?countryCode={}&stationId={}&photoId={}\n#randomdailyrailwaystationphoto",
            station.title,
            photo.photographer.display_name(),
            self.station_url,
            station.key.country,
            station.key.id,
            photo.id,
        );
        self.mastodon_port.post_photo(status);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InboxEntry, StationKey};
    use crate::services::testing::*;
    use chrono::{Duration, Utc};

    struct Setup {
        service: SocialMediaService,
        inbox: Arc<InMemoryInbox>,
        mastodon: Arc<RecordingMastodon>,
    }

    fn setup(
        inbox: InMemoryInbox,
        photos: InMemoryPhotos,
        stations: InMemoryStations,
        users: InMemoryUsers,
    ) -> Setup {
        let inbox = Arc::new(inbox);
        let mastodon = Arc::new(RecordingMastodon::default());
        let service = SocialMediaService::new(
            inbox.clone(),
            Arc::new(photos),
            Arc::new(stations),
            Arc::new(users),
            mastodon.clone(),
            "https://map.railpix.example".to_owned(),
        );
        Setup {
            service,
            inbox,
            mastodon,
        }
    }

    fn imported_entry(id: i64, age_days: i64) -> InboxEntry {
        InboxEntry {
            done: true,
            photo_id: Some(id),
            comment: Some("what a view".to_owned()),
            created_at: Utc::now() - Duration::days(age_days),
            ..photo_upload_entry(id, "de", "4711", 1)
        }
    }

    #[tokio::test]
    async fn posts_oldest_unposted_photo_and_marks_it() {
        let setup = setup(
            InMemoryInbox::with_entries(vec![imported_entry(1, 2), imported_entry(2, 5)]),
            InMemoryPhotos::default(),
            InMemoryStations::default(),
            InMemoryUsers::with_users(vec![photographer(1, "nickname")]),
        );

        setup
            .service
            .post_recently_imported_photo_not_yet_posted()
            .await
            .unwrap();

        let statuses = setup.mastodon.statuses.lock().unwrap();
        assert_eq!(statuses.len(), 1);
        assert!(statuses[0].starts_with("New railway station photo: Station 4711\nby nickname\n"));
        assert!(statuses[0].contains("photoId=2"));
        assert!(statuses[0].contains("what a view"));
        assert!(statuses[0].ends_with("#newrailwaystationphoto"));
        drop(statuses);
        assert!(setup.inbox.get(2).unwrap().posted);
        assert!(!setup.inbox.get(1).unwrap().posted);
    }

    #[tokio::test]
    async fn nothing_to_post() {
        let setup = setup(
            InMemoryInbox::default(),
            InMemoryPhotos::default(),
            InMemoryStations::default(),
            InMemoryUsers::default(),
        );

        setup
            .service
            .post_recently_imported_photo_not_yet_posted()
            .await
            .unwrap();

        assert!(setup.mastodon.statuses.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn posts_a_random_photo() {
        let user = photographer(1, "nickname");
        let key = StationKey::new("de", "4711");
        let photos = vec![photo(1, &key, true, &user)];
        let setup = setup(
            InMemoryInbox::default(),
            InMemoryPhotos::with_photos(photos.clone()),
            InMemoryStations::with_stations(vec![station("de", "4711", photos)]),
            InMemoryUsers::with_users(vec![user]),
        );

        setup.service.post_daily_random_photo().await.unwrap();

        let statuses = setup.mastodon.statuses.lock().unwrap();
        assert_eq!(statuses.len(), 1);
        assert!(statuses[0].starts_with("Random daily railway station photo: Station 4711"));
        assert!(statuses[0].ends_with("#randomdailyrailwaystationphoto"));
    }
}
