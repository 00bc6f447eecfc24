//! Outbound ports of the moderation core. Adapters live in `crate::adapters`
//! and `crate::storage`; tests substitute in-memory fakes.

use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncRead;

use crate::models::{
    Coordinates, Country, InboxEntry, Photo, PublicInboxEntry, Station, StationKey, Statistic,
    User,
};

/// Failure modes of [`PhotoStoragePort::store_upload`].
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("photo exceeds the maximum size of {max_size} bytes")]
    PhotoTooLarge { max_size: u64 },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// File lifecycle of uploaded photos, from inbox to published catalog.
#[async_trait]
pub trait PhotoStoragePort: Send + Sync {
    /// Whether the external classifier has returned a processed copy.
    async fn is_processed(&self, filename: &str) -> bool;

    /// Move the upload into the published photo tree, returning the public
    /// url path (`"/<country>/<stationId>_<n>.<ext>"`).
    async fn import_photo(&self, entry: &InboxEntry, station: &Station)
        -> std::io::Result<String>;

    /// Move the upload to the rejected area and drop classifier copies.
    async fn reject(&self, entry: &InboxEntry) -> std::io::Result<()>;

    /// Stream an incoming upload to the inbox, returning its CRC32.
    async fn store_upload(
        &self,
        body: &mut (dyn AsyncRead + Send + Unpin),
        filename: &str,
    ) -> std::result::Result<u32, StorageError>;

    fn get_upload_file(&self, filename: &str) -> PathBuf;
    fn get_photo_file(&self, country_code: &str, filename: &str) -> PathBuf;
    fn get_inbox_file(&self, filename: &str) -> PathBuf;
    fn get_inbox_processed_file(&self, filename: &str) -> PathBuf;
    fn get_inbox_to_process_file(&self, filename: &str) -> PathBuf;
    fn get_inbox_done_file(&self, filename: &str) -> PathBuf;
    fn get_inbox_rejected_file(&self, filename: &str) -> PathBuf;

    /// Reap done/rejected copies older than the retention window.
    async fn cleanup_old_copies(&self);
}

#[async_trait]
pub trait InboxPort: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<InboxEntry>>;
    async fn find_pending_inbox_entries(&self) -> Result<Vec<InboxEntry>>;
    async fn find_oldest_imported_photo_not_yet_posted(&self) -> Result<Option<InboxEntry>>;
    async fn find_public_inbox_entries(&self) -> Result<Vec<PublicInboxEntry>>;
    async fn insert(&self, entry: &InboxEntry) -> Result<i64>;
    async fn reject(&self, id: i64, reject_reason: &str) -> Result<()>;
    async fn done(&self, id: i64) -> Result<()>;
    async fn count_pending_inbox_entries(&self) -> Result<i64>;
    async fn count_pending_inbox_entries_for_station(
        &self,
        exclude_id: Option<i64>,
        country_code: &str,
        station_id: &str,
    ) -> Result<i64>;
    async fn count_pending_inbox_entries_for_nearby_coordinates(
        &self,
        exclude_id: Option<i64>,
        coordinates: Coordinates,
    ) -> Result<i64>;
    async fn update_crc32(&self, id: i64, crc32: u32) -> Result<()>;
    async fn find_inbox_entries_to_notify(&self) -> Result<Vec<InboxEntry>>;
    async fn update_notified(&self, ids: &[i64]) -> Result<()>;
    async fn update_posted(&self, id: i64) -> Result<()>;
    async fn update_photo_id(&self, id: i64, photo_id: i64) -> Result<()>;
    async fn update_missing_station_imported(
        &self,
        id: i64,
        country_code: &str,
        station_id: &str,
        title: &str,
    ) -> Result<()>;
    async fn find_by_user(
        &self,
        photographer_id: i64,
        show_completed_entries: bool,
    ) -> Result<Vec<InboxEntry>>;
    async fn find_pending_by_station(
        &self,
        country_code: &str,
        station_id: &str,
    ) -> Result<Vec<InboxEntry>>;
}

#[async_trait]
pub trait StationPort: Send + Sync {
    async fn find_by_key(&self, key: &StationKey) -> Result<Option<Station>>;
    async fn find_by_country(&self, country_code: &str) -> Result<Vec<Station>>;
    async fn find_by_photo_id(&self, photo_id: i64) -> Result<Option<Station>>;
    async fn insert(&self, station: &Station) -> Result<()>;
    async fn delete(&self, key: &StationKey) -> Result<()>;
    async fn update_active(&self, key: &StationKey, active: bool) -> Result<()>;
    async fn change_station_title(&self, key: &StationKey, new_title: &str) -> Result<()>;
    async fn update_location(&self, key: &StationKey, coordinates: Coordinates) -> Result<()>;
    async fn count_nearby_coordinates(&self, coordinates: Coordinates) -> Result<i64>;
    /// Highest numeric id among synthesized `Z…` station ids.
    async fn max_z(&self) -> Result<i64>;
    async fn get_statistic(&self, country_code: Option<&str>) -> Result<Statistic>;
}

#[async_trait]
pub trait PhotoPort: Send + Sync {
    async fn insert(&self, photo: &Photo) -> Result<i64>;
    async fn update(&self, photo: &Photo) -> Result<()>;
    async fn delete(&self, id: i64) -> Result<()>;
    async fn update_photo_outdated(&self, id: i64) -> Result<()>;
    async fn set_all_photos_for_station_secondary(&self, key: &StationKey) -> Result<()>;
    async fn set_primary(&self, id: i64) -> Result<()>;
    async fn count_photos(&self) -> Result<i64>;
    async fn find_nth_photo_id(&self, n: i64) -> Result<Option<i64>>;
}

#[async_trait]
pub trait UserPort: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>>;
    async fn find_by_name(&self, name: &str) -> Result<Option<User>>;
    async fn find_by_token(&self, token: &str) -> Result<Option<User>>;
}

#[async_trait]
pub trait CountryPort: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Country>>;
    async fn list(&self, only_active: bool) -> Result<Vec<Country>>;
}

/// Operational chat notifications. Dispatch is fire-and-forget; a slow or
/// broken backend must never block the triggering request.
pub trait MonitorPort: Send + Sync {
    fn send_message(&self, message: String);
    fn send_message_with_file(&self, message: String, file: Option<&Path>);
}

/// Outbound mail. Failures are logged by the adapter, not propagated.
pub trait MailerPort: Send + Sync {
    fn send(&self, to: &str, subject: &str, text: &str);
}

/// Social media status posts, fire-and-forget.
pub trait MastodonPort: Send + Sync {
    fn post_photo(&self, status: String);
}
