//! In-memory port fakes shared by the service tests.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::clock::{Clock, FixedClock};
use crate::models::{
    Coordinates, Country, InboxEntry, License, Photo, ProblemReportType, PublicInboxEntry,
    Station, StationKey, Statistic, User, EMAIL_VERIFIED,
};
use crate::ports::{
    CountryPort, InboxPort, MailerPort, MastodonPort, MonitorPort, PhotoPort, PhotoStoragePort,
    StationPort, StorageError, UserPort,
};
use crate::services::InboxService;
use crate::storage::MAX_UPLOAD_SIZE;

// ----- fixtures ----------------------------------------------------------

pub fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()))
}

pub fn photographer(id: i64, name: &str) -> User {
    User {
        id,
        name: name.to_owned(),
        url: Some("https://example.com/photographer".to_owned()),
        license: License::CC0_10,
        email: Some(format!("{name}@example.com")),
        own_photos: true,
        anonymous: false,
        admin: false,
        email_verification: Some(EMAIL_VERIFIED.to_owned()),
        send_notifications: true,
        locale: "en".to_owned(),
    }
}

pub fn country_de(override_license: Option<License>) -> Country {
    Country {
        code: "de".to_owned(),
        name: "Germany".to_owned(),
        email: None,
        timetable_url_template: None,
        override_license,
        active: true,
    }
}

pub fn photo(id: i64, key: &StationKey, primary: bool, photographer_user: &User) -> Photo {
    Photo {
        id,
        station_key: key.clone(),
        primary,
        url_path: format!("/{}/{}_{id}.jpg", key.country, key.id),
        photographer: photographer_user.clone(),
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        license: License::CC0_10,
        outdated: false,
    }
}

pub fn station(country: &str, id: &str, photos: Vec<Photo>) -> Station {
    Station {
        key: StationKey::new(country, id),
        title: format!("Station {id}"),
        coordinates: Coordinates::new(50.1, 9.8),
        ds100: None,
        photos,
        active: true,
    }
}

pub fn photo_upload_entry(id: i64, country: &str, station_id: &str, photographer_id: i64) -> InboxEntry {
    InboxEntry {
        id,
        country_code: Some(country.to_owned()),
        station_id: Some(station_id.to_owned()),
        photo_id: None,
        title: Some(format!("Station {station_id}")),
        new_title: None,
        coordinates: Some(Coordinates::new(50.1, 9.8)),
        new_coordinates: None,
        photographer_id,
        photographer_nickname: None,
        photographer_email: None,
        extension: Some("jpg".to_owned()),
        comment: None,
        reject_reason: None,
        created_at: Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0).unwrap(),
        done: false,
        existing_photo_url_path: None,
        crc32: None,
        conflict: false,
        problem_report_type: None,
        processed: false,
        inbox_url: None,
        ds100: None,
        active: Some(true),
        notified: false,
        posted: false,
    }
}

pub fn problem_report_entry(
    id: i64,
    country: &str,
    station_id: &str,
    photographer_id: i64,
    report_type: ProblemReportType,
) -> InboxEntry {
    InboxEntry {
        extension: None,
        problem_report_type: Some(report_type),
        comment: Some("something is wrong".to_owned()),
        ..photo_upload_entry(id, country, station_id, photographer_id)
    }
}

// ----- inbox -------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryInbox {
    pub entries: Mutex<Vec<InboxEntry>>,
}

impl InMemoryInbox {
    pub fn with_entries(entries: Vec<InboxEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }

    pub fn get(&self, id: i64) -> Option<InboxEntry> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .find(|entry| entry.id == id)
            .cloned()
    }

    fn modify(&self, id: i64, f: impl FnOnce(&mut InboxEntry)) {
        if let Some(entry) = self
            .entries
            .lock()
            .unwrap()
            .iter_mut()
            .find(|entry| entry.id == id)
        {
            f(entry);
        }
    }
}

fn nearby(a: Coordinates, b: Coordinates) -> bool {
    // simple pythagoras, only valid for a few km
    let dx = 71.5 * (a.lon - b.lon);
    let dy = 111.3 * (a.lat - b.lat);
    (dx * dx + dy * dy).sqrt() < 0.5
}

#[async_trait]
impl InboxPort for InMemoryInbox {
    async fn find_by_id(&self, id: i64) -> Result<Option<InboxEntry>> {
        Ok(self.get(id))
    }

    async fn find_pending_inbox_entries(&self) -> Result<Vec<InboxEntry>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| !entry.done)
            .cloned()
            .collect())
    }

    async fn find_oldest_imported_photo_not_yet_posted(&self) -> Result<Option<InboxEntry>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| {
                entry.done
                    && entry.reject_reason.is_none()
                    && entry.extension.is_some()
                    && !entry.posted
            })
            .min_by_key(|entry| entry.created_at)
            .cloned())
    }

    async fn find_public_inbox_entries(&self) -> Result<Vec<PublicInboxEntry>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| !entry.done && entry.problem_report_type.is_none())
            .map(|entry| PublicInboxEntry {
                country_code: entry.country_code.clone(),
                station_id: entry.station_id.clone(),
                title: entry
                    .title
                    .clone()
                    .or_else(|| entry.new_title.clone())
                    .unwrap_or_default(),
                coordinates: entry
                    .coordinates
                    .or(entry.new_coordinates)
                    .unwrap_or_default(),
            })
            .collect())
    }

    async fn insert(&self, entry: &InboxEntry) -> Result<i64> {
        let mut entries = self.entries.lock().unwrap();
        let id = entries.iter().map(|entry| entry.id).max().unwrap_or(0) + 1;
        let mut entry = entry.clone();
        entry.id = id;
        entries.push(entry);
        Ok(id)
    }

    async fn reject(&self, id: i64, reject_reason: &str) -> Result<()> {
        self.modify(id, |entry| {
            entry.done = true;
            entry.reject_reason = Some(reject_reason.to_owned());
        });
        Ok(())
    }

    async fn done(&self, id: i64) -> Result<()> {
        self.modify(id, |entry| entry.done = true);
        Ok(())
    }

    async fn count_pending_inbox_entries(&self) -> Result<i64> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| !entry.done)
            .count() as i64)
    }

    async fn count_pending_inbox_entries_for_station(
        &self,
        exclude_id: Option<i64>,
        country_code: &str,
        station_id: &str,
    ) -> Result<i64> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| {
                !entry.done
                    && Some(entry.id) != exclude_id
                    && entry.country_code.as_deref() == Some(country_code)
                    && entry.station_id.as_deref() == Some(station_id)
            })
            .count() as i64)
    }

    async fn count_pending_inbox_entries_for_nearby_coordinates(
        &self,
        exclude_id: Option<i64>,
        coordinates: Coordinates,
    ) -> Result<i64> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| {
                !entry.done
                    && Some(entry.id) != exclude_id
                    && entry
                        .new_coordinates
                        .is_some_and(|other| nearby(other, coordinates))
            })
            .count() as i64)
    }

    async fn update_crc32(&self, id: i64, crc32: u32) -> Result<()> {
        self.modify(id, |entry| entry.crc32 = Some(crc32));
        Ok(())
    }

    async fn find_inbox_entries_to_notify(&self) -> Result<Vec<InboxEntry>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| entry.done && !entry.notified)
            .cloned()
            .collect())
    }

    async fn update_notified(&self, ids: &[i64]) -> Result<()> {
        for id in ids {
            self.modify(*id, |entry| entry.notified = true);
        }
        Ok(())
    }

    async fn update_posted(&self, id: i64) -> Result<()> {
        self.modify(id, |entry| entry.posted = true);
        Ok(())
    }

    async fn update_photo_id(&self, id: i64, photo_id: i64) -> Result<()> {
        self.modify(id, |entry| entry.photo_id = Some(photo_id));
        Ok(())
    }

    async fn update_missing_station_imported(
        &self,
        id: i64,
        country_code: &str,
        station_id: &str,
        title: &str,
    ) -> Result<()> {
        self.modify(id, |entry| {
            entry.done = true;
            entry.country_code = Some(country_code.to_owned());
            entry.station_id = Some(station_id.to_owned());
            entry.title = Some(title.to_owned());
        });
        Ok(())
    }

    async fn find_by_user(
        &self,
        photographer_id: i64,
        show_completed_entries: bool,
    ) -> Result<Vec<InboxEntry>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| {
                entry.photographer_id == photographer_id
                    && (!entry.done || show_completed_entries)
            })
            .cloned()
            .collect())
    }

    async fn find_pending_by_station(
        &self,
        country_code: &str,
        station_id: &str,
    ) -> Result<Vec<InboxEntry>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| {
                !entry.done
                    && entry.country_code.as_deref() == Some(country_code)
                    && entry.station_id.as_deref() == Some(station_id)
            })
            .cloned()
            .collect())
    }
}

// ----- stations ----------------------------------------------------------

#[derive(Default)]
pub struct InMemoryStations {
    pub stations: Mutex<Vec<Station>>,
}

impl InMemoryStations {
    pub fn with_stations(stations: Vec<Station>) -> Self {
        Self {
            stations: Mutex::new(stations),
        }
    }

    pub fn get(&self, key: &StationKey) -> Option<Station> {
        self.stations
            .lock()
            .unwrap()
            .iter()
            .find(|station| &station.key == key)
            .cloned()
    }
}

#[async_trait]
impl StationPort for InMemoryStations {
    async fn find_by_key(&self, key: &StationKey) -> Result<Option<Station>> {
        Ok(self.get(key))
    }

    async fn find_by_country(&self, country_code: &str) -> Result<Vec<Station>> {
        Ok(self
            .stations
            .lock()
            .unwrap()
            .iter()
            .filter(|station| station.key.country == country_code)
            .cloned()
            .collect())
    }

    async fn find_by_photo_id(&self, photo_id: i64) -> Result<Option<Station>> {
        Ok(self
            .stations
            .lock()
            .unwrap()
            .iter()
            .find(|station| station.photos.iter().any(|photo| photo.id == photo_id))
            .cloned())
    }

    async fn insert(&self, station: &Station) -> Result<()> {
        self.stations.lock().unwrap().push(station.clone());
        Ok(())
    }

    async fn delete(&self, key: &StationKey) -> Result<()> {
        self.stations
            .lock()
            .unwrap()
            .retain(|station| &station.key != key);
        Ok(())
    }

    async fn update_active(&self, key: &StationKey, active: bool) -> Result<()> {
        if let Some(station) = self
            .stations
            .lock()
            .unwrap()
            .iter_mut()
            .find(|station| &station.key == key)
        {
            station.active = active;
        }
        Ok(())
    }

    async fn change_station_title(&self, key: &StationKey, new_title: &str) -> Result<()> {
        if let Some(station) = self
            .stations
            .lock()
            .unwrap()
            .iter_mut()
            .find(|station| &station.key == key)
        {
            station.title = new_title.to_owned();
        }
        Ok(())
    }

    async fn update_location(&self, key: &StationKey, coordinates: Coordinates) -> Result<()> {
        if let Some(station) = self
            .stations
            .lock()
            .unwrap()
            .iter_mut()
            .find(|station| &station.key == key)
        {
            station.coordinates = coordinates;
        }
        Ok(())
    }

    async fn count_nearby_coordinates(&self, coordinates: Coordinates) -> Result<i64> {
        Ok(self
            .stations
            .lock()
            .unwrap()
            .iter()
            .filter(|station| nearby(station.coordinates, coordinates))
            .count() as i64)
    }

    async fn max_z(&self) -> Result<i64> {
        Ok(self
            .stations
            .lock()
            .unwrap()
            .iter()
            .filter_map(|station| station.key.id.strip_prefix('Z'))
            .filter_map(|rest| rest.parse::<i64>().ok())
            .max()
            .unwrap_or(0))
    }

    async fn get_statistic(&self, country_code: Option<&str>) -> Result<Statistic> {
        let stations = self.stations.lock().unwrap();
        let selected: Vec<_> = stations
            .iter()
            .filter(|station| {
                country_code.is_none() || Some(station.key.country.as_str()) == country_code
            })
            .collect();
        let with_photo = selected.iter().filter(|station| station.has_photo()).count() as i64;
        let photographers = selected
            .iter()
            .flat_map(|station| station.photos.iter().map(|photo| photo.photographer.id))
            .collect::<HashSet<_>>()
            .len() as i64;
        Ok(Statistic {
            country_code: country_code.map(str::to_owned),
            total: selected.len() as i64,
            with_photo,
            photographers,
        })
    }
}

// ----- photos ------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryPhotos {
    pub photos: Mutex<Vec<Photo>>,
}

impl InMemoryPhotos {
    pub fn with_photos(photos: Vec<Photo>) -> Self {
        Self {
            photos: Mutex::new(photos),
        }
    }

    pub fn get(&self, id: i64) -> Option<Photo> {
        self.photos
            .lock()
            .unwrap()
            .iter()
            .find(|photo| photo.id == id)
            .cloned()
    }
}

#[async_trait]
impl PhotoPort for InMemoryPhotos {
    async fn insert(&self, photo: &Photo) -> Result<i64> {
        let mut photos = self.photos.lock().unwrap();
        let id = photos.iter().map(|photo| photo.id).max().unwrap_or(0) + 1;
        photos.push(photo.clone().with_id(id));
        Ok(id)
    }

    async fn update(&self, photo: &Photo) -> Result<()> {
        let mut photos = self.photos.lock().unwrap();
        match photos.iter_mut().find(|existing| existing.id == photo.id) {
            Some(existing) => *existing = photo.clone(),
            None => photos.push(photo.clone()),
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        self.photos.lock().unwrap().retain(|photo| photo.id != id);
        Ok(())
    }

    async fn update_photo_outdated(&self, id: i64) -> Result<()> {
        if let Some(photo) = self
            .photos
            .lock()
            .unwrap()
            .iter_mut()
            .find(|photo| photo.id == id)
        {
            photo.outdated = true;
        }
        Ok(())
    }

    async fn set_all_photos_for_station_secondary(&self, key: &StationKey) -> Result<()> {
        for photo in self
            .photos
            .lock()
            .unwrap()
            .iter_mut()
            .filter(|photo| &photo.station_key == key)
        {
            photo.primary = false;
        }
        Ok(())
    }

    async fn set_primary(&self, id: i64) -> Result<()> {
        if let Some(photo) = self
            .photos
            .lock()
            .unwrap()
            .iter_mut()
            .find(|photo| photo.id == id)
        {
            photo.primary = true;
        }
        Ok(())
    }

    async fn count_photos(&self) -> Result<i64> {
        Ok(self.photos.lock().unwrap().len() as i64)
    }

    async fn find_nth_photo_id(&self, n: i64) -> Result<Option<i64>> {
        let mut ids: Vec<i64> = self
            .photos
            .lock()
            .unwrap()
            .iter()
            .map(|photo| photo.id)
            .collect();
        ids.sort_unstable();
        Ok(ids.get(n as usize).copied())
    }
}

// ----- users and countries -----------------------------------------------

#[derive(Default)]
pub struct InMemoryUsers {
    pub users: Mutex<Vec<User>>,
}

impl InMemoryUsers {
    pub fn with_users(users: Vec<User>) -> Self {
        Self {
            users: Mutex::new(users),
        }
    }
}

#[async_trait]
impl UserPort for InMemoryUsers {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|user| user.id == id)
            .cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|user| user.name == name)
            .cloned())
    }

    async fn find_by_token(&self, _token: &str) -> Result<Option<User>> {
        Ok(None)
    }
}

#[derive(Default)]
pub struct InMemoryCountries {
    pub countries: Mutex<Vec<Country>>,
}

impl InMemoryCountries {
    pub fn with_countries(countries: Vec<Country>) -> Self {
        Self {
            countries: Mutex::new(countries),
        }
    }
}

#[async_trait]
impl CountryPort for InMemoryCountries {
    async fn find_by_id(&self, id: &str) -> Result<Option<Country>> {
        Ok(self
            .countries
            .lock()
            .unwrap()
            .iter()
            .find(|country| country.code == id)
            .cloned())
    }

    async fn list(&self, only_active: bool) -> Result<Vec<Country>> {
        Ok(self
            .countries
            .lock()
            .unwrap()
            .iter()
            .filter(|country| !only_active || country.active)
            .cloned()
            .collect())
    }
}

// ----- notification recorders --------------------------------------------

#[derive(Default)]
pub struct RecordingMonitor {
    pub messages: Mutex<Vec<String>>,
}

impl MonitorPort for RecordingMonitor {
    fn send_message(&self, message: String) {
        self.messages.lock().unwrap().push(message);
    }

    fn send_message_with_file(&self, message: String, _file: Option<&Path>) {
        self.messages.lock().unwrap().push(message);
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    pub mails: Mutex<Vec<(String, String, String)>>,
}

impl MailerPort for RecordingMailer {
    fn send(&self, to: &str, subject: &str, text: &str) {
        self.mails
            .lock()
            .unwrap()
            .push((to.to_owned(), subject.to_owned(), text.to_owned()));
    }
}

#[derive(Default)]
pub struct RecordingMastodon {
    pub statuses: Mutex<Vec<String>>,
}

impl MastodonPort for RecordingMastodon {
    fn post_photo(&self, status: String) {
        self.statuses.lock().unwrap().push(status);
    }
}

// ----- photo storage -----------------------------------------------------

#[derive(Default)]
pub struct FakePhotoStorage {
    pub processed: Mutex<HashSet<String>>,
    pub imported: Mutex<Vec<i64>>,
    pub rejected: Mutex<Vec<i64>>,
    pub uploads: Mutex<Vec<String>>,
    pub fail_too_large: bool,
    pub fail_import: bool,
}

#[async_trait]
impl PhotoStoragePort for FakePhotoStorage {
    async fn is_processed(&self, filename: &str) -> bool {
        self.processed.lock().unwrap().contains(filename)
    }

    async fn import_photo(
        &self,
        entry: &InboxEntry,
        station: &Station,
    ) -> std::io::Result<String> {
        if self.fail_import {
            return Err(std::io::Error::other("disk full"));
        }
        self.imported.lock().unwrap().push(entry.id);
        Ok(format!(
            "/{}/{}_1.{}",
            station.key.country,
            station.key.id,
            entry.extension.as_deref().unwrap_or("jpg")
        ))
    }

    async fn reject(&self, entry: &InboxEntry) -> std::io::Result<()> {
        self.rejected.lock().unwrap().push(entry.id);
        Ok(())
    }

    async fn store_upload(
        &self,
        body: &mut (dyn tokio::io::AsyncRead + Send + Unpin),
        filename: &str,
    ) -> std::result::Result<u32, StorageError> {
        if self.fail_too_large {
            return Err(StorageError::PhotoTooLarge {
                max_size: MAX_UPLOAD_SIZE,
            });
        }
        let mut bytes = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(body, &mut bytes)
            .await
            .map_err(StorageError::Io)?;
        self.uploads.lock().unwrap().push(filename.to_owned());
        Ok(crc32fast::hash(&bytes))
    }

    fn get_upload_file(&self, filename: &str) -> PathBuf {
        PathBuf::from("/tmp/fake/inbox").join(filename)
    }

    fn get_photo_file(&self, country_code: &str, filename: &str) -> PathBuf {
        PathBuf::from("/tmp/fake/photos")
            .join(country_code)
            .join(filename)
    }

    fn get_inbox_file(&self, filename: &str) -> PathBuf {
        PathBuf::from("/tmp/fake/inbox").join(filename)
    }

    fn get_inbox_processed_file(&self, filename: &str) -> PathBuf {
        PathBuf::from("/tmp/fake/inbox/processed").join(filename)
    }

    fn get_inbox_to_process_file(&self, filename: &str) -> PathBuf {
        PathBuf::from("/tmp/fake/inbox/toprocess").join(filename)
    }

    fn get_inbox_done_file(&self, filename: &str) -> PathBuf {
        PathBuf::from("/tmp/fake/inbox/done").join(filename)
    }

    fn get_inbox_rejected_file(&self, filename: &str) -> PathBuf {
        PathBuf::from("/tmp/fake/inbox/rejected").join(filename)
    }

    async fn cleanup_old_copies(&self) {}
}

// ----- harness -----------------------------------------------------------

/// Everything an [`InboxService`] test needs, wired with fakes.
pub struct Harness {
    pub stations: Arc<InMemoryStations>,
    pub storage: Arc<FakePhotoStorage>,
    pub monitor: Arc<RecordingMonitor>,
    pub inbox: Arc<InMemoryInbox>,
    pub users: Arc<InMemoryUsers>,
    pub countries: Arc<InMemoryCountries>,
    pub photos: Arc<InMemoryPhotos>,
    pub service: InboxService,
}

impl Harness {
    pub fn new(
        stations: InMemoryStations,
        inbox: InMemoryInbox,
        users: InMemoryUsers,
        countries: InMemoryCountries,
        photos: InMemoryPhotos,
        storage: FakePhotoStorage,
    ) -> Self {
        let stations = Arc::new(stations);
        let storage = Arc::new(storage);
        let monitor = Arc::new(RecordingMonitor::default());
        let inbox = Arc::new(inbox);
        let users = Arc::new(users);
        let countries = Arc::new(countries);
        let photos = Arc::new(photos);
        let service = InboxService::new(
            stations.clone(),
            storage.clone(),
            monitor.clone(),
            inbox.clone(),
            users.clone(),
            countries.clone(),
            photos.clone(),
            "http://inbox.railpix.example".to_owned(),
            "http://photos.railpix.example".to_owned(),
            fixed_clock(),
        );
        Self {
            stations,
            storage,
            monitor,
            inbox,
            users,
            countries,
            photos,
            service,
        }
    }
}
