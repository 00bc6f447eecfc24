//! The inbox moderation workflow: submission validation, conflict
//! detection, admin commands and their side effects.
//!
//! Concurrent admin commands on the same entry are not serialized here;
//! callers are expected to issue at most one command per entry at a time.

use std::sync::Arc;

use anyhow::Context as _;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use thiserror::Error;
use tokio::io::AsyncRead;
use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::images::mime_to_extension;
use crate::models::{
    ConflictResolution, Coordinates, Country, InboxCommand, InboxEntry, InboxResponse,
    InboxResponseState, InboxState, InboxStateQuery, Photo, ProblemReport, PublicInboxEntry,
    Station, StationKey, User,
};
use crate::ports::{
    CountryPort, InboxPort, MonitorPort, PhotoPort, PhotoStoragePort, StationPort, StorageError,
    UserPort,
};

const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'#')
    .add(b'?')
    .add(b'{')
    .add(b'}');

/// Failures of admin commands and user self-service operations.
#[derive(Debug, Error)]
pub enum InboxError {
    /// Precondition violated; surfaced to the admin as plain text.
    #[error("{0}")]
    Validation(String),
    #[error("InboxEntry not found")]
    EntryNotFound,
    #[error("InboxEntry not owned by user")]
    EntryNotOwner,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

fn validation(message: impl Into<String>) -> InboxError {
    InboxError::Validation(message.into())
}

fn require(condition: bool, message: impl Into<String>) -> Result<(), InboxError> {
    if condition {
        Ok(())
    } else {
        Err(validation(message))
    }
}

/// The photo keeps the photographer's license unless the country
/// declares an override.
pub fn get_license_for_photo(photographer: &User, country: &Country) -> crate::models::License {
    country.override_license.unwrap_or(photographer.license)
}

/// Orchestrates the inbox lifecycle against the catalog, storage and
/// notification ports.
pub struct InboxService {
    station_port: Arc<dyn StationPort>,
    photo_storage: Arc<dyn PhotoStoragePort>,
    monitor: Arc<dyn MonitorPort>,
    inbox_port: Arc<dyn InboxPort>,
    user_port: Arc<dyn UserPort>,
    country_port: Arc<dyn CountryPort>,
    photo_port: Arc<dyn PhotoPort>,
    inbox_base_url: String,
    photo_base_url: String,
    clock: Arc<dyn Clock>,
}

impl InboxService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        station_port: Arc<dyn StationPort>,
        photo_storage: Arc<dyn PhotoStoragePort>,
        monitor: Arc<dyn MonitorPort>,
        inbox_port: Arc<dyn InboxPort>,
        user_port: Arc<dyn UserPort>,
        country_port: Arc<dyn CountryPort>,
        photo_port: Arc<dyn PhotoPort>,
        inbox_base_url: String,
        photo_base_url: String,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            station_port,
            photo_storage,
            monitor,
            inbox_port,
            user_port,
            country_port,
            photo_port,
            inbox_base_url,
            photo_base_url,
            clock,
        }
    }

    // ----- submissions ---------------------------------------------------

    /// Accept a photo upload. Validation failures and conflicts are
    /// encoded in the response state, never raised.
    #[allow(clippy::too_many_arguments)]
    pub async fn upload_photo(
        &self,
        client_info: Option<&str>,
        body: &mut (dyn AsyncRead + Send + Unpin),
        station_id: Option<&str>,
        country_code: Option<&str>,
        content_type: Option<&str>,
        station_title: Option<&str>,
        latitude: Option<f64>,
        longitude: Option<f64>,
        comment: Option<&str>,
        active: bool,
        user: &User,
    ) -> InboxResponse {
        if !user.is_eligible_to_upload_photo() {
            info!("photo upload failed for user {}, profile incomplete", user.name);
            return InboxResponse::of(
                InboxResponseState::Unauthorized,
                "Profile incomplete, not allowed to upload photos",
            );
        }

        match self
            .upload_photo_checked(
                client_info,
                body,
                station_id,
                country_code,
                content_type,
                station_title,
                latitude,
                longitude,
                comment,
                active,
                user,
            )
            .await
        {
            Ok(response) => response,
            Err(err) => {
                error!("error uploading photo: {err:#}");
                InboxResponse::of(InboxResponseState::Error, "Internal Error")
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn upload_photo_checked(
        &self,
        client_info: Option<&str>,
        body: &mut (dyn AsyncRead + Send + Unpin),
        station_id: Option<&str>,
        country_code: Option<&str>,
        content_type: Option<&str>,
        station_title: Option<&str>,
        latitude: Option<f64>,
        longitude: Option<f64>,
        comment: Option<&str>,
        active: bool,
        user: &User,
    ) -> anyhow::Result<InboxResponse> {
        let station = self.find_station(country_code, station_id).await?;

        let coordinates = if station.is_none() {
            warn!("station not found");
            let title_blank = station_title.map(str::trim).unwrap_or_default().is_empty();
            let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
                return Ok(not_enough_upload_data(station_title, latitude, longitude));
            };
            if title_blank {
                return Ok(not_enough_upload_data(
                    station_title,
                    Some(latitude),
                    Some(longitude),
                ));
            }
            let coordinates = Coordinates::new(latitude, longitude);
            if !coordinates.is_valid() {
                warn!("lat/lon out of range: latitude={latitude}, longitude={longitude}");
                return Ok(InboxResponse::of(
                    InboxResponseState::LatLonOutOfRange,
                    "'latitude' and/or 'longitude' out of range",
                ));
            }
            Some(coordinates)
        } else {
            None
        };

        let extension = mime_to_extension(content_type);
        if station.is_some() && extension.is_none() {
            warn!("unknown content type {content_type:?}");
            return Ok(InboxResponse::of(
                InboxResponseState::UnsupportedContentType,
                "unsupported content type (only jpg and png are supported)",
            ));
        }

        let conflict = self
            .has_conflict_with_station(None, station.as_ref())
            .await?
            || self.has_conflict_with_coordinates(None, coordinates).await?;

        let entry = InboxEntry {
            id: 0,
            country_code: station
                .as_ref()
                .map(|s| s.key.country.clone())
                .or_else(|| country_code.map(str::to_owned)),
            station_id: station.as_ref().map(|s| s.key.id.clone()),
            photo_id: None,
            title: None,
            new_title: station_title.map(str::to_owned),
            coordinates: None,
            new_coordinates: coordinates,
            photographer_id: user.id,
            photographer_nickname: None,
            photographer_email: None,
            extension: extension.map(str::to_owned),
            comment: comment.map(str::to_owned),
            reject_reason: None,
            created_at: self.clock.now(),
            done: false,
            existing_photo_url_path: None,
            crc32: None,
            conflict: false,
            problem_report_type: None,
            processed: false,
            inbox_url: None,
            ds100: None,
            active: Some(active),
            notified: false,
            posted: false,
        };
        let id = self.inbox_port.insert(&entry).await?;

        let mut filename = None;
        let mut inbox_url = None;
        let mut crc32 = None;
        if let Some(extension) = extension {
            let name = crate::models::create_inbox_filename(id, extension);
            match self.photo_storage.store_upload(body, &name).await {
                Ok(checksum) => {
                    self.inbox_port.update_crc32(id, checksum).await?;
                    crc32 = Some(checksum);
                }
                Err(StorageError::PhotoTooLarge { max_size }) => {
                    return Ok(InboxResponse {
                        id: Some(id),
                        state: InboxResponseState::PhotoTooLarge,
                        message: Some(format!("Photo too large, max {max_size} bytes allowed")),
                        filename: None,
                        inbox_url: None,
                        crc32: None,
                    });
                }
                Err(StorageError::Io(err)) => {
                    error!("error uploading photo: {err}");
                    return Ok(InboxResponse::of(InboxResponseState::Error, "Internal Error"));
                }
            }
            inbox_url = Some(format!(
                "{}/{}",
                self.inbox_base_url,
                utf8_percent_encode(&name, PATH_SEGMENT)
            ));
            filename = Some(name);
        }

        let duplicate_info = if conflict { " (possible duplicate!)" } else { "" };
        let comment_text = comment.map(str::trim).unwrap_or_default();
        let via = client_info.unwrap_or("unknown");
        if let Some(station) = &station {
            self.monitor.send_message_with_file(
                format!(
                    "New photo upload for {} - {}{duplicate_info}\n{comment_text}\n{}\nby {}\nvia {via}",
                    station.title,
                    station.key,
                    inbox_url.as_deref().unwrap_or_default(),
                    user.name,
                ),
                filename
                    .as_deref()
                    .map(|name| self.photo_storage.get_upload_file(name))
                    .as_deref(),
            );
        } else if let Some(filename) = &filename {
            self.monitor.send_message_with_file(
                format!(
                    "Photo upload for missing station {}{duplicate_info} at {},{}\n{comment_text}\n{}\nby {}\nvia {via}",
                    station_title.unwrap_or_default(),
                    latitude.unwrap_or_default(),
                    longitude.unwrap_or_default(),
                    inbox_url.as_deref().unwrap_or_default(),
                    user.name,
                ),
                Some(self.photo_storage.get_upload_file(filename)).as_deref(),
            );
        } else {
            self.monitor.send_message(format!(
                "Report missing station {}{duplicate_info} at {},{}\n{comment_text}\nby {}\nvia {via}",
                station_title.unwrap_or_default(),
                latitude.unwrap_or_default(),
                longitude.unwrap_or_default(),
                user.name,
            ));
        }

        Ok(InboxResponse {
            id: Some(id),
            state: if conflict {
                InboxResponseState::Conflict
            } else {
                InboxResponseState::Review
            },
            message: None,
            filename,
            inbox_url,
            crc32,
        })
    }

    /// Accept a problem report about an existing station or photo.
    pub async fn report_problem(
        &self,
        problem_report: &ProblemReport,
        user: &User,
        client_info: Option<&str>,
    ) -> InboxResponse {
        if !user.is_eligible_to_report_problem() {
            info!(
                "new problem report failed for user {}, profile incomplete",
                user.name
            );
            return InboxResponse::of(InboxResponseState::Unauthorized, "Profile incomplete");
        }

        match self
            .report_problem_checked(problem_report, user, client_info)
            .await
        {
            Ok(response) => response,
            Err(err) => {
                error!("error accepting problem report: {err:#}");
                InboxResponse::of(InboxResponseState::Error, "Internal Error")
            }
        }
    }

    async fn report_problem_checked(
        &self,
        problem_report: &ProblemReport,
        user: &User,
        client_info: Option<&str>,
    ) -> anyhow::Result<InboxResponse> {
        info!(
            "new problem report: nickname: {}; country: {}; station-id: {}",
            user.name, problem_report.country_code, problem_report.station_id
        );

        let Some(station) = self
            .find_station(
                Some(&problem_report.country_code),
                Some(&problem_report.station_id),
            )
            .await?
        else {
            return Ok(InboxResponse::of(
                InboxResponseState::NotEnoughData,
                "Station not found",
            ));
        };

        let comment = problem_report.comment.as_deref().map(str::trim).unwrap_or_default();
        if comment.is_empty() {
            return Ok(InboxResponse::of(
                InboxResponseState::NotEnoughData,
                "Comment is mandatory",
            ));
        }

        let mut photo_id = problem_report.photo_id;
        if problem_report.report_type.needs_photo() {
            if !station.has_photo() {
                return Ok(InboxResponse::of(
                    InboxResponseState::NotEnoughData,
                    "Problem type is only applicable to station with photo",
                ));
            }
            match photo_id {
                Some(id) => {
                    if !station.photos.iter().any(|photo| photo.id == id) {
                        return Ok(InboxResponse::of(
                            InboxResponseState::NotEnoughData,
                            "Photo with this id not found at station",
                        ));
                    }
                }
                None => photo_id = station.primary_photo().map(|photo| photo.id),
            }
        }

        let entry = InboxEntry {
            id: 0,
            country_code: Some(problem_report.country_code.clone()),
            station_id: Some(problem_report.station_id.clone()),
            photo_id,
            title: None,
            new_title: problem_report.title.clone(),
            coordinates: None,
            new_coordinates: problem_report.coordinates,
            photographer_id: user.id,
            photographer_nickname: None,
            photographer_email: None,
            extension: None,
            comment: problem_report.comment.clone(),
            reject_reason: None,
            created_at: self.clock.now(),
            done: false,
            existing_photo_url_path: None,
            crc32: None,
            conflict: false,
            problem_report_type: Some(problem_report.report_type),
            processed: false,
            inbox_url: None,
            ds100: None,
            active: None,
            notified: false,
            posted: false,
        };
        self.monitor.send_message(format!(
            "New problem report for {} - {}\n{}: {comment}\nby {}\nvia {}",
            station.title,
            station.key,
            problem_report.report_type.name(),
            user.name,
            client_info.unwrap_or("unknown"),
        ));
        let id = self.inbox_port.insert(&entry).await?;
        Ok(InboxResponse::review(id))
    }

    // ----- queries -------------------------------------------------------

    pub async fn public_inbox(&self) -> anyhow::Result<Vec<PublicInboxEntry>> {
        self.inbox_port.find_public_inbox_entries().await
    }

    pub async fn user_inbox(
        &self,
        user: &User,
        show_completed_entries: bool,
    ) -> anyhow::Result<Vec<InboxStateQuery>> {
        let entries = self
            .inbox_port
            .find_by_user(user.id, show_completed_entries)
            .await?;
        let mut queries = Vec::with_capacity(entries.len());
        for entry in entries {
            queries.push(self.map_to_inbox_state_query(entry).await);
        }
        Ok(queries)
    }

    pub async fn user_inbox_by_ids(
        &self,
        user: &User,
        ids: &[i64],
    ) -> anyhow::Result<Vec<InboxStateQuery>> {
        let mut queries = Vec::new();
        for id in ids {
            let Some(entry) = self.inbox_port.find_by_id(*id).await? else {
                continue;
            };
            if entry.photographer_id != user.id {
                continue;
            }
            queries.push(self.map_to_inbox_state_query(entry).await);
        }
        Ok(queries)
    }

    async fn map_to_inbox_state_query(&self, entry: InboxEntry) -> InboxStateQuery {
        let filename = entry.filename();
        let processed = !entry.done
            && match &filename {
                Some(name) => self.photo_storage.is_processed(name).await,
                None => true,
            };
        let state = if entry.done {
            if entry.reject_reason.is_none() {
                InboxState::Accepted
            } else {
                InboxState::Rejected
            }
        } else {
            InboxState::Review
        };
        InboxStateQuery {
            id: entry.id,
            country_code: entry.country_code.clone(),
            station_id: entry.station_id.clone(),
            title: entry.title.clone(),
            coordinates: entry.coordinates,
            new_title: entry.new_title.clone(),
            new_coordinates: entry.new_coordinates,
            state,
            comment: entry.comment.clone(),
            problem_report_type: entry.problem_report_type,
            rejected_reason: entry.reject_reason.clone(),
            inbox_url: filename.as_deref().map(|name| {
                self.get_inbox_url(name, entry.done, entry.reject_reason.as_deref(), processed)
            }),
            filename,
            crc32: entry.crc32,
            created_at: entry.created_at,
        }
    }

    /// Pending entries enriched with processed/conflict state for review.
    pub async fn list_admin_inbox(&self) -> anyhow::Result<Vec<InboxEntry>> {
        let pending = self.inbox_port.find_pending_inbox_entries().await?;
        let mut enriched = Vec::with_capacity(pending.len());
        for entry in &pending {
            enriched.push(self.enrich_inbox_entry(entry.clone(), &pending).await?);
        }
        Ok(enriched)
    }

    async fn enrich_inbox_entry(
        &self,
        entry: InboxEntry,
        pending: &[InboxEntry],
    ) -> anyhow::Result<InboxEntry> {
        let filename = entry.filename();
        let processed = match &filename {
            Some(name) => self.photo_storage.is_processed(name).await,
            None => false,
        };
        let inbox_url = if let Some(name) = &filename {
            Some(self.get_inbox_url(name, entry.done, entry.reject_reason.as_deref(), processed))
        } else {
            entry
                .existing_photo_url_path
                .as_deref()
                .map(|path| format!("{}{path}", self.photo_base_url))
        };
        let conflict = match (&entry.station_id, entry.new_coordinates) {
            (None, Some(coordinates)) if !coordinates.has_zero_coords() => {
                self.has_conflict_with_coordinates(Some(entry.id), Some(coordinates))
                    .await?
            }
            _ => pending.iter().any(|other| {
                other.id != entry.id
                    && other.country_code == entry.country_code
                    && other.station_id == entry.station_id
            }),
        };
        Ok(entry.with_enrichment(processed, inbox_url, conflict))
    }

    fn get_inbox_url(
        &self,
        filename: &str,
        done: bool,
        reject_reason: Option<&str>,
        processed: bool,
    ) -> String {
        let base = &self.inbox_base_url;
        if done {
            if reject_reason.is_some() {
                format!("{base}/rejected/{filename}")
            } else {
                format!("{base}/done/{filename}")
            }
        } else if processed {
            format!("{base}/processed/{filename}")
        } else {
            format!("{base}/{filename}")
        }
    }

    pub async fn count_pending_inbox_entries(&self) -> anyhow::Result<i64> {
        self.inbox_port.count_pending_inbox_entries().await
    }

    // ----- admin commands ------------------------------------------------

    pub async fn import_photo(&self, command: &InboxCommand) -> Result<(), InboxError> {
        let entry = self.assert_pending_inbox_entry_exists(command.id).await?;
        info!("importing photo {}, {:?}", entry.id, entry.filename());

        require(entry.is_photo_upload(), "No photo to import")?;

        let station = self
            .find_station(entry.country_code.as_deref(), entry.station_id.as_deref())
            .await?
            .ok_or_else(|| validation("Station not found"))?;

        self.import_photo_for_station(command, &entry, &station)
            .await?;
        self.inbox_port.done(entry.id).await?;
        Ok(())
    }

    pub async fn import_missing_station(&self, command: &InboxCommand) -> Result<(), InboxError> {
        let entry = self.assert_pending_inbox_entry_exists(command.id).await?;
        info!(
            "importing photo of missing station {}, {:?}",
            entry.id,
            entry.filename()
        );

        require(!entry.is_problem_report(), "Can't import a problem report")?;

        let station = self.find_or_create_station(command).await?;

        if entry.is_photo_upload() {
            self.import_photo_for_station(command, &entry, &station)
                .await?;
        } else {
            info!("no photo to import for inbox entry {}", entry.id);
        }
        self.inbox_port
            .update_missing_station_imported(
                entry.id,
                &station.key.country,
                &station.key.id,
                &station.title,
            )
            .await?;
        Ok(())
    }

    async fn import_photo_for_station(
        &self,
        command: &InboxCommand,
        entry: &InboxEntry,
        station: &Station,
    ) -> Result<(), InboxError> {
        if self
            .has_conflict_with_station(Some(entry.id), Some(station))
            .await?
        {
            let resolution = command
                .conflict_resolution
                .unwrap_or(ConflictResolution::DoNothing);
            require(
                resolution.solves_photo_conflict(),
                "There is a conflict with another photo",
            )?;
            require(
                station.has_photo()
                    || resolution == ConflictResolution::ImportAsNewPrimaryPhoto,
                "Conflict with another upload! The only possible ConflictResolution strategy is IMPORT_AS_NEW_PRIMARY_PHOTO.",
            )?;
        }

        let photographer = self
            .user_port
            .find_by_id(entry.photographer_id)
            .await?
            .ok_or_else(|| validation(format!("Photographer {} not found", entry.photographer_id)))?;
        let country = self
            .country_port
            .find_by_id(&station.key.country.to_lowercase())
            .await?
            .ok_or_else(|| validation(format!("Country {} not found", station.key.country)))?;

        // A failed file operation aborts the command before any catalog
        // mutation happens.
        let url_path = self
            .photo_storage
            .import_photo(entry, station)
            .await
            .context("error moving file")?;

        let photo = Photo {
            id: 0,
            station_key: station.key.clone(),
            primary: false,
            url_path,
            photographer: photographer.clone(),
            created_at: self.clock.now(),
            license: get_license_for_photo(&photographer, &country),
            outdated: false,
        };
        let photo_id = if station.has_photo() {
            match command.conflict_resolution {
                Some(ConflictResolution::ImportAsNewPrimaryPhoto) => {
                    self.photo_port
                        .set_all_photos_for_station_secondary(&station.key)
                        .await?;
                    self.photo_port.insert(&photo.with_primary(true)).await?
                }
                Some(ConflictResolution::ImportAsNewSecondaryPhoto) => {
                    self.photo_port.insert(&photo).await?
                }
                Some(ConflictResolution::OverwriteExistingPhoto) => {
                    let primary = station
                        .primary_photo()
                        .ok_or_else(|| validation("Station has no primary photo to overwrite"))?;
                    self.photo_port
                        .update(&photo.with_id(primary.id).with_primary(true))
                        .await?;
                    primary.id
                }
                _ => return Err(validation("No suitable conflict resolution provided")),
            }
        } else {
            self.photo_port.insert(&photo.with_primary(true)).await?
        };

        self.inbox_port.update_photo_id(entry.id, photo_id).await?;
        info!(
            "upload {} with photo id {photo_id} accepted: {:?}",
            entry.id,
            entry.filename()
        );
        Ok(())
    }

    async fn find_or_create_station(&self, command: &InboxCommand) -> Result<Station, InboxError> {
        let (Some(country_code), Some(station_id)) =
            (command.country_code.as_deref(), command.station_id.as_deref())
        else {
            return Err(validation("CountryCode and StationId required"));
        };

        if let Some(station) = self.find_station(Some(country_code), Some(station_id)).await? {
            return Ok(station);
        }

        let country = self
            .country_port
            .find_by_id(&country_code.to_lowercase())
            .await?
            .ok_or_else(|| validation("Country not found"))?;
        require(
            station_id.starts_with('Z'),
            "Station ID can't be empty and must start with Z",
        )?;
        let coordinates = command.coordinates.filter(|c| c.is_valid());
        let coordinates =
            coordinates.ok_or_else(|| validation("No valid coordinates provided"))?;
        let station_conflict = self
            .has_conflict_with_coordinates(Some(command.id), Some(coordinates))
            .await?;
        require(
            !station_conflict
                || command
                    .conflict_resolution
                    .map(|resolution| resolution.solves_station_conflict())
                    .unwrap_or(false),
            "There is a conflict with a nearby station",
        )?;
        let title = command
            .title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .ok_or_else(|| validation("Station title can't be empty"))?;
        let active = command
            .active
            .ok_or_else(|| validation("No Active flag provided"))?;

        let new_station = Station {
            key: StationKey::new(
                country.code.clone(),
                format!("Z{}", self.station_port.max_z().await? + 1),
            ),
            title: title.to_owned(),
            coordinates,
            ds100: command.ds100.clone(),
            photos: vec![],
            active,
        };
        self.station_port.insert(&new_station).await?;
        info!("new station '{}' created: {}", new_station.title, new_station.key);
        Ok(new_station)
    }

    pub async fn reject_inbox_entry(&self, command: &InboxCommand) -> Result<(), InboxError> {
        let entry = self.assert_pending_inbox_entry_exists(command.id).await?;
        let reject_reason = command
            .reject_reason
            .as_deref()
            .map(str::trim)
            .filter(|reason| !reason.is_empty())
            .ok_or_else(|| validation("No reject reason given"))?;
        self.inbox_port.reject(entry.id, reject_reason).await?;

        if entry.is_problem_report() {
            info!("rejecting problem report {}, {reject_reason}", entry.id);
            return Ok(());
        }

        info!(
            "rejecting upload {}, {reject_reason}, {:?}",
            entry.id,
            entry.filename()
        );
        if let Err(err) = self.photo_storage.reject(&entry).await {
            warn!("unable to move rejected file {:?}: {err}", entry.filename());
        }
        Ok(())
    }

    pub async fn change_station_title(&self, command: &InboxCommand) -> Result<(), InboxError> {
        let entry = self.assert_pending_inbox_entry_exists(command.id).await?;
        let title = command
            .title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .ok_or_else(|| validation(format!("Empty new title: {:?}", command.title)))?;
        let station = self.assert_station_exists(&entry).await?;
        self.station_port
            .change_station_title(&station.key, title)
            .await?;
        self.inbox_port.done(entry.id).await?;
        info!(
            "problem report {} station {} changed name to {title}",
            entry.id, station.key
        );
        Ok(())
    }

    pub async fn update_location(&self, command: &InboxCommand) -> Result<(), InboxError> {
        let entry = self.assert_pending_inbox_entry_exists(command.id).await?;
        let coordinates = command
            .coordinates
            .filter(|coordinates| coordinates.is_valid())
            .ok_or_else(|| {
                validation(format!(
                    "Can't update location, coordinates: {:?}",
                    command.coordinates
                ))
            })?;
        let station = self.assert_station_exists(&entry).await?;
        self.station_port
            .update_location(&station.key, coordinates)
            .await?;
        self.inbox_port.done(entry.id).await?;
        Ok(())
    }

    pub async fn update_station_active_state(
        &self,
        command: &InboxCommand,
        active: bool,
    ) -> Result<(), InboxError> {
        let entry = self.assert_pending_inbox_entry_exists(command.id).await?;
        let station = self.assert_station_exists(&entry).await?;
        self.station_port.update_active(&station.key, active).await?;
        self.inbox_port.done(entry.id).await?;
        info!(
            "problem report {} station {} set active to {active}",
            entry.id, station.key
        );
        Ok(())
    }

    pub async fn delete_station(&self, command: &InboxCommand) -> Result<(), InboxError> {
        let entry = self.assert_pending_inbox_entry_exists(command.id).await?;
        let station = self.assert_station_exists(&entry).await?;
        self.station_port.delete(&station.key).await?;
        self.inbox_port.done(entry.id).await?;
        // Every other pending submission for the station is now moot.
        let pending = self
            .inbox_port
            .find_pending_by_station(&station.key.country, &station.key.id)
            .await?;
        for other in pending {
            self.reject_inbox_entry(&InboxCommand {
                id: other.id,
                country_code: Some(station.key.country.clone()),
                station_id: Some(station.key.id.clone()),
                reject_reason: Some("Station has been deleted".to_owned()),
                ..InboxCommand::default()
            })
            .await?;
        }
        info!("problem report {} station {} deleted", entry.id, station.key);
        Ok(())
    }

    pub async fn delete_photo(&self, command: &InboxCommand) -> Result<(), InboxError> {
        let entry = self.assert_pending_inbox_entry_exists(command.id).await?;
        let station = self.assert_station_exists_and_has_photo(&entry).await?;
        let photo_id_to_delete = get_photo_id_from_inbox_or_primary_photo(&entry, &station)?;
        self.photo_port.delete(photo_id_to_delete).await?;
        if station
            .primary_photo()
            .is_some_and(|primary| primary.id == photo_id_to_delete)
        {
            if let Some(next) = station
                .photos
                .iter()
                .find(|photo| photo.id != photo_id_to_delete)
            {
                self.photo_port.set_primary(next.id).await?;
            }
        }
        self.inbox_port.done(entry.id).await?;
        info!(
            "problem report {} photo of station {} deleted",
            entry.id, station.key
        );
        Ok(())
    }

    pub async fn mark_photo_outdated(&self, command: &InboxCommand) -> Result<(), InboxError> {
        let entry = self.assert_pending_inbox_entry_exists(command.id).await?;
        let station = self.assert_station_exists_and_has_photo(&entry).await?;
        let photo_id = get_photo_id_from_inbox_or_primary_photo(&entry, &station)?;
        self.photo_port.update_photo_outdated(photo_id).await?;
        self.inbox_port.done(entry.id).await?;
        Ok(())
    }

    pub async fn mark_problem_report_solved(
        &self,
        command: &InboxCommand,
    ) -> Result<(), InboxError> {
        let entry = self.assert_pending_inbox_entry_exists(command.id).await?;
        self.inbox_port.done(entry.id).await?;
        info!("problem report {} resolved", entry.id);
        Ok(())
    }

    /// User-initiated withdrawal of their own pending entry.
    pub async fn delete_user_inbox_entry(&self, user: &User, id: i64) -> Result<(), InboxError> {
        let entry = self
            .inbox_port
            .find_by_id(id)
            .await?
            .ok_or(InboxError::EntryNotFound)?;
        require(!entry.done, "InboxEntry is already done")?;
        if entry.photographer_id != user.id {
            return Err(InboxError::EntryNotOwner);
        }
        self.inbox_port.reject(id, "Withdrawn by user").await?;
        self.monitor.send_message(format!(
            "InboxEntry {id} {} has been withdrawn by {}",
            entry.title.as_deref().unwrap_or_default(),
            user.name
        ));
        Ok(())
    }

    // ----- helpers -------------------------------------------------------

    async fn assert_pending_inbox_entry_exists(&self, id: i64) -> Result<InboxEntry, InboxError> {
        let entry = self.inbox_port.find_by_id(id).await?;
        match entry {
            Some(entry) if !entry.done => Ok(entry),
            _ => Err(validation("No pending inbox entry found")),
        }
    }

    async fn assert_station_exists(&self, entry: &InboxEntry) -> Result<Station, InboxError> {
        self.find_station(entry.country_code.as_deref(), entry.station_id.as_deref())
            .await?
            .ok_or_else(|| validation("Station not found"))
    }

    async fn assert_station_exists_and_has_photo(
        &self,
        entry: &InboxEntry,
    ) -> Result<Station, InboxError> {
        let station = self.assert_station_exists(entry).await?;
        require(station.has_photo(), "Station has no photo")?;
        Ok(station)
    }

    async fn find_station(
        &self,
        country_code: Option<&str>,
        station_id: Option<&str>,
    ) -> anyhow::Result<Option<Station>> {
        let (Some(country_code), Some(station_id)) = (country_code, station_id) else {
            return Ok(None);
        };
        self.station_port
            .find_by_key(&StationKey::new(country_code, station_id))
            .await
    }

    async fn has_conflict_with_station(
        &self,
        exclude_id: Option<i64>,
        station: Option<&Station>,
    ) -> anyhow::Result<bool> {
        let Some(station) = station else {
            return Ok(false);
        };
        if station.has_photo() {
            return Ok(true);
        }
        Ok(self
            .inbox_port
            .count_pending_inbox_entries_for_station(
                exclude_id,
                &station.key.country,
                &station.key.id,
            )
            .await?
            > 0)
    }

    async fn has_conflict_with_coordinates(
        &self,
        exclude_id: Option<i64>,
        coordinates: Option<Coordinates>,
    ) -> anyhow::Result<bool> {
        let Some(coordinates) = coordinates else {
            return Ok(false);
        };
        if coordinates.has_zero_coords() {
            return Ok(false);
        }
        Ok(self
            .inbox_port
            .count_pending_inbox_entries_for_nearby_coordinates(exclude_id, coordinates)
            .await?
            > 0
            || self
                .station_port
                .count_nearby_coordinates(coordinates)
                .await?
                > 0)
    }
}

fn get_photo_id_from_inbox_or_primary_photo(
    entry: &InboxEntry,
    station: &Station,
) -> Result<i64, InboxError> {
    entry
        .photo_id
        .or_else(|| station.primary_photo().map(|photo| photo.id))
        .ok_or_else(|| validation("Station has no primary photo"))
}

fn not_enough_upload_data(
    station_title: Option<&str>,
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> InboxResponse {
    warn!(
        "not enough data for missing station: title={station_title:?}, latitude={latitude:?}, longitude={longitude:?}"
    );
    InboxResponse::of(
        InboxResponseState::NotEnoughData,
        "Not enough data: either 'countryCode' and 'stationId' or 'title', 'latitude' and 'longitude' have to be provided",
    )
}
