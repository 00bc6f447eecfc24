//! Request handlers. Thin mappings between HTTP shapes and the services.

use axum::body::Body;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header::CONTENT_TYPE, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::TryStreamExt as _;
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use tokio_util::io::StreamReader;

use super::auth::{AdminUser, AuthUser};
use super::{status_for, AppState};
use crate::error::Error;
use crate::models::{
    ConflictResolution, Coordinates, InboxCommand, InboxResponse, ProblemReport, Station,
};

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

fn header_decoded(headers: &HeaderMap, name: &str) -> Option<String> {
    header_string(headers, name)
        .map(|value| percent_decode_str(&value).decode_utf8_lossy().into_owned())
}

fn header_f64(headers: &HeaderMap, name: &str) -> Option<f64> {
    header_string(headers, name).and_then(|value| value.parse().ok())
}

fn submission_response(response: InboxResponse) -> Response {
    (status_for(response.state), Json(response)).into_response()
}

/// Raw-body photo upload; metadata travels in headers.
pub async fn photo_upload(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let station_id = header_string(&headers, "Station-Id");
    let country = header_string(&headers, "Country");
    let content_type = header_string(&headers, CONTENT_TYPE.as_str());
    let station_title = header_decoded(&headers, "Station-Title");
    let latitude = header_f64(&headers, "Latitude");
    let longitude = header_f64(&headers, "Longitude");
    let comment = header_decoded(&headers, "Comment");
    let active = header_string(&headers, "Active")
        .map(|value| value != "false")
        .unwrap_or(true);
    let client_info = header_string(&headers, "User-Agent");

    let stream = body.into_data_stream().map_err(std::io::Error::other);
    let mut reader = StreamReader::new(stream);

    let response = state
        .inbox_service
        .upload_photo(
            client_info.as_deref(),
            &mut reader,
            station_id.as_deref(),
            country.as_deref(),
            content_type.as_deref(),
            station_title.as_deref(),
            latitude,
            longitude,
            comment.as_deref(),
            active,
            &user,
        )
        .await;
    submission_response(response)
}

/// Multipart photo upload; the file travels as the `file` part, the
/// metadata as form fields.
pub async fn photo_upload_multipart(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Response, Error> {
    let client_info = header_string(&headers, "User-Agent");
    let mut station_id = None;
    let mut country = None;
    let mut station_title = None;
    let mut latitude = None;
    let mut longitude = None;
    let mut comment = None;
    let mut active = true;
    let mut file: Option<(Vec<u8>, Option<String>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| Error::with_status(StatusCode::BAD_REQUEST, err))?
    {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "file" => {
                let content_type = field.content_type().map(str::to_owned);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| Error::with_status(StatusCode::BAD_REQUEST, err))?;
                file = Some((bytes.to_vec(), content_type));
            }
            other => {
                let value = field
                    .text()
                    .await
                    .map_err(|err| Error::with_status(StatusCode::BAD_REQUEST, err))?;
                match other {
                    "stationId" => station_id = Some(value),
                    "countryCode" => country = Some(value),
                    "stationTitle" => station_title = Some(value),
                    "latitude" => latitude = value.parse().ok(),
                    "longitude" => longitude = value.parse().ok(),
                    "comment" => comment = Some(value),
                    "active" => active = value != "false",
                    _ => {}
                }
            }
        }
    }

    let (bytes, content_type) = file.unwrap_or_default();
    let mut reader: &[u8] = &bytes;
    let response = state
        .inbox_service
        .upload_photo(
            client_info.as_deref(),
            &mut reader,
            station_id.as_deref(),
            country.as_deref(),
            content_type.as_deref(),
            station_title.as_deref(),
            latitude,
            longitude,
            comment.as_deref(),
            active,
            &user,
        )
        .await;
    Ok(submission_response(response))
}

pub async fn report_problem(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    headers: HeaderMap,
    Json(problem_report): Json<ProblemReport>,
) -> Response {
    let client_info = header_string(&headers, "User-Agent");
    let response = state
        .inbox_service
        .report_problem(&problem_report, &user, client_info.as_deref())
        .await;
    submission_response(response)
}

pub async fn public_inbox(State(state): State<AppState>) -> Result<Response, Error> {
    let entries = state.inbox_service.public_inbox().await?;
    Ok(Json(entries).into_response())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInboxQuery {
    #[serde(default)]
    show_completed_entries: bool,
}

pub async fn user_inbox(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<UserInboxQuery>,
) -> Result<Response, Error> {
    let entries = state
        .inbox_service
        .user_inbox(&user, query.show_completed_entries)
        .await?;
    Ok(Json(entries).into_response())
}

pub async fn user_inbox_by_ids(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(ids): Json<Vec<i64>>,
) -> Result<Response, Error> {
    let entries = state.inbox_service.user_inbox_by_ids(&user, &ids).await?;
    Ok(Json(entries).into_response())
}

pub async fn delete_user_inbox_entry(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, Error> {
    state.inbox_service.delete_user_inbox_entry(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn admin_inbox(
    State(state): State<AppState>,
    AdminUser(_user): AdminUser,
) -> Result<Response, Error> {
    let entries = state.inbox_service.list_admin_inbox().await?;
    Ok(Json(entries).into_response())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxCountResponse {
    pending_inbox_entries: i64,
}

pub async fn admin_inbox_count(
    State(state): State<AppState>,
    AdminUser(_user): AdminUser,
) -> Result<Response, Error> {
    let pending = state.inbox_service.count_pending_inbox_entries().await?;
    Ok(Json(InboxCountResponse {
        pending_inbox_entries: pending,
    })
    .into_response())
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdminCommandKind {
    ImportPhoto,
    ImportMissingStation,
    ActivateStation,
    DeactivateStation,
    DeleteStation,
    DeletePhoto,
    MarkSolved,
    Reject,
    ChangeName,
    UpdateLocation,
    PhotoOutdated,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminCommandRequest {
    pub command: AdminCommandKind,
    pub id: i64,
    pub country_code: Option<String>,
    pub station_id: Option<String>,
    pub title: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub reject_reason: Option<String>,
    pub ds100: Option<String>,
    pub active: Option<bool>,
    pub conflict_resolution: Option<ConflictResolution>,
}

impl AdminCommandRequest {
    fn to_command(&self) -> InboxCommand {
        InboxCommand {
            id: self.id,
            country_code: self.country_code.clone(),
            station_id: self.station_id.clone(),
            title: self.title.clone(),
            coordinates: match (self.lat, self.lon) {
                (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
                _ => None,
            },
            reject_reason: self.reject_reason.clone(),
            ds100: self.ds100.clone(),
            active: self.active,
            conflict_resolution: self.conflict_resolution,
        }
    }
}

pub async fn admin_command(
    State(state): State<AppState>,
    AdminUser(_user): AdminUser,
    Json(request): Json<AdminCommandRequest>,
) -> Result<StatusCode, Error> {
    let command = request.to_command();
    let service = &state.inbox_service;
    match request.command {
        AdminCommandKind::ImportPhoto => service.import_photo(&command).await?,
        AdminCommandKind::ImportMissingStation => service.import_missing_station(&command).await?,
        AdminCommandKind::ActivateStation => {
            service.update_station_active_state(&command, true).await?
        }
        AdminCommandKind::DeactivateStation => {
            service.update_station_active_state(&command, false).await?
        }
        AdminCommandKind::DeleteStation => service.delete_station(&command).await?,
        AdminCommandKind::DeletePhoto => service.delete_photo(&command).await?,
        AdminCommandKind::MarkSolved => service.mark_problem_report_solved(&command).await?,
        AdminCommandKind::Reject => service.reject_inbox_entry(&command).await?,
        AdminCommandKind::ChangeName => service.change_station_title(&command).await?,
        AdminCommandKind::UpdateLocation => service.update_location(&command).await?,
        AdminCommandKind::PhotoOutdated => service.mark_photo_outdated(&command).await?,
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct StatsQuery {
    country: Option<String>,
}

pub async fn stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Response, Error> {
    if let Some(country) = &query.country {
        if state.country_port.find_by_id(country).await?.is_none() {
            return Ok((StatusCode::NOT_FOUND, "country not found").into_response());
        }
    }
    let statistic = state
        .statistic_service
        .get_statistic(query.country.as_deref())
        .await?;
    Ok(Json(statistic).into_response())
}

pub async fn countries(State(state): State<AppState>) -> Result<Response, Error> {
    let countries = state.country_port.list(true).await?;
    Ok(Json(countries).into_response())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationDto {
    country: String,
    id: String,
    title: String,
    lat: f64,
    lon: f64,
    active: bool,
    photos: Vec<StationPhotoDto>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationPhotoDto {
    id: i64,
    photographer: String,
    path: String,
    license: &'static str,
    outdated: bool,
}

impl StationDto {
    fn from_station(station: Station) -> Self {
        Self {
            country: station.key.country.clone(),
            id: station.key.id.clone(),
            title: station.title.clone(),
            lat: station.coordinates.lat,
            lon: station.coordinates.lon,
            active: station.active,
            photos: station
                .photos
                .iter()
                .map(|photo| StationPhotoDto {
                    id: photo.id,
                    photographer: photo.photographer.display_name().to_owned(),
                    path: photo.url_path.clone(),
                    license: photo.license.display_name(),
                    outdated: photo.outdated,
                })
                .collect(),
        }
    }
}

pub async fn stations_by_country(
    State(state): State<AppState>,
    Path(country): Path<String>,
) -> Result<Response, Error> {
    let stations = state.station_port.find_by_country(&country).await?;
    let dtos: Vec<StationDto> = stations.into_iter().map(StationDto::from_station).collect();
    Ok(Json(dtos).into_response())
}
