//! Station table access. Stations are loaded through a flat
//! station x photo x user join; the rows are grouped in memory by
//! station key and materialized with their photo lists attached.

use std::collections::HashMap;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::models::{
    Coordinates, License, Photo, Station, StationKey, Statistic, User,
};
use crate::ports::StationPort;

const SELECT_STATIONS: &str = r#"
SELECT s.country_code, s.id, s.title, s.lat, s.lon, s.ds100, s.active,
       p.id AS photo_id, p."primary" AS photo_primary, p.url_path,
       p.created_at AS photo_created_at, p.license AS photo_license, p.outdated,
       u.id AS photographer_id, u.name AS photographer_name, u.url AS photographer_url,
       u.license AS photographer_license, u.email AS photographer_email,
       u.own_photos, u.anonymous, u.admin, u.email_verification,
       u.send_notifications, u.locale
FROM stations s
LEFT JOIN photos p ON p.country_code = s.country_code AND p.station_id = s.id
LEFT JOIN users u ON u.id = p.photographer_id
"#;

#[derive(sqlx::FromRow)]
struct StationPhotoRow {
    country_code: String,
    id: String,
    title: String,
    lat: f64,
    lon: f64,
    ds100: Option<String>,
    active: bool,
    photo_id: Option<i64>,
    photo_primary: Option<bool>,
    url_path: Option<String>,
    photo_created_at: Option<DateTime<Utc>>,
    photo_license: Option<String>,
    outdated: Option<bool>,
    photographer_id: Option<i64>,
    photographer_name: Option<String>,
    photographer_url: Option<String>,
    photographer_license: Option<String>,
    photographer_email: Option<String>,
    own_photos: Option<bool>,
    anonymous: Option<bool>,
    admin: Option<bool>,
    email_verification: Option<String>,
    send_notifications: Option<bool>,
    locale: Option<String>,
}

impl StationPhotoRow {
    fn key(&self) -> StationKey {
        StationKey::new(self.country_code.clone(), self.id.clone())
    }

    fn photo(&self) -> Option<Photo> {
        let photo_id = self.photo_id?;
        Some(Photo {
            id: photo_id,
            station_key: self.key(),
            primary: self.photo_primary.unwrap_or(false),
            url_path: self.url_path.clone().unwrap_or_default(),
            photographer: User {
                id: self.photographer_id.unwrap_or(0),
                name: self.photographer_name.clone().unwrap_or_default(),
                url: self.photographer_url.clone(),
                license: License::of(self.photographer_license.as_deref()),
                email: self.photographer_email.clone(),
                own_photos: self.own_photos.unwrap_or(false),
                anonymous: self.anonymous.unwrap_or(false),
                admin: self.admin.unwrap_or(false),
                email_verification: self.email_verification.clone(),
                send_notifications: self.send_notifications.unwrap_or(false),
                locale: self.locale.clone().unwrap_or_else(|| "en".to_owned()),
            },
            created_at: self.photo_created_at.unwrap_or(DateTime::UNIX_EPOCH),
            license: License::of(self.photo_license.as_deref()),
            outdated: self.outdated.unwrap_or(false),
        })
    }
}

/// Group flat join rows by station key and attach the photo lists.
fn collect_stations(rows: Vec<StationPhotoRow>) -> Vec<Station> {
    let mut stations: Vec<Station> = Vec::new();
    let mut index: HashMap<StationKey, usize> = HashMap::new();
    for row in rows {
        let key = row.key();
        let photo = row.photo();
        let position = *index.entry(key.clone()).or_insert_with(|| {
            stations.push(Station {
                key,
                title: row.title.clone(),
                coordinates: Coordinates::new(row.lat, row.lon),
                ds100: row.ds100.clone(),
                photos: vec![],
                active: row.active,
            });
            stations.len() - 1
        });
        if let Some(photo) = photo {
            stations[position].photos.push(photo);
        }
    }
    for station in &mut stations {
        station.photos.sort_by_key(Photo::sort_key);
    }
    stations
}

pub struct StationAdapter {
    pool: SqlitePool,
}

impl StationAdapter {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StationPort for StationAdapter {
    async fn find_by_key(&self, key: &StationKey) -> Result<Option<Station>> {
        let rows: Vec<StationPhotoRow> =
            sqlx::query_as(&format!("{SELECT_STATIONS} WHERE s.country_code = ? AND s.id = ?"))
                .bind(&key.country)
                .bind(&key.id)
                .fetch_all(&self.pool)
                .await
                .context("failed to load station")?;
        Ok(collect_stations(rows).into_iter().next())
    }

    async fn find_by_country(&self, country_code: &str) -> Result<Vec<Station>> {
        let rows: Vec<StationPhotoRow> = sqlx::query_as(&format!(
            "{SELECT_STATIONS} WHERE s.country_code = ? ORDER BY s.id"
        ))
        .bind(country_code)
        .fetch_all(&self.pool)
        .await
        .context("failed to load stations by country")?;
        Ok(collect_stations(rows))
    }

    async fn find_by_photo_id(&self, photo_id: i64) -> Result<Option<Station>> {
        let key: Option<(String, String)> = sqlx::query_as(
            "SELECT country_code, station_id FROM photos WHERE id = ?",
        )
        .bind(photo_id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to resolve photo station")?;
        match key {
            Some((country, id)) => self.find_by_key(&StationKey::new(country, id)).await,
            None => Ok(None),
        }
    }

    async fn insert(&self, station: &Station) -> Result<()> {
        sqlx::query(
            "INSERT INTO stations (country_code, id, title, lat, lon, ds100, active) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&station.key.country)
        .bind(&station.key.id)
        .bind(&station.title)
        .bind(station.coordinates.lat)
        .bind(station.coordinates.lon)
        .bind(&station.ds100)
        .bind(station.active)
        .execute(&self.pool)
        .await
        .context("failed to insert station")?;
        Ok(())
    }

    async fn delete(&self, key: &StationKey) -> Result<()> {
        sqlx::query("DELETE FROM stations WHERE country_code = ? AND id = ?")
            .bind(&key.country)
            .bind(&key.id)
            .execute(&self.pool)
            .await
            .context("failed to delete station")?;
        Ok(())
    }

    async fn update_active(&self, key: &StationKey, active: bool) -> Result<()> {
        sqlx::query("UPDATE stations SET active = ? WHERE country_code = ? AND id = ?")
            .bind(active)
            .bind(&key.country)
            .bind(&key.id)
            .execute(&self.pool)
            .await
            .context("failed to update station active state")?;
        Ok(())
    }

    async fn change_station_title(&self, key: &StationKey, new_title: &str) -> Result<()> {
        sqlx::query("UPDATE stations SET title = ? WHERE country_code = ? AND id = ?")
            .bind(new_title)
            .bind(&key.country)
            .bind(&key.id)
            .execute(&self.pool)
            .await
            .context("failed to change station title")?;
        Ok(())
    }

    async fn update_location(&self, key: &StationKey, coordinates: Coordinates) -> Result<()> {
        sqlx::query("UPDATE stations SET lat = ?, lon = ? WHERE country_code = ? AND id = ?")
            .bind(coordinates.lat)
            .bind(coordinates.lon)
            .bind(&key.country)
            .bind(&key.id)
            .execute(&self.pool)
            .await
            .context("failed to update station location")?;
        Ok(())
    }

    async fn count_nearby_coordinates(&self, coordinates: Coordinates) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM stations WHERE \
             (71.5 * (lon - ?)) * (71.5 * (lon - ?)) \
             + (111.3 * (lat - ?)) * (111.3 * (lat - ?)) < 0.25",
        )
        .bind(coordinates.lon)
        .bind(coordinates.lon)
        .bind(coordinates.lat)
        .bind(coordinates.lat)
        .fetch_one(&self.pool)
        .await
        .context("failed to count nearby stations")
    }

    async fn max_z(&self) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COALESCE(MAX(CAST(substr(id, 2) AS INTEGER)), 0) FROM stations \
             WHERE id LIKE 'Z%'",
        )
        .fetch_one(&self.pool)
        .await
        .context("failed to determine max Z station id")
    }

    async fn get_statistic(&self, country_code: Option<&str>) -> Result<Statistic> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM stations WHERE (? IS NULL OR country_code = ?)",
        )
        .bind(country_code)
        .bind(country_code)
        .fetch_one(&self.pool)
        .await
        .context("failed to count stations")?;
        let with_photo: i64 = sqlx::query_scalar(
            "SELECT COUNT(DISTINCT s.country_code || ':' || s.id) FROM stations s \
             JOIN photos p ON p.country_code = s.country_code AND p.station_id = s.id \
             WHERE (? IS NULL OR s.country_code = ?)",
        )
        .bind(country_code)
        .bind(country_code)
        .fetch_one(&self.pool)
        .await
        .context("failed to count stations with photo")?;
        let photographers: i64 = sqlx::query_scalar(
            "SELECT COUNT(DISTINCT photographer_id) FROM photos \
             WHERE (? IS NULL OR country_code = ?)",
        )
        .bind(country_code)
        .bind(country_code)
        .fetch_one(&self.pool)
        .await
        .context("failed to count photographers")?;
        Ok(Statistic {
            country_code: country_code.map(str::to_owned),
            total,
            with_photo,
            photographers,
        })
    }
}
