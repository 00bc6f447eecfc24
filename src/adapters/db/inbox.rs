//! Inbox table access. Entries are read through a join that attaches the
//! target station's title/coordinates, the photographer and the photo the
//! entry refers to (explicit photo id, else the station's primary).

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::models::{
    Coordinates, InboxEntry, ProblemReportType, PublicInboxEntry,
};
use crate::ports::InboxPort;

const SELECT_ENTRIES: &str = r#"
SELECT i.id, i.country_code, i.station_id, i.photo_id,
       s.title AS station_title, s.lat AS station_lat, s.lon AS station_lon,
       i.title AS new_title, i.lat AS new_lat, i.lon AS new_lon,
       i.photographer_id, u.name AS photographer_nickname, u.email AS photographer_email,
       i.extension, i.comment, i.reject_reason, i.created_at, i.done,
       p.url_path AS existing_photo_url_path,
       i.crc32, i.problem_report_type, i.active, i.notified, i.posted
FROM inbox i
JOIN users u ON u.id = i.photographer_id
LEFT JOIN stations s ON s.country_code = i.country_code AND s.id = i.station_id
LEFT JOIN photos p ON p.country_code = i.country_code AND p.station_id = i.station_id
    AND (p.id = i.photo_id OR (p."primary" = 1 AND i.photo_id IS NULL))
"#;

#[derive(sqlx::FromRow)]
struct InboxRow {
    id: i64,
    country_code: Option<String>,
    station_id: Option<String>,
    photo_id: Option<i64>,
    station_title: Option<String>,
    station_lat: Option<f64>,
    station_lon: Option<f64>,
    new_title: Option<String>,
    new_lat: Option<f64>,
    new_lon: Option<f64>,
    photographer_id: i64,
    photographer_nickname: Option<String>,
    photographer_email: Option<String>,
    extension: Option<String>,
    comment: Option<String>,
    reject_reason: Option<String>,
    created_at: DateTime<Utc>,
    done: bool,
    existing_photo_url_path: Option<String>,
    crc32: Option<i64>,
    problem_report_type: Option<String>,
    active: Option<bool>,
    notified: bool,
    posted: bool,
}

fn coordinates(lat: Option<f64>, lon: Option<f64>) -> Option<Coordinates> {
    match (lat, lon) {
        (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
        _ => None,
    }
}

impl InboxRow {
    fn into_entry(self) -> InboxEntry {
        InboxEntry {
            id: self.id,
            country_code: self.country_code,
            station_id: self.station_id,
            photo_id: self.photo_id,
            title: self.station_title,
            new_title: self.new_title,
            coordinates: coordinates(self.station_lat, self.station_lon),
            new_coordinates: coordinates(self.new_lat, self.new_lon),
            photographer_id: self.photographer_id,
            photographer_nickname: self.photographer_nickname,
            photographer_email: self.photographer_email,
            extension: self.extension,
            comment: self.comment,
            reject_reason: self.reject_reason,
            created_at: self.created_at,
            done: self.done,
            existing_photo_url_path: self.existing_photo_url_path,
            crc32: self.crc32.map(|value| value as u32),
            conflict: false,
            problem_report_type: self
                .problem_report_type
                .as_deref()
                .and_then(ProblemReportType::of),
            processed: false,
            inbox_url: None,
            ds100: None,
            active: self.active,
            notified: self.notified,
            posted: self.posted,
        }
    }
}

pub struct InboxAdapter {
    pool: SqlitePool,
}

impl InboxAdapter {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InboxPort for InboxAdapter {
    async fn find_by_id(&self, id: i64) -> Result<Option<InboxEntry>> {
        let row: Option<InboxRow> =
            sqlx::query_as(&format!("{SELECT_ENTRIES} WHERE i.id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .context("failed to load inbox entry")?;
        Ok(row.map(InboxRow::into_entry))
    }

    async fn find_pending_inbox_entries(&self) -> Result<Vec<InboxEntry>> {
        let rows: Vec<InboxRow> =
            sqlx::query_as(&format!("{SELECT_ENTRIES} WHERE i.done = 0 ORDER BY i.id"))
                .fetch_all(&self.pool)
                .await
                .context("failed to load pending inbox entries")?;
        Ok(rows.into_iter().map(InboxRow::into_entry).collect())
    }

    async fn find_oldest_imported_photo_not_yet_posted(&self) -> Result<Option<InboxEntry>> {
        let row: Option<InboxRow> = sqlx::query_as(&format!(
            "{SELECT_ENTRIES} WHERE i.done = 1 AND i.reject_reason IS NULL \
             AND i.extension IS NOT NULL AND i.posted = 0 ORDER BY i.created_at LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await
        .context("failed to load oldest unposted photo")?;
        Ok(row.map(InboxRow::into_entry))
    }

    async fn find_public_inbox_entries(&self) -> Result<Vec<PublicInboxEntry>> {
        #[derive(sqlx::FromRow)]
        struct PublicRow {
            country_code: Option<String>,
            station_id: Option<String>,
            title: Option<String>,
            lat: f64,
            lon: f64,
        }

        let rows: Vec<PublicRow> = sqlx::query_as(
            "SELECT i.country_code, i.station_id, COALESCE(s.title, i.title) AS title, \
             COALESCE(s.lat, i.lat, 0) AS lat, COALESCE(s.lon, i.lon, 0) AS lon \
             FROM inbox i \
             LEFT JOIN stations s ON s.country_code = i.country_code AND s.id = i.station_id \
             WHERE i.done = 0 AND i.problem_report_type IS NULL",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to load public inbox")?;
        Ok(rows
            .into_iter()
            .map(|row| PublicInboxEntry {
                country_code: row.country_code,
                station_id: row.station_id,
                title: row.title.unwrap_or_default(),
                coordinates: Coordinates::new(row.lat, row.lon),
            })
            .collect())
    }

    async fn insert(&self, entry: &InboxEntry) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO inbox (photographer_id, country_code, station_id, photo_id, title, \
             lat, lon, extension, comment, reject_reason, created_at, done, \
             problem_report_type, active, crc32, notified, posted) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.photographer_id)
        .bind(&entry.country_code)
        .bind(&entry.station_id)
        .bind(entry.photo_id)
        .bind(&entry.new_title)
        .bind(entry.new_lat())
        .bind(entry.new_lon())
        .bind(&entry.extension)
        .bind(&entry.comment)
        .bind(&entry.reject_reason)
        .bind(entry.created_at)
        .bind(entry.done)
        .bind(entry.problem_report_type.map(|t| t.name()))
        .bind(entry.active)
        .bind(entry.crc32.map(i64::from))
        .bind(entry.notified)
        .bind(entry.posted)
        .execute(&self.pool)
        .await
        .context("failed to insert inbox entry")?;
        Ok(result.last_insert_rowid())
    }

    async fn reject(&self, id: i64, reject_reason: &str) -> Result<()> {
        sqlx::query("UPDATE inbox SET done = 1, reject_reason = ? WHERE id = ?")
            .bind(reject_reason)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("failed to reject inbox entry")?;
        Ok(())
    }

    async fn done(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE inbox SET done = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("failed to mark inbox entry done")?;
        Ok(())
    }

    async fn count_pending_inbox_entries(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM inbox WHERE done = 0")
            .fetch_one(&self.pool)
            .await
            .context("failed to count pending inbox entries")
    }

    async fn count_pending_inbox_entries_for_station(
        &self,
        exclude_id: Option<i64>,
        country_code: &str,
        station_id: &str,
    ) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM inbox WHERE done = 0 AND country_code = ? AND station_id = ? \
             AND (? IS NULL OR id <> ?)",
        )
        .bind(country_code)
        .bind(station_id)
        .bind(exclude_id)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await
        .context("failed to count pending entries for station")
    }

    /// Count nearby pending uploads using simple pythagoras, only valid
    /// for a few km.
    async fn count_pending_inbox_entries_for_nearby_coordinates(
        &self,
        exclude_id: Option<i64>,
        coordinates: Coordinates,
    ) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM inbox WHERE done = 0 AND (? IS NULL OR id <> ?) \
             AND lat IS NOT NULL AND lon IS NOT NULL \
             AND (71.5 * (lon - ?)) * (71.5 * (lon - ?)) \
               + (111.3 * (lat - ?)) * (111.3 * (lat - ?)) < 0.25",
        )
        .bind(exclude_id)
        .bind(exclude_id)
        .bind(coordinates.lon)
        .bind(coordinates.lon)
        .bind(coordinates.lat)
        .bind(coordinates.lat)
        .fetch_one(&self.pool)
        .await
        .context("failed to count nearby pending entries")
    }

    async fn update_crc32(&self, id: i64, crc32: u32) -> Result<()> {
        sqlx::query("UPDATE inbox SET crc32 = ? WHERE id = ?")
            .bind(i64::from(crc32))
            .bind(id)
            .execute(&self.pool)
            .await
            .context("failed to update crc32")?;
        Ok(())
    }

    async fn find_inbox_entries_to_notify(&self) -> Result<Vec<InboxEntry>> {
        let rows: Vec<InboxRow> = sqlx::query_as(&format!(
            "{SELECT_ENTRIES} WHERE i.done = 1 AND i.notified = 0 ORDER BY i.id"
        ))
        .fetch_all(&self.pool)
        .await
        .context("failed to load entries to notify")?;
        Ok(rows.into_iter().map(InboxRow::into_entry).collect())
    }

    async fn update_notified(&self, ids: &[i64]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut query = sqlx::QueryBuilder::new("UPDATE inbox SET notified = 1 WHERE id IN (");
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(id);
        }
        query.push(")");
        query
            .build()
            .execute(&self.pool)
            .await
            .context("failed to mark entries notified")?;
        Ok(())
    }

    async fn update_posted(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE inbox SET posted = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("failed to mark entry posted")?;
        Ok(())
    }

    async fn update_photo_id(&self, id: i64, photo_id: i64) -> Result<()> {
        sqlx::query("UPDATE inbox SET photo_id = ? WHERE id = ?")
            .bind(photo_id)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("failed to update photo id")?;
        Ok(())
    }

    async fn update_missing_station_imported(
        &self,
        id: i64,
        country_code: &str,
        station_id: &str,
        title: &str,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE inbox SET done = 1, country_code = ?, station_id = ?, title = ? WHERE id = ?",
        )
        .bind(country_code)
        .bind(station_id)
        .bind(title)
        .bind(id)
        .execute(&self.pool)
        .await
        .context("failed to update imported missing station")?;
        Ok(())
    }

    async fn find_by_user(
        &self,
        photographer_id: i64,
        show_completed_entries: bool,
    ) -> Result<Vec<InboxEntry>> {
        let rows: Vec<InboxRow> = sqlx::query_as(&format!(
            "{SELECT_ENTRIES} WHERE i.photographer_id = ? AND (i.done = 0 OR ? = 1) \
             ORDER BY i.id DESC"
        ))
        .bind(photographer_id)
        .bind(show_completed_entries)
        .fetch_all(&self.pool)
        .await
        .context("failed to load user inbox")?;
        Ok(rows.into_iter().map(InboxRow::into_entry).collect())
    }

    async fn find_pending_by_station(
        &self,
        country_code: &str,
        station_id: &str,
    ) -> Result<Vec<InboxEntry>> {
        let rows: Vec<InboxRow> = sqlx::query_as(&format!(
            "{SELECT_ENTRIES} WHERE i.country_code = ? AND i.station_id = ? AND i.done = 0"
        ))
        .bind(country_code)
        .bind(station_id)
        .fetch_all(&self.pool)
        .await
        .context("failed to load pending entries for station")?;
        Ok(rows.into_iter().map(InboxRow::into_entry).collect())
    }
}
