//! Photo table access.

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::models::{Photo, StationKey};
use crate::ports::PhotoPort;

pub struct PhotoAdapter {
    pool: SqlitePool,
}

impl PhotoAdapter {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PhotoPort for PhotoAdapter {
    async fn insert(&self, photo: &Photo) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO photos (country_code, station_id, \"primary\", url_path, \
             photographer_id, created_at, license, outdated) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&photo.station_key.country)
        .bind(&photo.station_key.id)
        .bind(photo.primary)
        .bind(&photo.url_path)
        .bind(photo.photographer.id)
        .bind(photo.created_at)
        .bind(photo.license.name())
        .bind(photo.outdated)
        .execute(&self.pool)
        .await
        .context("failed to insert photo")?;
        Ok(result.last_insert_rowid())
    }

    async fn update(&self, photo: &Photo) -> Result<()> {
        sqlx::query(
            "UPDATE photos SET country_code = ?, station_id = ?, \"primary\" = ?, \
             url_path = ?, photographer_id = ?, created_at = ?, license = ?, outdated = ? \
             WHERE id = ?",
        )
        .bind(&photo.station_key.country)
        .bind(&photo.station_key.id)
        .bind(photo.primary)
        .bind(&photo.url_path)
        .bind(photo.photographer.id)
        .bind(photo.created_at)
        .bind(photo.license.name())
        .bind(photo.outdated)
        .bind(photo.id)
        .execute(&self.pool)
        .await
        .context("failed to update photo")?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM photos WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("failed to delete photo")?;
        Ok(())
    }

    async fn update_photo_outdated(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE photos SET outdated = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("failed to mark photo outdated")?;
        Ok(())
    }

    async fn set_all_photos_for_station_secondary(&self, key: &StationKey) -> Result<()> {
        sqlx::query(
            "UPDATE photos SET \"primary\" = 0 WHERE country_code = ? AND station_id = ?",
        )
        .bind(&key.country)
        .bind(&key.id)
        .execute(&self.pool)
        .await
        .context("failed to demote station photos")?;
        Ok(())
    }

    async fn set_primary(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE photos SET \"primary\" = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("failed to set photo primary")?;
        Ok(())
    }

    async fn count_photos(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM photos")
            .fetch_one(&self.pool)
            .await
            .context("failed to count photos")
    }

    async fn find_nth_photo_id(&self, n: i64) -> Result<Option<i64>> {
        sqlx::query_scalar("SELECT id FROM photos ORDER BY id LIMIT 1 OFFSET ?")
            .bind(n)
            .fetch_optional(&self.pool)
            .await
            .context("failed to find nth photo")
    }
}
