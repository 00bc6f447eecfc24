//! Country table access.

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::models::{Country, License};
use crate::ports::CountryPort;

#[derive(sqlx::FromRow)]
struct CountryRow {
    code: String,
    name: String,
    email: Option<String>,
    timetable_url_template: Option<String>,
    override_license: Option<String>,
    active: bool,
}

impl CountryRow {
    fn into_country(self) -> Country {
        Country {
            code: self.code,
            name: self.name,
            email: self.email,
            timetable_url_template: self.timetable_url_template,
            override_license: self
                .override_license
                .as_deref()
                .map(|name| License::of(Some(name))),
            active: self.active,
        }
    }
}

pub struct CountryAdapter {
    pool: SqlitePool,
}

impl CountryAdapter {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CountryPort for CountryAdapter {
    async fn find_by_id(&self, id: &str) -> Result<Option<Country>> {
        let row: Option<CountryRow> = sqlx::query_as(
            "SELECT code, name, email, timetable_url_template, override_license, active \
             FROM countries WHERE code = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to load country")?;
        Ok(row.map(CountryRow::into_country))
    }

    async fn list(&self, only_active: bool) -> Result<Vec<Country>> {
        let rows: Vec<CountryRow> = sqlx::query_as(
            "SELECT code, name, email, timetable_url_template, override_license, active \
             FROM countries WHERE active = 1 OR ? = 0 ORDER BY code",
        )
        .bind(only_active)
        .fetch_all(&self.pool)
        .await
        .context("failed to list countries")?;
        Ok(rows.into_iter().map(CountryRow::into_country).collect())
    }
}
