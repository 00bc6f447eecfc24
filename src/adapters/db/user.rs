//! User table access.

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::models::{License, User};
use crate::ports::UserPort;

const SELECT_USERS: &str = "SELECT id, name, url, license, email, own_photos, anonymous, \
     admin, email_verification, send_notifications, locale FROM users";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    name: String,
    url: Option<String>,
    license: String,
    email: Option<String>,
    own_photos: bool,
    anonymous: bool,
    admin: bool,
    email_verification: Option<String>,
    send_notifications: bool,
    locale: String,
}

impl UserRow {
    fn into_user(self) -> User {
        User {
            id: self.id,
            name: self.name,
            url: self.url,
            license: License::of(Some(&self.license)),
            email: self.email,
            own_photos: self.own_photos,
            anonymous: self.anonymous,
            admin: self.admin,
            email_verification: self.email_verification,
            send_notifications: self.send_notifications,
            locale: self.locale,
        }
    }
}

pub struct UserAdapter {
    pool: SqlitePool,
}

impl UserAdapter {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserPort for UserAdapter {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!("{SELECT_USERS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to load user by id")?;
        Ok(row.map(UserRow::into_user))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!("{SELECT_USERS} WHERE name = ?"))
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .context("failed to load user by name")?;
        Ok(row.map(UserRow::into_user))
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!("{SELECT_USERS} WHERE token = ?"))
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .context("failed to load user by token")?;
        Ok(row.map(UserRow::into_user))
    }
}
