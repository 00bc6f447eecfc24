//! SQLite implementations of the repository ports.

mod country;
mod inbox;
mod photo;
mod station;
mod user;

pub use country::CountryAdapter;
pub use inbox::InboxAdapter;
pub use photo::PhotoAdapter;
pub use station::StationAdapter;
pub use user::UserAdapter;

#[cfg(test)]
pub(crate) mod testing {
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;

    /// Fresh in-memory database with the schema applied. A single
    /// connection keeps every query on the same in-memory instance.
    pub async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory database");
        sqlx::migrate!()
            .run(&pool)
            .await
            .expect("schema migration");
        pool
    }

    pub async fn seed_user(pool: &SqlitePool, id: i64, name: &str) {
        sqlx::query(
            "INSERT INTO users (id, name, license, email, own_photos, email_verification, send_notifications)
             VALUES (?, ?, 'CC0_10', ?, 1, 'VERIFIED', 1)",
        )
        .bind(id)
        .bind(name)
        .bind(format!("{name}@example.com"))
        .execute(pool)
        .await
        .expect("seed user");
    }

    pub async fn seed_country(pool: &SqlitePool, code: &str) {
        sqlx::query("INSERT INTO countries (code, name, active) VALUES (?, ?, 1)")
            .bind(code)
            .bind(format!("Country {code}"))
            .execute(pool)
            .await
            .expect("seed country");
    }

    pub async fn seed_station(pool: &SqlitePool, country: &str, id: &str, title: &str) {
        sqlx::query(
            "INSERT INTO stations (country_code, id, title, lat, lon, active) VALUES (?, ?, ?, 50.1, 9.8, 1)",
        )
        .bind(country)
        .bind(id)
        .bind(title)
        .execute(pool)
        .await
        .expect("seed station");
    }
}
