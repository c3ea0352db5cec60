//! Test database helper utilities
//!
//! PostgreSQL tests run only when `TEST_DATABASE_URL` points at a scratch
//! database; otherwise they return early.

use sqlx::PgPool;
use EventHub::database::run_migrations;

pub const TEST_DATABASE_URL: &str = "TEST_DATABASE_URL";

/// Connect and migrate the test database, or `None` when not configured
pub async fn test_pool() -> Option<PgPool> {
    let url = match std::env::var(TEST_DATABASE_URL) {
        Ok(url) if !url.trim().is_empty() => url,
        _ => {
            eprintln!("{} not set, skipping PostgreSQL test", TEST_DATABASE_URL);
            return None;
        }
    };

    let pool = PgPool::connect(&url).await.expect("failed to connect to test database");
    run_migrations(&pool).await.expect("failed to run migrations");
    clean_database(&pool).await;
    Some(pool)
}

/// Remove every row so each serial test starts empty
pub async fn clean_database(pool: &PgPool) {
    sqlx::query("TRUNCATE notifications, saved_events, registrations, events, users CASCADE")
        .execute(pool)
        .await
        .expect("failed to truncate test tables");
}
