//! SQLite storage layer.
//!
//! Repository implementations backed by SQLite with WAL mode and split
//! read/write connection pools. Entity upserts are single
//! `INSERT ... ON CONFLICT ... DO UPDATE ... RETURNING *` statements on the
//! one-connection writer pool, so concurrent reconciles never duplicate rows.

pub mod connection;
pub mod event_rule;
pub mod event_sink;
pub mod external_source;
pub mod pool;
pub mod tenancy;
pub mod workflow;

use chrono::{DateTime, Utc};
use hookline_types::error::RepositoryError;
use serde_json::Value;
use uuid::Uuid;

fn parse_uuid(s: &str) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(s).map_err(|e| RepositoryError::Query(format!("invalid UUID: {e}")))
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn parse_json(s: &str, what: &str) -> Result<Value, RepositoryError> {
    serde_json::from_str(s).map_err(|e| RepositoryError::Query(format!("invalid {what} JSON: {e}")))
}

/// Map a sqlx error, turning unique-constraint violations into `Conflict`.
fn map_write_error(e: sqlx::Error, what: &str) -> RepositoryError {
    match e {
        sqlx::Error::Database(db_err) if db_err.message().contains("UNIQUE") => {
            RepositoryError::Conflict(format!("{what}: {}", db_err.message()))
        }
        e => RepositoryError::Query(e.to_string()),
    }
}

#[cfg(test)]
pub(crate) async fn test_pool() -> pool::DatabasePool {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let url = format!("sqlite://{}?mode=rwc", db_path.display());
    // Leak tempdir so it lives for the test
    std::mem::forget(dir);
    pool::DatabasePool::new(&url).await.unwrap()
}

#[cfg(test)]
pub(crate) async fn seed_organization(
    pool: &pool::DatabasePool,
    slug: &str,
) -> hookline_types::tenancy::Organization {
    use hookline_core::repository::tenancy::OrganizationRepository;
    tenancy::SqliteOrganizationRepository::new(pool.clone())
        .create(&hookline_types::tenancy::Organization::new(slug))
        .await
        .unwrap()
}
