//! SQLite external source repository.
//!
//! The webhook secret is minted here, on first insert, and is never touched
//! by later upserts.

use chrono::Utc;
use hookline_core::repository::external_source::{ExternalSourceRepository, ExternalSourceUpsert};
use hookline_types::error::RepositoryError;
use hookline_types::source::{ExternalSource, ExternalSourceStatus, ExternalSourceType};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, map_write_error, parse_datetime, parse_json, parse_uuid};

pub struct SqliteExternalSourceRepository {
    pool: DatabasePool,
}

impl SqliteExternalSourceRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// 64 lowercase hex characters from two random UUIDs.
fn generate_secret() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

struct ExternalSourceRow {
    id: String,
    organization_id: String,
    key: String,
    source_type: String,
    service: String,
    source: String,
    secret: Option<String>,
    status: String,
    connection_id: Option<String>,
    manual_registration: bool,
    created_at: String,
    updated_at: String,
}

impl ExternalSourceRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            organization_id: row.try_get("organization_id")?,
            key: row.try_get("key")?,
            source_type: row.try_get("type")?,
            service: row.try_get("service")?,
            source: row.try_get("source")?,
            secret: row.try_get("secret")?,
            status: row.try_get("status")?,
            connection_id: row.try_get("connection_id")?,
            manual_registration: row.try_get("manual_registration")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_external_source(self) -> Result<ExternalSource, RepositoryError> {
        let status: ExternalSourceStatus = self.status.parse().map_err(RepositoryError::Query)?;
        Ok(ExternalSource {
            id: parse_uuid(&self.id)?,
            organization_id: parse_uuid(&self.organization_id)?,
            key: self.key,
            source_type: ExternalSourceType::from(self.source_type),
            service: self.service,
            source: parse_json(&self.source, "source")?,
            secret: self.secret,
            status,
            connection_id: self.connection_id.as_deref().map(parse_uuid).transpose()?,
            manual_registration: self.manual_registration,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

fn decode(row: &sqlx::sqlite::SqliteRow) -> Result<ExternalSource, RepositoryError> {
    ExternalSourceRow::from_row(row)
        .map_err(|e| RepositoryError::Query(e.to_string()))?
        .into_external_source()
}

impl ExternalSourceRepository for SqliteExternalSourceRepository {
    async fn upsert(
        &self,
        upsert: &ExternalSourceUpsert,
    ) -> Result<ExternalSource, RepositoryError> {
        let now = format_datetime(&Utc::now());
        let row = sqlx::query(
            r#"INSERT INTO external_sources (id, organization_id, key, type, service, source, secret, status, connection_id, manual_registration, created_at, updated_at)
               VALUES (?, ?, ?, 'WEBHOOK', ?, ?, ?, 'CREATED', ?, ?, ?, ?)
               ON CONFLICT (organization_id, key) DO UPDATE SET
                   source = excluded.source,
                   connection_id = COALESCE(external_sources.connection_id, excluded.connection_id),
                   updated_at = excluded.updated_at
               RETURNING *"#,
        )
        .bind(Uuid::now_v7().to_string())
        .bind(upsert.organization_id.to_string())
        .bind(&upsert.key)
        .bind(&upsert.service)
        .bind(upsert.source.to_string())
        .bind(generate_secret())
        .bind(upsert.connection_id.map(|id| id.to_string()))
        .bind(upsert.manual_registration)
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool.writer)
        .await
        .map_err(|e| map_write_error(e, &format!("external source '{}'", upsert.key)))?;

        decode(&row)
    }

    async fn get_by_id(&self, id: &Uuid) -> Result<Option<ExternalSource>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM external_sources WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        row.as_ref().map(decode).transpose()
    }

    async fn list(&self, organization_id: &Uuid) -> Result<Vec<ExternalSource>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM external_sources WHERE organization_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(organization_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
        rows.iter().map(decode).collect()
    }

    async fn update_status(
        &self,
        id: &Uuid,
        status: ExternalSourceStatus,
    ) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE external_sources SET status = ?, updated_at = ? WHERE id = ?")
                .bind(status.as_str())
                .bind(format_datetime(&Utc::now()))
                .bind(id.to_string())
                .execute(&self.pool.writer)
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
