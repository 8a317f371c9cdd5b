//! SQLite provider connection repository.
//!
//! Access tokens are stored in the `connections` row but are never part of
//! the `Connection` entity; they are read back only through
//! [`ConnectionRepository::access_token`] and wrapped in a `SecretString`.

use hookline_core::repository::connection::ConnectionRepository;
use hookline_types::error::RepositoryError;
use hookline_types::source::{Connection, ConnectionStatus};
use secrecy::{ExposeSecret, SecretString};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, map_write_error, parse_datetime, parse_uuid};

pub struct SqliteConnectionRepository {
    pool: DatabasePool,
}

impl SqliteConnectionRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct ConnectionRow {
    id: String,
    organization_id: String,
    provider: String,
    status: String,
    created_at: String,
}

impl ConnectionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            organization_id: row.try_get("organization_id")?,
            provider: row.try_get("provider")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_connection(self) -> Result<Connection, RepositoryError> {
        let status: ConnectionStatus = self.status.parse().map_err(RepositoryError::Query)?;
        Ok(Connection {
            id: parse_uuid(&self.id)?,
            organization_id: parse_uuid(&self.organization_id)?,
            provider: self.provider,
            status,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

impl ConnectionRepository for SqliteConnectionRepository {
    async fn create(
        &self,
        connection: &Connection,
        access_token: &SecretString,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO connections (id, organization_id, provider, status, access_token, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(connection.id.to_string())
        .bind(connection.organization_id.to_string())
        .bind(&connection.provider)
        .bind(connection.status.as_str())
        .bind(access_token.expose_secret())
        .bind(format_datetime(&connection.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| map_write_error(e, "connection"))?;
        Ok(())
    }

    async fn find_latest_connected(
        &self,
        organization_id: &Uuid,
        provider: &str,
    ) -> Result<Option<Connection>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, organization_id, provider, status, created_at FROM connections
             WHERE organization_id = ? AND provider = ? AND status = 'CONNECTED'
             ORDER BY created_at DESC, id DESC
             LIMIT 1",
        )
        .bind(organization_id.to_string())
        .bind(provider)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let conn_row = ConnectionRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(conn_row.into_connection()?))
            }
            None => Ok(None),
        }
    }

    async fn access_token(
        &self,
        connection_id: &Uuid,
    ) -> Result<Option<SecretString>, RepositoryError> {
        let token: Option<(String,)> =
            sqlx::query_as("SELECT access_token FROM connections WHERE id = ?")
                .bind(connection_id.to_string())
                .fetch_optional(&self.pool.reader)
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(token.map(|(t,)| SecretString::from(t)))
    }
}
