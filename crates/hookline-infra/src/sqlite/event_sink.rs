//! SQLite ingestion sink.
//!
//! Canonical events land in the `events` table keyed by
//! `(organization_id, id)`. A provider that redelivers with the same
//! delivery id is absorbed by `ON CONFLICT DO NOTHING`.

use chrono::Utc;
use hookline_core::event::EventSink;
use hookline_types::error::IngestError;
use hookline_types::event::CanonicalEvent;
use hookline_types::tenancy::Organization;
use serde_json::Value;

use super::pool::DatabasePool;
use super::format_datetime;

pub struct SqliteEventSink {
    pool: DatabasePool,
}

impl SqliteEventSink {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Number of events stored for an organization.
    pub async fn count(&self, organization: &Organization) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM events WHERE organization_id = ?")
                .bind(organization.id.to_string())
                .fetch_one(&self.pool.reader)
                .await?;
        Ok(count)
    }

    /// Stored `(event, payload)` of one event.
    pub async fn get(
        &self,
        organization: &Organization,
        event_id: &str,
    ) -> Result<Option<(String, Value)>, sqlx::Error> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT event, payload FROM events WHERE organization_id = ? AND id = ?")
                .bind(organization.id.to_string())
                .bind(event_id)
                .fetch_optional(&self.pool.reader)
                .await?;
        Ok(row.map(|(event, payload)| {
            (event, serde_json::from_str(&payload).unwrap_or(Value::Null))
        }))
    }
}

impl EventSink for SqliteEventSink {
    async fn ingest(
        &self,
        event: &CanonicalEvent,
        service: &str,
        organization: &Organization,
    ) -> Result<(), IngestError> {
        let context = serde_json::to_string(&event.context).map_err(|e| IngestError::Storage {
            event_id: event.id.clone(),
            reason: e.to_string(),
        })?;

        let result = sqlx::query(
            r#"INSERT INTO events (organization_id, id, service, event, payload, context, timestamp, received_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT (organization_id, id) DO NOTHING"#,
        )
        .bind(organization.id.to_string())
        .bind(&event.id)
        .bind(service)
        .bind(&event.event)
        .bind(event.payload.to_string())
        .bind(&context)
        .bind(event.timestamp.as_ref().map(format_datetime))
        .bind(format_datetime(&Utc::now()))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| IngestError::Storage {
            event_id: event.id.clone(),
            reason: e.to_string(),
        })?;

        if result.rows_affected() == 0 {
            tracing::debug!(event_id = %event.id, service, "duplicate delivery absorbed");
        }
        Ok(())
    }
}
