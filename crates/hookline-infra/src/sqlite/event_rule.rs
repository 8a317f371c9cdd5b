//! SQLite event rule repository.

use chrono::Utc;
use hookline_core::repository::event_rule::{EventRuleRepository, EventRuleUpsert};
use hookline_types::error::RepositoryError;
use hookline_types::trigger::{TriggerMetadata, TriggerType};
use hookline_types::workflow::EventRule;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, map_write_error, parse_datetime, parse_json, parse_uuid};

pub struct SqliteEventRuleRepository {
    pool: DatabasePool,
}

impl SqliteEventRuleRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct EventRuleRow {
    id: String,
    workflow_id: String,
    environment_id: String,
    organization_id: String,
    filter: String,
    trigger_type: String,
    trigger: String,
    created_at: String,
    updated_at: String,
}

impl EventRuleRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            workflow_id: row.try_get("workflow_id")?,
            environment_id: row.try_get("environment_id")?,
            organization_id: row.try_get("organization_id")?,
            filter: row.try_get("filter")?,
            trigger_type: row.try_get("trigger_type")?,
            trigger: row.try_get("trigger")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_event_rule(self) -> Result<EventRule, RepositoryError> {
        let trigger_type: TriggerType = self.trigger_type.parse().map_err(RepositoryError::Query)?;
        let trigger: TriggerMetadata = serde_json::from_str(&self.trigger)
            .map_err(|e| RepositoryError::Query(format!("invalid trigger JSON: {e}")))?;
        Ok(EventRule {
            id: parse_uuid(&self.id)?,
            workflow_id: parse_uuid(&self.workflow_id)?,
            environment_id: parse_uuid(&self.environment_id)?,
            organization_id: parse_uuid(&self.organization_id)?,
            filter: parse_json(&self.filter, "filter")?,
            trigger_type,
            trigger,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

fn decode(row: &sqlx::sqlite::SqliteRow) -> Result<EventRule, RepositoryError> {
    EventRuleRow::from_row(row)
        .map_err(|e| RepositoryError::Query(e.to_string()))?
        .into_event_rule()
}

impl EventRuleRepository for SqliteEventRuleRepository {
    async fn upsert(&self, upsert: &EventRuleUpsert) -> Result<EventRule, RepositoryError> {
        let trigger_json = serde_json::to_string(&upsert.trigger)
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        let now = format_datetime(&Utc::now());

        let row = sqlx::query(
            r#"INSERT INTO event_rules (id, workflow_id, environment_id, organization_id, filter, trigger_type, trigger, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT (workflow_id, environment_id) DO UPDATE SET
                   filter = excluded.filter,
                   updated_at = excluded.updated_at
               RETURNING *"#,
        )
        .bind(Uuid::now_v7().to_string())
        .bind(upsert.workflow_id.to_string())
        .bind(upsert.environment_id.to_string())
        .bind(upsert.organization_id.to_string())
        .bind(upsert.trigger.filter().to_string())
        .bind(upsert.trigger.trigger_type().as_str())
        .bind(&trigger_json)
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool.writer)
        .await
        .map_err(|e| map_write_error(e, "event rule"))?;

        decode(&row)
    }

    async fn get(
        &self,
        workflow_id: &Uuid,
        environment_id: &Uuid,
    ) -> Result<Option<EventRule>, RepositoryError> {
        let row = sqlx::query(
            "SELECT * FROM event_rules WHERE workflow_id = ? AND environment_id = ?",
        )
        .bind(workflow_id.to_string())
        .bind(environment_id.to_string())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
        row.as_ref().map(decode).transpose()
    }
}
