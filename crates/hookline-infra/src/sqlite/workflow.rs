//! SQLite workflow repository.

use chrono::Utc;
use hookline_core::repository::workflow::{WorkflowRepository, WorkflowUpsert};
use hookline_types::error::RepositoryError;
use hookline_types::trigger::TriggerType;
use hookline_types::workflow::{Workflow, WorkflowStatus};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, map_write_error, parse_datetime, parse_json, parse_uuid};

pub struct SqliteWorkflowRepository {
    pool: DatabasePool,
}

impl SqliteWorkflowRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct WorkflowRow {
    id: String,
    organization_id: String,
    slug: String,
    title: String,
    package: String,
    trigger_type: String,
    status: String,
    external_source_id: Option<String>,
    created_at: String,
    updated_at: String,
}

impl WorkflowRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            organization_id: row.try_get("organization_id")?,
            slug: row.try_get("slug")?,
            title: row.try_get("title")?,
            package: row.try_get("package")?,
            trigger_type: row.try_get("trigger_type")?,
            status: row.try_get("status")?,
            external_source_id: row.try_get("external_source_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_workflow(self) -> Result<Workflow, RepositoryError> {
        let trigger_type: TriggerType = self.trigger_type.parse().map_err(RepositoryError::Query)?;
        let status: WorkflowStatus = self.status.parse().map_err(RepositoryError::Query)?;
        Ok(Workflow {
            id: parse_uuid(&self.id)?,
            organization_id: parse_uuid(&self.organization_id)?,
            slug: self.slug,
            title: self.title,
            package: parse_json(&self.package, "package")?,
            trigger_type,
            status,
            external_source_id: self
                .external_source_id
                .as_deref()
                .map(parse_uuid)
                .transpose()?,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

fn decode(row: &sqlx::sqlite::SqliteRow) -> Result<Workflow, RepositoryError> {
    WorkflowRow::from_row(row)
        .map_err(|e| RepositoryError::Query(e.to_string()))?
        .into_workflow()
}

impl WorkflowRepository for SqliteWorkflowRepository {
    async fn upsert(&self, upsert: &WorkflowUpsert) -> Result<Workflow, RepositoryError> {
        let now = format_datetime(&Utc::now());
        let row = sqlx::query(
            r#"INSERT INTO workflows (id, organization_id, slug, title, package, trigger_type, status, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT (organization_id, slug) DO UPDATE SET
                   title = excluded.title,
                   package = excluded.package,
                   trigger_type = excluded.trigger_type,
                   updated_at = excluded.updated_at
               RETURNING *"#,
        )
        .bind(Uuid::now_v7().to_string())
        .bind(upsert.organization_id.to_string())
        .bind(&upsert.slug)
        .bind(&upsert.title)
        .bind(upsert.package.to_string())
        .bind(upsert.trigger_type.as_str())
        .bind(upsert.initial_status.as_str())
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool.writer)
        .await
        .map_err(|e| map_write_error(e, &format!("workflow '{}'", upsert.slug)))?;

        decode(&row)
    }

    async fn get_by_id(&self, id: &Uuid) -> Result<Option<Workflow>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM workflows WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        row.as_ref().map(decode).transpose()
    }

    async fn get_by_slug(
        &self,
        organization_id: &Uuid,
        slug: &str,
    ) -> Result<Option<Workflow>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM workflows WHERE organization_id = ? AND slug = ?")
            .bind(organization_id.to_string())
            .bind(slug)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        row.as_ref().map(decode).transpose()
    }

    async fn link_external_source(
        &self,
        workflow_id: &Uuid,
        external_source_id: &Uuid,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE workflows SET external_source_id = ?, updated_at = ? WHERE id = ?",
        )
        .bind(external_source_id.to_string())
        .bind(format_datetime(&Utc::now()))
        .bind(workflow_id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn mark_ready_for_source(
        &self,
        external_source_id: &Uuid,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE workflows SET status = 'READY', updated_at = ? WHERE external_source_id = ? AND status != 'READY'",
        )
        .bind(format_datetime(&Utc::now()))
        .bind(external_source_id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(result.rows_affected())
    }
}
