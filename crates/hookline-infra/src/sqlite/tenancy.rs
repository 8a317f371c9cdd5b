//! SQLite organization and runtime environment repositories.

use hookline_core::repository::tenancy::{EnvironmentRepository, OrganizationRepository};
use hookline_types::error::RepositoryError;
use hookline_types::tenancy::{Organization, RuntimeEnvironment};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, map_write_error, parse_datetime, parse_uuid};

pub struct SqliteOrganizationRepository {
    pool: DatabasePool,
}

impl SqliteOrganizationRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn organization_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Organization, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Query(e.to_string()))?;
    let slug: String = row.try_get("slug").map_err(|e| RepositoryError::Query(e.to_string()))?;
    let created_at: String = row
        .try_get("created_at")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    Ok(Organization {
        id: parse_uuid(&id)?,
        slug,
        created_at: parse_datetime(&created_at)?,
    })
}

impl OrganizationRepository for SqliteOrganizationRepository {
    async fn create(&self, organization: &Organization) -> Result<Organization, RepositoryError> {
        sqlx::query("INSERT INTO organizations (id, slug, created_at) VALUES (?, ?, ?)")
            .bind(organization.id.to_string())
            .bind(&organization.slug)
            .bind(format_datetime(&organization.created_at))
            .execute(&self.pool.writer)
            .await
            .map_err(|e| map_write_error(e, &format!("organization '{}'", organization.slug)))?;
        Ok(organization.clone())
    }

    async fn get_by_id(&self, id: &Uuid) -> Result<Option<Organization>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM organizations WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        row.as_ref().map(organization_from_row).transpose()
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Organization>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM organizations WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        row.as_ref().map(organization_from_row).transpose()
    }
}

pub struct SqliteEnvironmentRepository {
    pool: DatabasePool,
}

impl SqliteEnvironmentRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn environment_from_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<RuntimeEnvironment, RepositoryError> {
    let get = |col: &str| -> Result<String, RepositoryError> {
        row.try_get(col).map_err(|e| RepositoryError::Query(e.to_string()))
    };
    Ok(RuntimeEnvironment {
        id: parse_uuid(&get("id")?)?,
        organization_id: parse_uuid(&get("organization_id")?)?,
        slug: get("slug")?,
        created_at: parse_datetime(&get("created_at")?)?,
    })
}

impl EnvironmentRepository for SqliteEnvironmentRepository {
    async fn create(
        &self,
        environment: &RuntimeEnvironment,
    ) -> Result<RuntimeEnvironment, RepositoryError> {
        sqlx::query(
            "INSERT INTO runtime_environments (id, organization_id, slug, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(environment.id.to_string())
        .bind(environment.organization_id.to_string())
        .bind(&environment.slug)
        .bind(format_datetime(&environment.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| map_write_error(e, &format!("environment '{}'", environment.slug)))?;
        Ok(environment.clone())
    }

    async fn get_by_slug(
        &self,
        organization_id: &Uuid,
        slug: &str,
    ) -> Result<Option<RuntimeEnvironment>, RepositoryError> {
        let row = sqlx::query(
            "SELECT * FROM runtime_environments WHERE organization_id = ? AND slug = ?",
        )
        .bind(organization_id.to_string())
        .bind(slug)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
        row.as_ref().map(environment_from_row).transpose()
    }
}
