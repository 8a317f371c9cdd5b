//! Organization and runtime environment repository traits.

use hookline_types::error::RepositoryError;
use hookline_types::tenancy::{Organization, RuntimeEnvironment};
use uuid::Uuid;

pub trait OrganizationRepository: Send + Sync {
    /// Create an organization. A duplicate slug is `RepositoryError::Conflict`.
    fn create(
        &self,
        organization: &Organization,
    ) -> impl std::future::Future<Output = Result<Organization, RepositoryError>> + Send;

    fn get_by_id(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Organization>, RepositoryError>> + Send;

    fn get_by_slug(
        &self,
        slug: &str,
    ) -> impl std::future::Future<Output = Result<Option<Organization>, RepositoryError>> + Send;
}

pub trait EnvironmentRepository: Send + Sync {
    /// Create an environment. A duplicate slug within the organization is
    /// `RepositoryError::Conflict`.
    fn create(
        &self,
        environment: &RuntimeEnvironment,
    ) -> impl std::future::Future<Output = Result<RuntimeEnvironment, RepositoryError>> + Send;

    fn get_by_slug(
        &self,
        organization_id: &Uuid,
        slug: &str,
    ) -> impl std::future::Future<Output = Result<Option<RuntimeEnvironment>, RepositoryError>>
    + Send;
}
