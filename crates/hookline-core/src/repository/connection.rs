//! Provider connection repository trait definition.

use hookline_types::error::RepositoryError;
use hookline_types::source::Connection;
use secrecy::SecretString;
use uuid::Uuid;

/// Repository trait for provider connections and their access tokens.
pub trait ConnectionRepository: Send + Sync {
    /// Store a connection together with its access token.
    fn create(
        &self,
        connection: &Connection,
        access_token: &SecretString,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// The most recently created `CONNECTED` connection of the organization
    /// for the given provider.
    fn find_latest_connected(
        &self,
        organization_id: &Uuid,
        provider: &str,
    ) -> impl std::future::Future<Output = Result<Option<Connection>, RepositoryError>> + Send;

    /// Read the access token of a connection.
    fn access_token(
        &self,
        connection_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<SecretString>, RepositoryError>> + Send;
}
