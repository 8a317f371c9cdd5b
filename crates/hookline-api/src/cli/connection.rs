//! Provider connection commands.

use anyhow::Result;
use chrono::Utc;
use console::style;
use hookline_core::repository::connection::ConnectionRepository;
use hookline_types::source::{Connection, ConnectionStatus};
use secrecy::SecretString;
use uuid::Uuid;

use super::find_organization;
use crate::state::AppState;

/// Store a `CONNECTED` connection with its access token.
///
/// Tokens are stored as given; they are never refreshed.
pub async fn add_connection(
    state: &AppState,
    org: &str,
    provider: &str,
    token: String,
    json: bool,
) -> Result<()> {
    let organization = find_organization(state, org).await?;
    let connection = Connection {
        id: Uuid::now_v7(),
        organization_id: organization.id,
        provider: provider.to_string(),
        status: ConnectionStatus::Connected,
        created_at: Utc::now(),
    };
    state
        .connections
        .create(&connection, &SecretString::from(token))
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&connection)?);
    } else {
        println!(
            "  {} Connection to {} added for '{}' ({})",
            style("✓").green().bold(),
            style(provider).cyan(),
            organization.slug,
            style(connection.id).dim()
        );
    }
    Ok(())
}
