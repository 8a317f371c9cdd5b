//! Organization and environment commands.

use anyhow::Result;
use console::style;
use hookline_core::repository::tenancy::{EnvironmentRepository, OrganizationRepository};
use hookline_types::tenancy::{Organization, RuntimeEnvironment};

use super::find_organization;
use crate::state::AppState;

pub async fn create_organization(state: &AppState, slug: &str, json: bool) -> Result<()> {
    let organization = state.organizations.create(&Organization::new(slug)).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&organization)?);
    } else {
        println!(
            "  {} Organization '{}' created ({})",
            style("✓").green().bold(),
            style(&organization.slug).bold(),
            style(organization.id).dim()
        );
    }
    Ok(())
}

pub async fn create_environment(state: &AppState, org: &str, slug: &str, json: bool) -> Result<()> {
    let organization = find_organization(state, org).await?;
    let environment = state
        .environments
        .create(&RuntimeEnvironment::new(organization.id, slug))
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&environment)?);
    } else {
        println!(
            "  {} Environment '{}' created in '{}'",
            style("✓").green().bold(),
            style(&environment.slug).bold(),
            organization.slug
        );
    }
    Ok(())
}
