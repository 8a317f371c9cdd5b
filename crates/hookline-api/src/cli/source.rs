//! External source listing.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use hookline_core::repository::external_source::ExternalSourceRepository;
use hookline_types::source::ExternalSourceStatus;

use super::find_organization;
use crate::state::AppState;

pub async fn list_sources(state: &AppState, org: &str, json: bool) -> Result<()> {
    let organization = find_organization(state, org).await?;
    let sources = state.sources.list(&organization.id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sources)?);
        return Ok(());
    }

    if sources.is_empty() {
        println!();
        println!(
            "  {} No external sources. Register a webhook workflow with: {}",
            style("i").blue().bold(),
            style("hookline register --org <org> --env <env> <slug> <file>").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("ID").fg(Color::White),
        Cell::new("Service").fg(Color::White),
        Cell::new("Key").fg(Color::White),
        Cell::new("Status").fg(Color::White),
        Cell::new("Registration").fg(Color::White),
        Cell::new("Updated").fg(Color::White),
    ]);

    for source in &sources {
        let status_color = match source.status {
            ExternalSourceStatus::Connected => Color::Green,
            ExternalSourceStatus::Created => Color::Yellow,
            ExternalSourceStatus::Failed => Color::Red,
        };
        table.add_row(vec![
            Cell::new(source.id.to_string()).fg(Color::DarkGrey),
            Cell::new(&source.service).fg(Color::Cyan),
            Cell::new(&source.key),
            Cell::new(source.status.as_str()).fg(status_color),
            Cell::new(if source.manual_registration { "manual" } else { "provider" }),
            Cell::new(source.updated_at.format("%Y-%m-%d %H:%M").to_string()).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} source{}",
        style(sources.len()).bold(),
        if sources.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}
