//! `hookline register`: reconcile workflow trigger metadata from a file.

use std::path::Path;

use anyhow::{Context, Result, bail};
use console::style;
use hookline_core::repository::external_source::ExternalSourceRepository;
use hookline_core::repository::workflow::WorkflowRepository;
use hookline_core::service::reconciler::ReconcileOutcome;
use hookline_core::service::registration::RegistrationResult;
use serde_json::{Value, json};

use super::{find_environment, find_organization};
use crate::state::AppState;

/// Reconcile the workflow, then try the provider registration right away.
///
/// The in-process broker does not outlive this command, so the webhook is
/// registered here instead of by a worker.
pub async fn register(
    state: &AppState,
    org: &str,
    env: &str,
    slug: &str,
    file: &Path,
    skip_registration: bool,
    json: bool,
) -> Result<()> {
    let organization = find_organization(state, org).await?;
    let environment = find_environment(state, &organization, env).await?;

    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let payload: Value = serde_json::from_str(&content)
        .with_context(|| format!("{} is not valid JSON", file.display()))?;

    let workflow_id = match state
        .reconciler
        .call(slug, &payload, &organization, &environment)
        .await?
    {
        ReconcileOutcome::Success { workflow_id } => workflow_id,
        ReconcileOutcome::ValidationError { issues } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&json!({ "issues": issues }))?);
            } else {
                eprintln!("  {} Invalid workflow metadata:", style("✗").red().bold());
                for issue in &issues {
                    let path = if issue.path.is_empty() { "<root>" } else { issue.path.as_str() };
                    eprintln!("    {} {}", style(path).yellow(), issue.message);
                }
            }
            bail!("workflow '{slug}' failed validation");
        }
    };
    state.reconciler.drain_notifications().await;

    let workflow = state
        .workflows
        .get_by_id(&workflow_id)
        .await?
        .with_context(|| format!("workflow {workflow_id} vanished after reconcile"))?;

    let registration = match workflow.external_source_id {
        Some(source_id) if !skip_registration => {
            Some(state.registrar.register_source(&source_id).await?)
        }
        _ => None,
    };

    if json {
        let registration = registration.as_ref().map(|r| match r {
            RegistrationResult::Registered { remote_id } => {
                json!({"status": "registered", "remote_id": remote_id})
            }
            RegistrationResult::Skipped { reason } => {
                json!({"status": "skipped", "reason": reason})
            }
            RegistrationResult::Failed { error } => json!({"status": "failed", "error": error}),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "workflow_id": workflow_id,
                "status": workflow.status,
                "external_source_id": workflow.external_source_id,
                "registration": registration,
            }))?
        );
        return Ok(());
    }

    println!(
        "  {} Workflow '{}' reconciled in {}/{} ({})",
        style("✓").green().bold(),
        style(slug).bold(),
        organization.slug,
        environment.slug,
        style(workflow_id).dim()
    );
    if let Some(source_id) = workflow.external_source_id {
        println!("    External source: {}", style(source_id).cyan());
        if let Some(source) = state.sources.get_by_id(&source_id).await? {
            println!(
                "    Callback URL:    {}",
                state.registrar.callback_url(&source.service, &source_id)
            );
        }
    }
    match registration {
        Some(RegistrationResult::Registered { remote_id }) => println!(
            "  {} Webhook registered at provider{}",
            style("✓").green().bold(),
            remote_id.map(|id| format!(" (id {id})")).unwrap_or_default()
        ),
        Some(RegistrationResult::Skipped { reason }) => {
            println!("  {} Registration skipped: {reason}", style("i").blue().bold())
        }
        Some(RegistrationResult::Failed { error }) => {
            println!("  {} Registration failed: {error}", style("✗").red().bold())
        }
        None => {}
    }
    Ok(())
}
