//! CLI command definitions for the `hookline` binary.
//!
//! Uses clap derive macros. Commands follow a noun-verb pattern
//! (`hookline org create`, `hookline sources list`).

pub mod connection;
pub mod source;
pub mod tenancy;
pub mod workflow;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use hookline_core::repository::tenancy::{EnvironmentRepository, OrganizationRepository};
use hookline_types::tenancy::{Organization, RuntimeEnvironment};

use crate::state::AppState;

/// Webhook ingestion and trigger registration engine.
#[derive(Parser)]
#[command(name = "hookline", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log line format.
    #[arg(long, value_enum, default_value_t = LogFormatArg::Pretty, global = true)]
    pub log_format: LogFormatArg,

    /// Also export spans through OpenTelemetry (stdout exporter).
    #[arg(long, env = "HOOKLINE_OTEL", global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for hookline_observe::LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => hookline_observe::LogFormat::Pretty,
            LogFormatArg::Json => hookline_observe::LogFormat::Json,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server and the registration worker.
    Serve {
        /// Port to listen on.
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Manage organizations.
    Org {
        #[command(subcommand)]
        action: OrgCommand,
    },

    /// Manage runtime environments.
    Env {
        #[command(subcommand)]
        action: EnvCommand,
    },

    /// Manage provider connections.
    Connection {
        #[command(subcommand)]
        action: ConnectionCommand,
    },

    /// Reconcile a workflow's trigger metadata from a JSON file.
    Register {
        /// Organization slug.
        #[arg(long)]
        org: String,

        /// Environment slug.
        #[arg(long)]
        env: String,

        /// Workflow slug.
        slug: String,

        /// Path to the workflow metadata JSON (`name`, `package`, `trigger`).
        file: PathBuf,

        /// Skip the immediate provider registration attempt.
        #[arg(long)]
        no_register: bool,
    },

    /// Inspect external sources.
    Sources {
        #[command(subcommand)]
        action: SourcesCommand,
    },
}

#[derive(Subcommand)]
pub enum OrgCommand {
    /// Create an organization.
    Create {
        /// URL-safe organization slug.
        slug: String,
    },
}

#[derive(Subcommand)]
pub enum EnvCommand {
    /// Create a runtime environment in an organization.
    Create {
        /// Organization slug.
        #[arg(long)]
        org: String,

        /// Environment slug (e.g. "dev", "live").
        slug: String,
    },
}

#[derive(Subcommand)]
pub enum ConnectionCommand {
    /// Store a provider access token for an organization.
    Add {
        /// Organization slug.
        #[arg(long)]
        org: String,

        /// Provider service name (e.g. "github", "whatsapp").
        provider: String,

        /// Access token. Read from HOOKLINE_ACCESS_TOKEN when omitted.
        #[arg(long, env = "HOOKLINE_ACCESS_TOKEN", hide_env_values = true)]
        token: String,
    },
}

#[derive(Subcommand)]
pub enum SourcesCommand {
    /// List the external sources of an organization.
    #[command(alias = "ls")]
    List {
        /// Organization slug.
        #[arg(long)]
        org: String,
    },
}

/// Look up an organization by slug or fail with a readable message.
pub async fn find_organization(state: &AppState, slug: &str) -> anyhow::Result<Organization> {
    state
        .organizations
        .get_by_slug(slug)
        .await?
        .with_context(|| format!("organization '{slug}' not found"))
}

pub async fn find_environment(
    state: &AppState,
    organization: &Organization,
    slug: &str,
) -> anyhow::Result<RuntimeEnvironment> {
    state
        .environments
        .get_by_slug(&organization.id, slug)
        .await?
        .with_context(|| format!("environment '{slug}' not found in '{}'", organization.slug))
}
