//! Hookline CLI and HTTP server entry point.
//!
//! Binary name: `hookline`
//!
//! Parses CLI arguments, initializes tracing, the database and services,
//! then dispatches to the command handler or starts the server.

mod cli;
mod http;
mod state;

use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use cli::{Cli, Commands, ConnectionCommand, EnvCommand, OrgCommand, SourcesCommand};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn,hookline=info",
        1 => "info,hookline=debug",
        _ => "trace",
    };
    hookline_observe::init_tracing(filter, cli.log_format.into(), cli.otel)
        .map_err(|e| anyhow::anyhow!(e))?;

    let state = AppState::init().await?;

    let result = run(cli, state).await;
    hookline_observe::shutdown_tracing();
    result
}

async fn run(cli: Cli, state: AppState) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve { port, host } => serve(state, &host, port).await?,

        Commands::Org { action } => match action {
            OrgCommand::Create { slug } => {
                cli::tenancy::create_organization(&state, &slug, cli.json).await?;
            }
        },

        Commands::Env { action } => match action {
            EnvCommand::Create { org, slug } => {
                cli::tenancy::create_environment(&state, &org, &slug, cli.json).await?;
            }
        },

        Commands::Connection { action } => match action {
            ConnectionCommand::Add {
                org,
                provider,
                token,
            } => {
                cli::connection::add_connection(&state, &org, &provider, token, cli.json).await?;
            }
        },

        Commands::Register {
            org,
            env,
            slug,
            file,
            no_register,
        } => {
            cli::workflow::register(&state, &org, &env, &slug, &file, no_register, cli.json).await?;
        }

        Commands::Sources { action } => match action {
            SourcesCommand::List { org } => {
                cli::source::list_sources(&state, &org, cli.json).await?;
            }
        },
    }

    Ok(())
}

/// Serve HTTP and run the registration worker until Ctrl+C or SIGTERM.
async fn serve(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let cancel = CancellationToken::new();
    let worker = {
        let registrar = Arc::clone(&state.registrar);
        let messages = state.broker.subscribe();
        let cancel = cancel.clone();
        tokio::spawn(async move { registrar.run(messages, cancel).await })
    };

    println!(
        "  {} Hookline listening on {}",
        console::style("⚡").bold(),
        console::style(format!("http://{addr}")).cyan()
    );
    println!(
        "  {} {}",
        console::style("Callbacks:").dim(),
        console::style(format!("{}/api/v1/webhooks/...", state.config.public_url)).dim()
    );
    println!(
        "  {} {}",
        console::style("Data:     ").dim(),
        console::style(state.data_dir.display()).dim()
    );
    println!("  {}", console::style("Press Ctrl+C to stop").dim());

    let reconciler = Arc::clone(&state.reconciler);
    let broker = Arc::clone(&state.broker);
    let router = http::router::build_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Flush held-back notifications into the worker's queue, then stop it;
    // the worker handles what is queued before exiting.
    reconciler.drain_notifications().await;
    broker.drain().await;
    cancel.cancel();
    worker.await?;

    println!("\n  Server stopped.");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
