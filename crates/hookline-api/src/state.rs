//! Application state wiring all services together.
//!
//! AppState is the composition root: it opens the database, constructs the
//! one shared provider API client, builds the integration registry and pins
//! the generic core services to the concrete infra implementations.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use hookline_core::service::dispatcher::ExternalSourceDispatcher;
use hookline_core::service::reconciler::TriggerReconciler;
use hookline_core::service::registration::WebhookRegistrar;
use hookline_infra::broker::InMemoryBroker;
use hookline_infra::config::{load_global_config, resolve_data_dir};
use hookline_infra::integration::build_registry;
use hookline_infra::provider::ProviderApiClient;
use hookline_infra::sqlite::connection::SqliteConnectionRepository;
use hookline_infra::sqlite::event_rule::SqliteEventRuleRepository;
use hookline_infra::sqlite::event_sink::SqliteEventSink;
use hookline_infra::sqlite::external_source::SqliteExternalSourceRepository;
use hookline_infra::sqlite::pool::{DatabasePool, database_url};
use hookline_infra::sqlite::tenancy::{SqliteEnvironmentRepository, SqliteOrganizationRepository};
use hookline_infra::sqlite::workflow::SqliteWorkflowRepository;
use hookline_types::config::GlobalConfig;

/// Broadcast buffer of the in-process broker.
const BROKER_CAPACITY: usize = 1024;

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteReconciler = TriggerReconciler<
    SqliteWorkflowRepository,
    SqliteExternalSourceRepository,
    SqliteConnectionRepository,
    SqliteEventRuleRepository,
    InMemoryBroker,
>;

pub type ConcreteDispatcher = ExternalSourceDispatcher<SqliteEventSink>;

pub type ConcreteRegistrar = WebhookRegistrar<
    SqliteExternalSourceRepository,
    SqliteConnectionRepository,
    SqliteWorkflowRepository,
>;

/// Shared application state. Used by both CLI commands and HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub organizations: Arc<SqliteOrganizationRepository>,
    pub environments: Arc<SqliteEnvironmentRepository>,
    pub sources: Arc<SqliteExternalSourceRepository>,
    pub connections: Arc<SqliteConnectionRepository>,
    pub workflows: Arc<SqliteWorkflowRepository>,
    pub reconciler: Arc<ConcreteReconciler>,
    pub dispatcher: Arc<ConcreteDispatcher>,
    pub registrar: Arc<ConcreteRegistrar>,
    pub broker: Arc<InMemoryBroker>,
    pub config: Arc<GlobalConfig>,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Initialize the application state: resolve the data directory, load
    /// `config.toml`, connect to the database and wire services.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let config = load_global_config(&data_dir).await;
        let db_pool = DatabasePool::new(&database_url(&data_dir))
            .await
            .context("failed to open database")?;

        Self::from_parts(db_pool, config, data_dir)
    }

    /// Wire services over an already opened database.
    pub fn from_parts(
        db_pool: DatabasePool,
        config: GlobalConfig,
        data_dir: PathBuf,
    ) -> anyhow::Result<Self> {
        let client = Arc::new(
            ProviderApiClient::new(Duration::from_secs(config.http_timeout_secs))
                .context("failed to build provider API client")?,
        );
        let registry = Arc::new(build_registry(client, &config));
        let broker = Arc::new(InMemoryBroker::new(BROKER_CAPACITY));

        let reconciler = TriggerReconciler::new(
            SqliteWorkflowRepository::new(db_pool.clone()),
            SqliteExternalSourceRepository::new(db_pool.clone()),
            SqliteConnectionRepository::new(db_pool.clone()),
            SqliteEventRuleRepository::new(db_pool.clone()),
            Arc::clone(&broker),
            Arc::clone(&registry),
        )
        .with_notify_delay(Duration::from_secs(config.registration_delay_secs));

        let registrar = WebhookRegistrar::new(
            SqliteExternalSourceRepository::new(db_pool.clone()),
            SqliteConnectionRepository::new(db_pool.clone()),
            SqliteWorkflowRepository::new(db_pool.clone()),
            Arc::clone(&registry),
            config.public_url.clone(),
        );

        let dispatcher =
            ExternalSourceDispatcher::new(registry, SqliteEventSink::new(db_pool.clone()));

        Ok(Self {
            organizations: Arc::new(SqliteOrganizationRepository::new(db_pool.clone())),
            environments: Arc::new(SqliteEnvironmentRepository::new(db_pool.clone())),
            sources: Arc::new(SqliteExternalSourceRepository::new(db_pool.clone())),
            connections: Arc::new(SqliteConnectionRepository::new(db_pool.clone())),
            workflows: Arc::new(SqliteWorkflowRepository::new(db_pool)),
            reconciler: Arc::new(reconciler),
            dispatcher: Arc::new(dispatcher),
            registrar: Arc::new(registrar),
            broker,
            config: Arc::new(config),
            data_dir,
        })
    }
}

#[cfg(test)]
pub(crate) async fn test_state() -> AppState {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
    let pool = DatabasePool::new(&url).await.unwrap();
    let data_dir = dir.path().to_path_buf();
    // Leak tempdir so it lives for the test
    std::mem::forget(dir);
    let config = GlobalConfig {
        registration_delay_secs: 0,
        ..GlobalConfig::default()
    };
    AppState::from_parts(pool, config, data_dir).unwrap()
}
