//! Registration worker.
//!
//! Consumes `EXTERNAL_SOURCE_UPSERTED` notifications and creates the webhook
//! at the provider. This is the only component that moves an external
//! source to `CONNECTED` or `FAILED` and its workflows to `READY`.

use std::sync::Arc;

use hookline_types::error::RepositoryError;
use hookline_types::source::ExternalSourceStatus;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::event::{BrokerMessage, EXTERNAL_SOURCE_UPSERTED};
use crate::integration::{IntegrationRegistry, WebhookRegistrationConfig};
use crate::repository::connection::ConnectionRepository;
use crate::repository::external_source::ExternalSourceRepository;
use crate::repository::workflow::WorkflowRepository;

/// What happened to one registration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationResult {
    Registered { remote_id: Option<String> },
    Skipped { reason: String },
    /// The provider refused; the source is now `FAILED`.
    Failed { error: String },
}

pub struct WebhookRegistrar<E, C, W>
where
    E: ExternalSourceRepository,
    C: ConnectionRepository,
    W: WorkflowRepository,
{
    sources: E,
    connections: C,
    workflows: W,
    registry: Arc<IntegrationRegistry>,
    public_url: String,
}

impl<E, C, W> WebhookRegistrar<E, C, W>
where
    E: ExternalSourceRepository,
    C: ConnectionRepository,
    W: WorkflowRepository,
{
    pub fn new(
        sources: E,
        connections: C,
        workflows: W,
        registry: Arc<IntegrationRegistry>,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            sources,
            connections,
            workflows,
            registry,
            public_url: public_url.into(),
        }
    }

    /// `{public_url}/api/v1/webhooks/{service}/{id}`
    pub fn callback_url(&self, service: &str, external_source_id: &Uuid) -> String {
        format!(
            "{}/api/v1/webhooks/{}/{}",
            self.public_url.trim_end_matches('/'),
            service,
            external_source_id
        )
    }

    /// Register the webhook of one external source at its provider.
    ///
    /// Sources that are missing, already connected, manually registered, or
    /// lack a usable connection are skipped. A provider refusal marks the
    /// source `FAILED` and is reported in the result, not as an error.
    pub async fn register_source(
        &self,
        external_source_id: &Uuid,
    ) -> Result<RegistrationResult, RepositoryError> {
        let Some(source) = self.sources.get_by_id(external_source_id).await? else {
            return Ok(skipped(external_source_id, "external source not found"));
        };
        if source.status == ExternalSourceStatus::Connected {
            return Ok(skipped(external_source_id, "already connected"));
        }
        if source.manual_registration {
            return Ok(skipped(external_source_id, "registered manually by its owner"));
        }
        let Some(integration) = self.registry.get(&source.service) else {
            return Ok(skipped(external_source_id, "no integration for service"));
        };
        let Some(connection_id) = source.connection_id else {
            return Ok(skipped(external_source_id, "no provider connection"));
        };
        let Some(access_token) = self.connections.access_token(&connection_id).await? else {
            return Ok(skipped(external_source_id, "connection has no access token"));
        };
        let Some(secret) = source.secret.clone() else {
            return Ok(skipped(external_source_id, "external source has no secret"));
        };

        let config = WebhookRegistrationConfig::json(
            self.callback_url(&source.service, &source.id),
            secret,
            access_token,
        );

        match integration.register_webhook(&config, &source.source).await {
            Ok(registration) => {
                self.sources
                    .update_status(&source.id, ExternalSourceStatus::Connected)
                    .await?;
                let ready = self.workflows.mark_ready_for_source(&source.id).await?;
                tracing::info!(
                    source_id = %source.id,
                    service = %source.service,
                    remote_id = ?registration.remote_id,
                    workflows_ready = ready,
                    "webhook registered"
                );
                Ok(RegistrationResult::Registered {
                    remote_id: registration.remote_id,
                })
            }
            Err(e) => {
                self.sources
                    .update_status(&source.id, ExternalSourceStatus::Failed)
                    .await?;
                tracing::error!(
                    source_id = %source.id,
                    service = %source.service,
                    error = %e,
                    "webhook registration failed"
                );
                Ok(RegistrationResult::Failed {
                    error: e.to_string(),
                })
            }
        }
    }

    /// Consume broker messages until `cancel` fires or the channel closes.
    ///
    /// Messages already queued on the receiver when `cancel` fires are still
    /// handled before the worker stops.
    pub async fn run(
        &self,
        mut messages: broadcast::Receiver<BrokerMessage>,
        cancel: CancellationToken,
    ) {
        tracing::info!("registration worker started");
        loop {
            tokio::select! {
                biased;
                received = messages.recv() => match received {
                    Ok(message) => self.handle_message(&message).await,
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "registration worker lagged behind broker");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = cancel.cancelled() => {
                    self.handle_queued(&mut messages).await;
                    break;
                }
            }
        }
        tracing::info!("registration worker stopped");
    }

    async fn handle_queued(&self, messages: &mut broadcast::Receiver<BrokerMessage>) {
        loop {
            match messages.try_recv() {
                Ok(message) => self.handle_message(&message).await,
                Err(TryRecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "registration worker lagged behind broker");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }

    async fn handle_message(&self, message: &BrokerMessage) {
        if message.topic != EXTERNAL_SOURCE_UPSERTED {
            return;
        }
        let Some(id) = message
            .payload
            .get("id")
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())
        else {
            tracing::warn!(payload = %message.payload, "malformed external source notification");
            return;
        };

        match self.register_source(&id).await {
            Ok(result) => {
                tracing::debug!(source_id = %id, ?result, "registration attempt finished");
            }
            Err(e) => {
                tracing::error!(source_id = %id, error = %e, "registration attempt failed");
            }
        }
    }
}

fn skipped(external_source_id: &Uuid, reason: &str) -> RegistrationResult {
    tracing::info!(source_id = %external_source_id, reason, "skipping webhook registration");
    RegistrationResult::Skipped {
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::BoxWebhookIntegration;
    use crate::repository::workflow::WorkflowUpsert;
    use crate::testing::{
        FakeIntegration, MemoryConnections, MemorySources, MemoryWorkflows, organization,
        webhook_source,
    };
    use hookline_types::source::ExternalSource;
    use hookline_types::trigger::TriggerType;
    use hookline_types::workflow::WorkflowStatus;
    use secrecy::ExposeSecret;
    use serde_json::json;
    use std::sync::Mutex;

    struct Harness {
        sources: MemorySources,
        connections: MemoryConnections,
        workflows: MemoryWorkflows,
        calls: Arc<Mutex<Vec<WebhookRegistrationConfig>>>,
        registrar: WebhookRegistrar<MemorySources, MemoryConnections, MemoryWorkflows>,
    }

    fn harness(github: FakeIntegration) -> Harness {
        let sources = MemorySources::default();
        let connections = MemoryConnections::default();
        let workflows = MemoryWorkflows::default();
        let calls = github.registrations();
        let registry = Arc::new(
            IntegrationRegistry::new(BoxWebhookIntegration::new(FakeIntegration::new("manual")))
                .with(BoxWebhookIntegration::new(github)),
        );
        let registrar = WebhookRegistrar::new(
            sources.clone(),
            connections.clone(),
            workflows.clone(),
            registry,
            "https://hooks.example.com/",
        );
        Harness {
            sources,
            connections,
            workflows,
            calls,
            registrar,
        }
    }

    /// A connected GitHub source with one linked workflow.
    async fn seed(h: &Harness) -> (ExternalSource, Uuid) {
        let org = organization();
        let connection = h.connections.connected(&org, "github", "ghp_token");
        let mut source = webhook_source(&org, "github", false);
        source.connection_id = Some(connection.id);
        h.sources.insert(source.clone());

        let workflow = h
            .workflows
            .upsert(&WorkflowUpsert {
                organization_id: org.id,
                slug: "triage".to_string(),
                title: "Triage".to_string(),
                package: json!({}),
                trigger_type: TriggerType::Webhook,
                initial_status: WorkflowStatus::Created,
            })
            .await
            .unwrap();
        h.workflows
            .link_external_source(&workflow.id, &source.id)
            .await
            .unwrap();
        (source, workflow.id)
    }

    #[tokio::test]
    async fn test_successful_registration_connects_source_and_readies_workflows() {
        let h = harness(FakeIntegration::new("github"));
        let (source, workflow_id) = seed(&h).await;

        let result = h.registrar.register_source(&source.id).await.unwrap();

        assert_eq!(
            result,
            RegistrationResult::Registered { remote_id: Some("1".to_string()) }
        );
        assert_eq!(h.sources.status_of(&source.id), Some(ExternalSourceStatus::Connected));
        let workflow = h.workflows.get_by_id(&workflow_id).await.unwrap().unwrap();
        assert_eq!(workflow.status, WorkflowStatus::Ready);

        let calls = h.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].callback_url,
            format!("https://hooks.example.com/api/v1/webhooks/github/{}", source.id)
        );
        assert_eq!(calls[0].secret, "s3cr3t");
        assert_eq!(calls[0].access_token.expose_secret(), "ghp_token");
        assert_eq!(calls[0].content_type, "json");
        assert!(calls[0].verify_ssl);
    }

    #[tokio::test]
    async fn test_provider_refusal_marks_source_failed() {
        let h = harness(FakeIntegration::new("github").failing_registration());
        let (source, workflow_id) = seed(&h).await;

        let result = h.registrar.register_source(&source.id).await.unwrap();

        assert!(matches!(result, RegistrationResult::Failed { .. }));
        assert_eq!(h.sources.status_of(&source.id), Some(ExternalSourceStatus::Failed));
        let workflow = h.workflows.get_by_id(&workflow_id).await.unwrap().unwrap();
        assert_eq!(workflow.status, WorkflowStatus::Created);
    }

    #[tokio::test]
    async fn test_connected_and_manual_sources_are_skipped() {
        let h = harness(FakeIntegration::new("github"));
        let org = organization();

        let mut connected = webhook_source(&org, "github", false);
        connected.status = ExternalSourceStatus::Connected;
        h.sources.insert(connected.clone());
        let manual = webhook_source(&org, "provider-x", true);
        h.sources.insert(manual.clone());

        for id in [connected.id, manual.id, Uuid::now_v7()] {
            let result = h.registrar.register_source(&id).await.unwrap();
            assert!(matches!(result, RegistrationResult::Skipped { .. }));
        }
        assert!(h.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_source_without_connection_is_skipped() {
        let h = harness(FakeIntegration::new("github"));
        let source = webhook_source(&organization(), "github", false);
        h.sources.insert(source.clone());

        let result = h.registrar.register_source(&source.id).await.unwrap();

        assert_eq!(
            result,
            RegistrationResult::Skipped { reason: "no provider connection".to_string() }
        );
        assert_eq!(h.sources.status_of(&source.id), Some(ExternalSourceStatus::Created));
    }

    #[tokio::test]
    async fn test_run_consumes_notifications_until_channel_closes() {
        let h = harness(FakeIntegration::new("github"));
        let (source, _) = seed(&h).await;
        let (tx, rx) = broadcast::channel(8);

        tx.send(BrokerMessage {
            topic: "SOMETHING_ELSE".to_string(),
            payload: json!({"id": source.id}),
        })
        .unwrap();
        tx.send(BrokerMessage {
            topic: EXTERNAL_SOURCE_UPSERTED.to_string(),
            payload: json!({"id": source.id}),
        })
        .unwrap();
        drop(tx);

        h.registrar.run(rx, CancellationToken::new()).await;

        assert_eq!(h.calls.lock().unwrap().len(), 1);
        assert_eq!(h.sources.status_of(&source.id), Some(ExternalSourceStatus::Connected));
    }

    #[tokio::test]
    async fn test_run_stops_on_cancellation() {
        let h = harness(FakeIntegration::new("github"));
        let (_tx, rx) = broadcast::channel::<BrokerMessage>(8);
        let cancel = CancellationToken::new();
        cancel.cancel();

        h.registrar.run(rx, cancel).await;
    }

    #[tokio::test]
    async fn test_queued_notifications_are_handled_after_cancellation() {
        let h = harness(FakeIntegration::new("github"));
        let (source, workflow_id) = seed(&h).await;
        let (tx, rx) = broadcast::channel(8);
        tx.send(BrokerMessage {
            topic: EXTERNAL_SOURCE_UPSERTED.to_string(),
            payload: json!({"id": source.id}),
        })
        .unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        h.registrar.run(rx, cancel).await;

        assert_eq!(h.calls.lock().unwrap().len(), 1);
        assert_eq!(h.sources.status_of(&source.id), Some(ExternalSourceStatus::Connected));
        let workflow = h.workflows.get_by_id(&workflow_id).await.unwrap().unwrap();
        assert_eq!(workflow.status, WorkflowStatus::Ready);
        drop(tx);
    }
}
