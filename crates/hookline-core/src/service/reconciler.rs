//! Trigger registration reconciler.
//!
//! Turns a workflow's declared trigger metadata into persisted state:
//! the workflow itself, an external source for provider webhooks, and the
//! event rule of the target environment. Every write is an upsert on the
//! entity's natural identity, so deploying the same workflow again converges
//! on the same rows.
//!
//! Provider-side registration is not done here. After an external source is
//! upserted, an `EXTERNAL_SOURCE_UPSERTED` notification is published from a
//! tracked background task and picked up by the registration worker.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use hookline_types::error::{ReconcileError, RepositoryError};
use hookline_types::source::ExternalSource;
use hookline_types::tenancy::{Organization, RuntimeEnvironment};
use hookline_types::trigger::{
    SELF_TRIGGER_SERVICE, TriggerMetadata, ValidationIssue, validate_workflow_metadata,
};
use hookline_types::workflow::WorkflowStatus;
use serde::Serialize;
use serde_json::{Value, json};
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use crate::event::{EXTERNAL_SOURCE_UPSERTED, MessageBroker, PublishOptions};
use crate::integration::IntegrationRegistry;
use crate::repository::connection::ConnectionRepository;
use crate::repository::event_rule::{EventRuleRepository, EventRuleUpsert};
use crate::repository::external_source::{ExternalSourceRepository, ExternalSourceUpsert};
use crate::repository::workflow::{WorkflowRepository, WorkflowUpsert};

/// Attempts per upsert before a `RepositoryError::Conflict` is surfaced.
pub const MAX_CONFLICT_ATTEMPTS: u32 = 3;

/// Default hold-back of the upsert notification.
pub const DEFAULT_NOTIFY_DELAY: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    Success { workflow_id: Uuid },
    /// The payload did not describe a valid workflow; nothing was written.
    ValidationError { issues: Vec<ValidationIssue> },
}

pub struct TriggerReconciler<W, E, C, R, B>
where
    W: WorkflowRepository,
    E: ExternalSourceRepository,
    C: ConnectionRepository,
    R: EventRuleRepository,
    B: MessageBroker + 'static,
{
    workflows: W,
    sources: E,
    connections: C,
    rules: R,
    broker: Arc<B>,
    registry: Arc<IntegrationRegistry>,
    notify_delay: Duration,
    notifications: TaskTracker,
}

impl<W, E, C, R, B> TriggerReconciler<W, E, C, R, B>
where
    W: WorkflowRepository,
    E: ExternalSourceRepository,
    C: ConnectionRepository,
    R: EventRuleRepository,
    B: MessageBroker + 'static,
{
    pub fn new(
        workflows: W,
        sources: E,
        connections: C,
        rules: R,
        broker: Arc<B>,
        registry: Arc<IntegrationRegistry>,
    ) -> Self {
        Self {
            workflows,
            sources,
            connections,
            rules,
            broker,
            registry,
            notify_delay: DEFAULT_NOTIFY_DELAY,
            notifications: TaskTracker::new(),
        }
    }

    pub fn with_notify_delay(mut self, delay: Duration) -> Self {
        self.notify_delay = delay;
        self
    }

    /// Reconcile the trigger metadata of workflow `slug` into `environment`.
    ///
    /// Steps, in order:
    /// 1. Validate the payload; failures are returned as an outcome and
    ///    nothing is written. A provider source document that its integration
    ///    rejects fails the call before any write.
    /// 2. Upsert the workflow (`READY` for self-triggered, else `CREATED`)
    /// 3. For a provider webhook: upsert the external source, link it to the
    ///    workflow and schedule the upsert notification
    /// 4. Upsert the environment's event rule
    pub async fn call(
        &self,
        slug: &str,
        raw_payload: &Value,
        organization: &Organization,
        environment: &RuntimeEnvironment,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let metadata = match validate_workflow_metadata(raw_payload) {
            Ok(metadata) => metadata,
            Err(issues) => {
                tracing::info!(slug, issues = issues.len(), "workflow metadata failed validation");
                return Ok(ReconcileOutcome::ValidationError { issues });
            }
        };
        let trigger = &metadata.trigger;

        // Source documents are checked before anything is written.
        let webhook_source = match trigger {
            TriggerMetadata::Webhook {
                service, source, ..
            } if service != SELF_TRIGGER_SERVICE => {
                let key = self.registry.key_for_source(service, source)?;
                Some((service.as_str(), source, key))
            }
            TriggerMetadata::Webhook { .. }
            | TriggerMetadata::CustomEvent { .. }
            | TriggerMetadata::HttpEndpoint { .. }
            | TriggerMetadata::Schedule { .. } => None,
        };

        let initial_status = if trigger.is_self_triggered() {
            WorkflowStatus::Ready
        } else {
            WorkflowStatus::Created
        };
        let workflow_upsert = WorkflowUpsert {
            organization_id: organization.id,
            slug: slug.to_string(),
            title: metadata.name.clone(),
            package: metadata.package.clone(),
            trigger_type: trigger.trigger_type(),
            initial_status,
        };
        let workflow =
            with_conflict_retry("workflow", || self.workflows.upsert(&workflow_upsert)).await?;

        if let Some((service, source, key)) = webhook_source {
            let external_source = self
                .upsert_external_source(organization, service, source, key)
                .await?;
            with_conflict_retry("workflow link", || {
                self.workflows
                    .link_external_source(&workflow.id, &external_source.id)
            })
            .await?;
            self.notify_upserted(external_source.id);
        }

        let rule_upsert = EventRuleUpsert {
            workflow_id: workflow.id,
            environment_id: environment.id,
            organization_id: organization.id,
            trigger: trigger.clone(),
        };
        with_conflict_retry("event rule", || self.rules.upsert(&rule_upsert)).await?;

        tracing::info!(
            workflow_id = %workflow.id,
            slug,
            trigger_type = %trigger.trigger_type(),
            environment = %environment.slug,
            "workflow trigger reconciled"
        );
        Ok(ReconcileOutcome::Success {
            workflow_id: workflow.id,
        })
    }

    async fn upsert_external_source(
        &self,
        organization: &Organization,
        service: &str,
        source: &Value,
        key: String,
    ) -> Result<ExternalSource, ReconcileError> {
        let connection = self
            .connections
            .find_latest_connected(&organization.id, service)
            .await?;

        let upsert = ExternalSourceUpsert {
            organization_id: organization.id,
            key,
            service: service.to_string(),
            source: source.clone(),
            connection_id: connection.map(|c| c.id),
            manual_registration: !self.registry.contains(service),
        };
        let external_source =
            with_conflict_retry("external source", || self.sources.upsert(&upsert)).await?;

        tracing::debug!(
            source_id = %external_source.id,
            service,
            key = %external_source.key,
            "external source upserted"
        );
        Ok(external_source)
    }

    /// Publish `EXTERNAL_SOURCE_UPSERTED` off the request path. A failed
    /// publish is logged and does not affect the reconcile result.
    fn notify_upserted(&self, external_source_id: Uuid) {
        let broker = Arc::clone(&self.broker);
        let options = PublishOptions::delayed(self.notify_delay);
        self.notifications.spawn(async move {
            let payload = json!({ "id": external_source_id });
            if let Err(e) = broker
                .publish(EXTERNAL_SOURCE_UPSERTED, payload, options)
                .await
            {
                tracing::error!(
                    source_id = %external_source_id,
                    error = %e,
                    "failed to publish external source notification"
                );
            }
        });
    }

    /// Wait for every notification scheduled so far to finish publishing.
    pub async fn drain_notifications(&self) {
        self.notifications.close();
        self.notifications.wait().await;
        self.notifications.reopen();
    }
}

async fn with_conflict_retry<T, F, Fut>(what: &str, mut op: F) -> Result<T, RepositoryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RepositoryError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(RepositoryError::Conflict(reason)) if attempt < MAX_CONFLICT_ATTEMPTS => {
                tracing::warn!(what, attempt, %reason, "upsert conflict, retrying");
                attempt += 1;
            }
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::BoxWebhookIntegration;
    use crate::repository::event_rule::EventRuleRepository;
    use crate::testing::{
        FakeIntegration, MemoryConnections, MemoryRules, MemorySources, MemoryWorkflows,
        RecordingBroker, environment, organization,
    };
    use hookline_types::source::ExternalSourceStatus;
    use hookline_types::trigger::TriggerType;

    struct Harness {
        workflows: MemoryWorkflows,
        sources: MemorySources,
        connections: MemoryConnections,
        rules: MemoryRules,
        broker: Arc<RecordingBroker>,
        reconciler: TriggerReconciler<
            MemoryWorkflows,
            MemorySources,
            MemoryConnections,
            MemoryRules,
            RecordingBroker,
        >,
    }

    fn harness_with(broker: RecordingBroker) -> Harness {
        let workflows = MemoryWorkflows::default();
        let sources = MemorySources::default();
        let connections = MemoryConnections::default();
        let rules = MemoryRules::default();
        let broker = Arc::new(broker);
        let registry = Arc::new(
            IntegrationRegistry::new(BoxWebhookIntegration::new(FakeIntegration::new("manual")))
                .with(BoxWebhookIntegration::new(FakeIntegration::new("github"))),
        );
        let reconciler = TriggerReconciler::new(
            workflows.clone(),
            sources.clone(),
            connections.clone(),
            rules.clone(),
            Arc::clone(&broker),
            registry,
        );
        Harness {
            workflows,
            sources,
            connections,
            rules,
            broker,
            reconciler,
        }
    }

    fn harness() -> Harness {
        harness_with(RecordingBroker::default())
    }

    fn github_payload(filter: Value) -> Value {
        json!({
            "name": "Issue triage",
            "package": {"name": "triage", "version": "1.0.0"},
            "trigger": {
                "type": "WEBHOOK",
                "service": "github",
                "name": "issues",
                "filter": filter,
                "source": {"key": "repository.acme/api", "events": ["issues"]}
            }
        })
    }

    fn custom_event_payload() -> Value {
        json!({
            "name": "Nightly digest",
            "trigger": {
                "type": "CUSTOM_EVENT",
                "service": "trigger",
                "name": "digest",
                "filter": {}
            }
        })
    }

    #[tokio::test]
    async fn test_self_triggered_workflow_is_ready_without_source() {
        let h = harness();
        let org = organization();
        let env = environment(&org);

        let outcome = h
            .reconciler
            .call("digest", &custom_event_payload(), &org, &env)
            .await
            .unwrap();
        h.reconciler.drain_notifications().await;

        let ReconcileOutcome::Success { workflow_id } = outcome else {
            panic!("expected success, got {outcome:?}");
        };
        let workflow = h.workflows.get_by_id(&workflow_id).await.unwrap().unwrap();
        assert_eq!(workflow.status, WorkflowStatus::Ready);
        assert_eq!(workflow.external_source_id, None);
        assert!(h.sources.rows.lock().unwrap().is_empty());
        assert!(h.broker.published.lock().unwrap().is_empty());
        let rule = h.rules.get(&workflow_id, &env.id).await.unwrap().unwrap();
        assert_eq!(rule.trigger_type, TriggerType::CustomEvent);
    }

    #[tokio::test]
    async fn test_webhook_creates_linked_source_and_notifies() {
        let h = harness();
        let org = organization();
        let env = environment(&org);
        let connection = h.connections.connected(&org, "github", "ghp_token");

        let outcome = h
            .reconciler
            .call("triage", &github_payload(json!({"action": ["opened"]})), &org, &env)
            .await
            .unwrap();
        h.reconciler.drain_notifications().await;

        let ReconcileOutcome::Success { workflow_id } = outcome else {
            panic!("expected success, got {outcome:?}");
        };
        let workflow = h.workflows.get_by_id(&workflow_id).await.unwrap().unwrap();
        assert_eq!(workflow.status, WorkflowStatus::Created);
        assert_eq!(workflow.trigger_type, TriggerType::Webhook);

        let sources = h.sources.rows.lock().unwrap().clone();
        assert_eq!(sources.len(), 1);
        let source = &sources[0];
        assert_eq!(source.key, "repository.acme/api");
        assert_eq!(source.status, ExternalSourceStatus::Created);
        assert_eq!(source.connection_id, Some(connection.id));
        assert!(!source.manual_registration);
        assert_eq!(workflow.external_source_id, Some(source.id));

        let published = h.broker.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, EXTERNAL_SOURCE_UPSERTED);
        assert_eq!(published[0].1, json!({"id": source.id}));
        assert_eq!(published[0].2.deliver_after, Some(DEFAULT_NOTIFY_DELAY));
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent_and_updates_filter_in_place() {
        let h = harness();
        let org = organization();
        let env = environment(&org);

        let first = h
            .reconciler
            .call("triage", &github_payload(json!({"action": ["opened"]})), &org, &env)
            .await
            .unwrap();
        let second = h
            .reconciler
            .call("triage", &github_payload(json!({"action": ["closed"]})), &org, &env)
            .await
            .unwrap();
        h.reconciler.drain_notifications().await;

        assert_eq!(first, second);
        assert_eq!(h.workflows.rows.lock().unwrap().len(), 1);
        assert_eq!(h.sources.rows.lock().unwrap().len(), 1);

        let rules = h.rules.rows.lock().unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].filter, json!({"action": ["closed"]}));
        // The stored trigger keeps its original metadata.
        assert_eq!(rules[0].trigger.filter(), &json!({"action": ["opened"]}));
    }

    #[tokio::test]
    async fn test_secret_is_stable_and_connection_backfilled() {
        let h = harness();
        let org = organization();
        let env = environment(&org);
        let payload = github_payload(json!({}));

        h.reconciler.call("triage", &payload, &org, &env).await.unwrap();
        let before = h.sources.rows.lock().unwrap()[0].clone();
        assert_eq!(before.connection_id, None);

        let connection = h.connections.connected(&org, "github", "ghp_token");
        h.reconciler.call("triage", &payload, &org, &env).await.unwrap();
        h.reconciler.drain_notifications().await;

        let after = h.sources.rows.lock().unwrap()[0].clone();
        assert_eq!(after.id, before.id);
        assert_eq!(after.secret, before.secret);
        assert_eq!(after.connection_id, Some(connection.id));
    }

    #[tokio::test]
    async fn test_unknown_service_falls_back_to_manual_source() {
        let h = harness();
        let org = organization();
        let env = environment(&org);
        let payload = json!({
            "name": "Inbound",
            "trigger": {
                "type": "WEBHOOK",
                "service": "provider-x",
                "name": "order.created",
                "filter": {},
                "source": {"key": "order.created", "event": "order.created"}
            }
        });

        h.reconciler.call("inbound", &payload, &org, &env).await.unwrap();
        h.reconciler.drain_notifications().await;

        let sources = h.sources.rows.lock().unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].key, "provider-x");
        assert!(sources[0].manual_registration);
    }

    #[tokio::test]
    async fn test_validation_error_writes_nothing() {
        let h = harness();
        let org = organization();
        let env = environment(&org);
        let payload = json!({"name": 3, "trigger": {"type": "CRON", "service": "trigger"}});

        let outcome = h.reconciler.call("broken", &payload, &org, &env).await.unwrap();

        let ReconcileOutcome::ValidationError { issues } = outcome else {
            panic!("expected validation error, got {outcome:?}");
        };
        assert!(issues.iter().any(|i| i.path == "name"));
        assert!(issues.iter().any(|i| i.path == "trigger.type"));
        assert!(h.workflows.rows.lock().unwrap().is_empty());
        assert!(h.rules.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_source_document_is_integration_error() {
        let h = harness();
        let org = organization();
        let env = environment(&org);
        let mut payload = github_payload(json!({}));
        payload["trigger"]["source"] = json!({"subresource": "team"});

        let err = h.reconciler.call("triage", &payload, &org, &env).await.unwrap_err();

        assert!(matches!(err, ReconcileError::Integration(_)));
        assert!(h.sources.rows.lock().unwrap().is_empty());
        assert!(h.workflows.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_service_with_malformed_source_fails_before_writes() {
        let h = harness();
        let org = organization();
        let env = environment(&org);
        let payload = json!({
            "name": "Inbound",
            "trigger": {
                "type": "WEBHOOK",
                "service": "provider-x",
                "name": "order.created",
                "filter": {},
                "source": {"foo": 1}
            }
        });

        let err = h.reconciler.call("inbound", &payload, &org, &env).await.unwrap_err();

        assert!(matches!(err, ReconcileError::Integration(_)));
        assert!(h.workflows.rows.lock().unwrap().is_empty());
        assert!(h.sources.rows.lock().unwrap().is_empty());
        assert!(h.rules.rows.lock().unwrap().is_empty());
        h.reconciler.drain_notifications().await;
        assert!(h.broker.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_conflict_is_retried() {
        let h = harness();
        let org = organization();
        let env = environment(&org);
        h.workflows.conflict_next(MAX_CONFLICT_ATTEMPTS - 1);

        let outcome = h
            .reconciler
            .call("digest", &custom_event_payload(), &org, &env)
            .await
            .unwrap();

        assert!(matches!(outcome, ReconcileOutcome::Success { .. }));
    }

    #[tokio::test]
    async fn test_conflict_surfaces_after_max_attempts() {
        let h = harness();
        let org = organization();
        let env = environment(&org);
        h.workflows.conflict_next(MAX_CONFLICT_ATTEMPTS);

        let err = h
            .reconciler
            .call("digest", &custom_event_payload(), &org, &env)
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::Storage(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_publish_failure_does_not_fail_reconcile() {
        let h = harness_with(RecordingBroker::failing());
        let org = organization();
        let env = environment(&org);

        let outcome = h
            .reconciler
            .call("triage", &github_payload(json!({})), &org, &env)
            .await
            .unwrap();
        h.reconciler.drain_notifications().await;

        assert!(matches!(outcome, ReconcileOutcome::Success { .. }));
        assert_eq!(h.sources.rows.lock().unwrap().len(), 1);
    }
}
