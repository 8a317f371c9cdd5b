//! In-memory fakes of the core ports, shared by the unit tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use hookline_types::error::{BrokerError, IngestError, IntegrationError, RepositoryError};
use hookline_types::event::CanonicalEvent;
use hookline_types::request::NormalizedRequest;
use hookline_types::source::{
    Connection, ConnectionStatus, ExternalSource, ExternalSourceStatus, ExternalSourceType,
};
use hookline_types::tenancy::{Organization, RuntimeEnvironment};
use hookline_types::webhook::{WebhookOutcome, WebhookRegistration};
use hookline_types::workflow::{EventRule, Workflow, WorkflowStatus};
use secrecy::SecretString;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::event::{EventSink, MessageBroker, PublishOptions};
use crate::integration::{WebhookIntegration, WebhookRegistrationConfig};
use crate::repository::connection::ConnectionRepository;
use crate::repository::event_rule::{EventRuleRepository, EventRuleUpsert};
use crate::repository::external_source::{ExternalSourceRepository, ExternalSourceUpsert};
use crate::repository::workflow::{WorkflowRepository, WorkflowUpsert};

pub fn organization() -> Organization {
    Organization::new("acme")
}

pub fn environment(organization: &Organization) -> RuntimeEnvironment {
    RuntimeEnvironment::new(organization.id, "dev")
}

pub fn webhook_source(organization: &Organization, service: &str, manual: bool) -> ExternalSource {
    let now = Utc::now();
    ExternalSource {
        id: Uuid::now_v7(),
        organization_id: organization.id,
        key: service.to_string(),
        source_type: ExternalSourceType::Webhook,
        service: service.to_string(),
        source: json!({}),
        secret: Some("s3cr3t".to_string()),
        status: ExternalSourceStatus::Created,
        connection_id: None,
        manual_registration: manual,
        created_at: now,
        updated_at: now,
    }
}

// ---------------------------------------------------------------------------
// Integration
// ---------------------------------------------------------------------------

/// Keys sources by their `"key"` field and echoes the body as one event.
pub struct FakeIntegration {
    service: String,
    outcome: Option<WebhookOutcome>,
    fail_registration: bool,
    registrations: Arc<Mutex<Vec<WebhookRegistrationConfig>>>,
}

impl FakeIntegration {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
            outcome: None,
            fail_registration: false,
            registrations: Arc::default(),
        }
    }

    pub fn with_outcome(mut self, outcome: WebhookOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn failing_registration(mut self) -> Self {
        self.fail_registration = true;
        self
    }

    pub fn registrations(&self) -> Arc<Mutex<Vec<WebhookRegistrationConfig>>> {
        Arc::clone(&self.registrations)
    }
}

impl WebhookIntegration for FakeIntegration {
    fn service(&self) -> &str {
        &self.service
    }

    fn key_for_source(&self, source: &Value) -> Result<String, IntegrationError> {
        source
            .get("key")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| IntegrationError::InvalidSource {
                service: self.service.clone(),
                reason: "missing key".to_string(),
            })
    }

    async fn register_webhook(
        &self,
        config: &WebhookRegistrationConfig,
        _source: &Value,
    ) -> Result<WebhookRegistration, IntegrationError> {
        self.registrations.lock().unwrap().push(config.clone());
        if self.fail_registration {
            return Err(IntegrationError::ProviderApi {
                status: 422,
                status_text: "Unprocessable Entity".to_string(),
            });
        }
        Ok(WebhookRegistration {
            remote_id: Some("1".to_string()),
            response: json!({"id": 1}),
        })
    }

    fn handle_webhook_request(
        &self,
        request: &NormalizedRequest,
        _external_source: &ExternalSource,
    ) -> WebhookOutcome {
        match &self.outcome {
            Some(outcome) => outcome.clone(),
            None => WebhookOutcome::Ok(vec![CanonicalEvent::generated(
                self.service.clone(),
                request.body().clone(),
            )]),
        }
    }
}

// ---------------------------------------------------------------------------
// Repositories
// ---------------------------------------------------------------------------

fn conflict_pending(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[derive(Clone, Default)]
pub struct MemoryWorkflows {
    pub rows: Arc<Mutex<Vec<Workflow>>>,
    pub conflicts: Arc<AtomicU32>,
}

impl MemoryWorkflows {
    /// Fail the next `n` upserts with `RepositoryError::Conflict`.
    pub fn conflict_next(&self, n: u32) {
        self.conflicts.store(n, Ordering::SeqCst);
    }
}

impl WorkflowRepository for MemoryWorkflows {
    async fn upsert(&self, upsert: &WorkflowUpsert) -> Result<Workflow, RepositoryError> {
        if conflict_pending(&self.conflicts) {
            return Err(RepositoryError::Conflict("workflows".to_string()));
        }
        let mut rows = self.rows.lock().unwrap();
        let now = Utc::now();
        if let Some(row) = rows
            .iter_mut()
            .find(|w| w.organization_id == upsert.organization_id && w.slug == upsert.slug)
        {
            row.title = upsert.title.clone();
            row.package = upsert.package.clone();
            row.trigger_type = upsert.trigger_type;
            row.updated_at = now;
            return Ok(row.clone());
        }
        let workflow = Workflow {
            id: Uuid::now_v7(),
            organization_id: upsert.organization_id,
            slug: upsert.slug.clone(),
            title: upsert.title.clone(),
            package: upsert.package.clone(),
            trigger_type: upsert.trigger_type,
            status: upsert.initial_status,
            external_source_id: None,
            created_at: now,
            updated_at: now,
        };
        rows.push(workflow.clone());
        Ok(workflow)
    }

    async fn get_by_id(&self, id: &Uuid) -> Result<Option<Workflow>, RepositoryError> {
        Ok(self.rows.lock().unwrap().iter().find(|w| &w.id == id).cloned())
    }

    async fn get_by_slug(
        &self,
        organization_id: &Uuid,
        slug: &str,
    ) -> Result<Option<Workflow>, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|w| &w.organization_id == organization_id && w.slug == slug)
            .cloned())
    }

    async fn link_external_source(
        &self,
        workflow_id: &Uuid,
        external_source_id: &Uuid,
    ) -> Result<(), RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|w| &w.id == workflow_id)
            .ok_or(RepositoryError::NotFound)?;
        row.external_source_id = Some(*external_source_id);
        Ok(())
    }

    async fn mark_ready_for_source(
        &self,
        external_source_id: &Uuid,
    ) -> Result<u64, RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        let mut updated = 0;
        for row in rows
            .iter_mut()
            .filter(|w| w.external_source_id.as_ref() == Some(external_source_id))
        {
            row.status = WorkflowStatus::Ready;
            updated += 1;
        }
        Ok(updated)
    }
}

#[derive(Clone, Default)]
pub struct MemorySources {
    pub rows: Arc<Mutex<Vec<ExternalSource>>>,
}

impl MemorySources {
    pub fn insert(&self, source: ExternalSource) {
        self.rows.lock().unwrap().push(source);
    }

    pub fn status_of(&self, id: &Uuid) -> Option<ExternalSourceStatus> {
        self.rows.lock().unwrap().iter().find(|s| &s.id == id).map(|s| s.status)
    }
}

impl ExternalSourceRepository for MemorySources {
    async fn upsert(
        &self,
        upsert: &ExternalSourceUpsert,
    ) -> Result<ExternalSource, RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        let now = Utc::now();
        if let Some(row) = rows
            .iter_mut()
            .find(|s| s.organization_id == upsert.organization_id && s.key == upsert.key)
        {
            row.source = upsert.source.clone();
            if row.connection_id.is_none() {
                row.connection_id = upsert.connection_id;
            }
            row.updated_at = now;
            return Ok(row.clone());
        }
        let source = ExternalSource {
            id: Uuid::now_v7(),
            organization_id: upsert.organization_id,
            key: upsert.key.clone(),
            source_type: ExternalSourceType::Webhook,
            service: upsert.service.clone(),
            source: upsert.source.clone(),
            secret: Some(Uuid::new_v4().simple().to_string()),
            status: ExternalSourceStatus::Created,
            connection_id: upsert.connection_id,
            manual_registration: upsert.manual_registration,
            created_at: now,
            updated_at: now,
        };
        rows.push(source.clone());
        Ok(source)
    }

    async fn get_by_id(&self, id: &Uuid) -> Result<Option<ExternalSource>, RepositoryError> {
        Ok(self.rows.lock().unwrap().iter().find(|s| &s.id == id).cloned())
    }

    async fn list(&self, organization_id: &Uuid) -> Result<Vec<ExternalSource>, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|s| &s.organization_id == organization_id)
            .cloned()
            .collect())
    }

    async fn update_status(
        &self,
        id: &Uuid,
        status: ExternalSourceStatus,
    ) -> Result<(), RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|s| &s.id == id)
            .ok_or(RepositoryError::NotFound)?;
        row.status = status;
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryConnections {
    pub rows: Arc<Mutex<Vec<(Connection, String)>>>,
}

impl MemoryConnections {
    pub fn connected(
        &self,
        organization: &Organization,
        provider: &str,
        token: &str,
    ) -> Connection {
        let connection = Connection {
            id: Uuid::now_v7(),
            organization_id: organization.id,
            provider: provider.to_string(),
            status: ConnectionStatus::Connected,
            created_at: Utc::now(),
        };
        self.rows
            .lock()
            .unwrap()
            .push((connection.clone(), token.to_string()));
        connection
    }
}

impl ConnectionRepository for MemoryConnections {
    async fn create(
        &self,
        connection: &Connection,
        access_token: &SecretString,
    ) -> Result<(), RepositoryError> {
        use secrecy::ExposeSecret;
        self.rows
            .lock()
            .unwrap()
            .push((connection.clone(), access_token.expose_secret().to_string()));
        Ok(())
    }

    async fn find_latest_connected(
        &self,
        organization_id: &Uuid,
        provider: &str,
    ) -> Result<Option<Connection>, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .rev()
            .map(|(c, _)| c)
            .find(|c| {
                &c.organization_id == organization_id
                    && c.provider == provider
                    && c.status == ConnectionStatus::Connected
            })
            .cloned())
    }

    async fn access_token(
        &self,
        connection_id: &Uuid,
    ) -> Result<Option<SecretString>, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|(c, _)| &c.id == connection_id)
            .map(|(_, token)| SecretString::from(token.clone())))
    }
}

#[derive(Clone, Default)]
pub struct MemoryRules {
    pub rows: Arc<Mutex<Vec<EventRule>>>,
}

impl EventRuleRepository for MemoryRules {
    async fn upsert(&self, upsert: &EventRuleUpsert) -> Result<EventRule, RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        let now = Utc::now();
        if let Some(row) = rows.iter_mut().find(|r| {
            r.workflow_id == upsert.workflow_id && r.environment_id == upsert.environment_id
        }) {
            row.filter = upsert.trigger.filter().clone();
            row.updated_at = now;
            return Ok(row.clone());
        }
        let rule = EventRule {
            id: Uuid::now_v7(),
            workflow_id: upsert.workflow_id,
            environment_id: upsert.environment_id,
            organization_id: upsert.organization_id,
            filter: upsert.trigger.filter().clone(),
            trigger_type: upsert.trigger.trigger_type(),
            trigger: upsert.trigger.clone(),
            created_at: now,
            updated_at: now,
        };
        rows.push(rule.clone());
        Ok(rule)
    }

    async fn get(
        &self,
        workflow_id: &Uuid,
        environment_id: &Uuid,
    ) -> Result<Option<EventRule>, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| &r.workflow_id == workflow_id && &r.environment_id == environment_id)
            .cloned())
    }
}

// ---------------------------------------------------------------------------
// Broker and sink
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct RecordingBroker {
    pub published: Arc<Mutex<Vec<(String, Value, PublishOptions)>>>,
    pub fail: bool,
}

impl RecordingBroker {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

impl MessageBroker for RecordingBroker {
    async fn publish(
        &self,
        topic: &str,
        payload: Value,
        options: PublishOptions,
    ) -> Result<(), BrokerError> {
        if self.fail {
            return Err(BrokerError::Publish {
                topic: topic.to_string(),
                reason: "broker unavailable".to_string(),
            });
        }
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), payload, options));
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct RecordingSink {
    pub events: Arc<Mutex<Vec<(CanonicalEvent, String)>>>,
    /// Fail the ingest call with this zero-based index.
    pub fail_at: Option<usize>,
    calls: Arc<AtomicU32>,
}

impl RecordingSink {
    pub fn failing_at(index: usize) -> Self {
        Self {
            fail_at: Some(index),
            ..Self::default()
        }
    }
}

impl EventSink for RecordingSink {
    async fn ingest(
        &self,
        event: &CanonicalEvent,
        service: &str,
        _organization: &Organization,
    ) -> Result<(), IngestError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
        if self.fail_at == Some(call) {
            return Err(IngestError::Storage {
                event_id: event.id.clone(),
                reason: "disk full".to_string(),
            });
        }
        self.events
            .lock()
            .unwrap()
            .push((event.clone(), service.to_string()));
        Ok(())
    }
}
