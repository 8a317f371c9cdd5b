//! Event rule repository trait definition.

use hookline_types::error::RepositoryError;
use hookline_types::trigger::TriggerMetadata;
use hookline_types::workflow::EventRule;
use uuid::Uuid;

/// Input of an event rule upsert keyed by `(workflow_id, environment_id)`.
#[derive(Debug, Clone)]
pub struct EventRuleUpsert {
    pub workflow_id: Uuid,
    pub environment_id: Uuid,
    pub organization_id: Uuid,
    pub trigger: TriggerMetadata,
}

/// Repository trait for event rule persistence.
pub trait EventRuleRepository: Send + Sync {
    /// Insert the rule with the trigger's filter, type and metadata, or
    /// update only `filter` on the existing row.
    fn upsert(
        &self,
        upsert: &EventRuleUpsert,
    ) -> impl std::future::Future<Output = Result<EventRule, RepositoryError>> + Send;

    fn get(
        &self,
        workflow_id: &Uuid,
        environment_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<EventRule>, RepositoryError>> + Send;
}
