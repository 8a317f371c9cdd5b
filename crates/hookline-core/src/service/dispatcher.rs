//! External source dispatcher.
//!
//! Routes one inbound delivery for a persisted external source to the
//! integration that handles it and forwards the resulting canonical events
//! to the ingestion sink.

use std::sync::Arc;

use hookline_types::error::DispatchError;
use hookline_types::request::{NormalizedRequest, RawRequest};
use hookline_types::source::{ExternalSource, ExternalSourceType};
use hookline_types::tenancy::Organization;
use hookline_types::webhook::WebhookOutcome;
use serde::Serialize;

use crate::event::EventSink;
use crate::integration::IntegrationRegistry;

/// Successful result of a dispatch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// Every event was forwarded, in provider order.
    Ingested { event_ids: Vec<String> },
    /// The delivery was deliberately not handled.
    Ignored { reason: String },
}

pub struct ExternalSourceDispatcher<S: EventSink> {
    registry: Arc<IntegrationRegistry>,
    sink: S,
}

impl<S: EventSink> ExternalSourceDispatcher<S> {
    pub fn new(registry: Arc<IntegrationRegistry>, sink: S) -> Self {
        Self { registry, sink }
    }

    /// Handle one inbound delivery.
    ///
    /// Only `WEBHOOK` sources are handled. Events are forwarded one at a
    /// time; the first ingestion failure aborts the remaining events and is
    /// returned. Events already forwarded stay forwarded.
    pub async fn call(
        &self,
        external_source: &ExternalSource,
        organization: &Organization,
        service: &str,
        raw: RawRequest,
    ) -> Result<DispatchOutcome, DispatchError> {
        let request = NormalizedRequest::from_raw(raw);

        if let ExternalSourceType::Unsupported(other) = &external_source.source_type {
            tracing::error!(
                source_id = %external_source.id,
                source_type = %other,
                "unsupported external source type"
            );
            return Err(DispatchError::UnsupportedSourceType(other.clone()));
        }

        let outcome = match self
            .registry
            .resolve(service, external_source.manual_registration)
        {
            Some(integration) => integration.handle_webhook_request(&request, external_source),
            None => WebhookOutcome::ignored(format!(
                "Could not handle external source with unsupported service: {service}"
            )),
        };

        match outcome {
            WebhookOutcome::Ok(events) => {
                let mut event_ids = Vec::with_capacity(events.len());
                for event in &events {
                    self.sink.ingest(event, service, organization).await?;
                    event_ids.push(event.id.clone());
                }
                tracing::debug!(
                    source_id = %external_source.id,
                    service,
                    count = event_ids.len(),
                    "forwarded webhook events"
                );
                Ok(DispatchOutcome::Ingested { event_ids })
            }
            WebhookOutcome::Ignored { reason } => {
                tracing::info!(
                    source_id = %external_source.id,
                    service,
                    %reason,
                    "webhook ignored"
                );
                Ok(DispatchOutcome::Ignored { reason })
            }
            WebhookOutcome::Error { message } => {
                tracing::warn!(
                    source_id = %external_source.id,
                    service,
                    %message,
                    "webhook rejected"
                );
                Err(DispatchError::Rejected(message))
            }
        }
    }
}
