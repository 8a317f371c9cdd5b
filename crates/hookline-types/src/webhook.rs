//! Results exchanged with provider webhook integrations.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::CanonicalEvent;

/// What an integration made of one inbound delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookOutcome {
    /// Verified and normalized; events are listed in provider order.
    Ok(Vec<CanonicalEvent>),
    /// Deliberately not handled. Not a failure.
    Ignored { reason: String },
    /// Verification or parsing failed; the delivery must be rejected.
    Error { message: String },
}

impl WebhookOutcome {
    pub fn ignored(reason: impl Into<String>) -> Self {
        WebhookOutcome::Ignored {
            reason: reason.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        WebhookOutcome::Error {
            message: message.into(),
        }
    }
}

/// The provider's record of a webhook created by a registration call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookRegistration {
    /// Provider-assigned identifier, when the provider returns one.
    pub remote_id: Option<String>,
    /// The provider's full response body.
    pub response: Value,
}
