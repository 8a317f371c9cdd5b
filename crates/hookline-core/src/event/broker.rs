//! Message broker port.

use std::time::Duration;

use hookline_types::error::BrokerError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Published after an external source is upserted. Payload: `{"id": <uuid>}`.
pub const EXTERNAL_SOURCE_UPSERTED: &str = "EXTERNAL_SOURCE_UPSERTED";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishOptions {
    /// Hold the message back for this long before delivering it.
    pub deliver_after: Option<Duration>,
}

impl PublishOptions {
    pub fn delayed(delay: Duration) -> Self {
        Self {
            deliver_after: (!delay.is_zero()).then_some(delay),
        }
    }
}

/// A message as seen by subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerMessage {
    pub topic: String,
    pub payload: Value,
}

/// Topic-based publish port.
///
/// Implementations decide the transport; delivery is at-least-once from the
/// publisher's point of view and a successful publish only means the message
/// was accepted.
pub trait MessageBroker: Send + Sync {
    fn publish(
        &self,
        topic: &str,
        payload: Value,
        options: PublishOptions,
    ) -> impl std::future::Future<Output = Result<(), BrokerError>> + Send;
}
