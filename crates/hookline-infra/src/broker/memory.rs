//! In-process message broker.
//!
//! Built on `tokio::sync::broadcast`: every subscriber sees every message.
//! Publishing with no active subscribers is a no-op. Delayed messages are
//! held on tracked timer tasks; [`InMemoryBroker::drain`] releases them early
//! and waits until every one has been sent.

use hookline_core::event::{BrokerMessage, MessageBroker, PublishOptions};
use hookline_types::error::BrokerError;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Multi-consumer broker for a single process.
///
/// Cloning the broker clones the sender and the pending-message tracker, so
/// clones publish to the same subscribers and drain together.
#[derive(Clone)]
pub struct InMemoryBroker {
    sender: broadcast::Sender<BrokerMessage>,
    pending: TaskTracker,
    flush: CancellationToken,
}

impl InMemoryBroker {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            pending: TaskTracker::new(),
            flush: CancellationToken::new(),
        }
    }

    /// Create a subscriber that receives all future messages.
    pub fn subscribe(&self) -> broadcast::Receiver<BrokerMessage> {
        self.sender.subscribe()
    }

    /// Send every delayed message now and wait until all are delivered.
    ///
    /// Used at shutdown. Messages published with a delay after a drain are
    /// sent immediately.
    pub async fn drain(&self) {
        self.flush.cancel();
        self.pending.close();
        self.pending.wait().await;
        tracing::debug!("broker drained pending messages");
    }

    fn send(sender: &broadcast::Sender<BrokerMessage>, message: BrokerMessage) {
        if sender.send(message).is_err() {
            tracing::debug!("broker message dropped, no subscribers");
        }
    }
}

impl MessageBroker for InMemoryBroker {
    async fn publish(
        &self,
        topic: &str,
        payload: Value,
        options: PublishOptions,
    ) -> Result<(), BrokerError> {
        let message = BrokerMessage {
            topic: topic.to_string(),
            payload,
        };

        match options.deliver_after {
            None => Self::send(&self.sender, message),
            Some(delay) => {
                let sender = self.sender.clone();
                let flush = self.flush.clone();
                tracing::debug!(
                    topic,
                    delay_ms = delay.as_millis() as u64,
                    "scheduling delayed message"
                );
                self.pending.spawn(async move {
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = flush.cancelled() => {}
                    }
                    Self::send(&sender, message);
                });
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBroker")
            .field("receiver_count", &self.sender.receiver_count())
            .field("pending", &self.pending.len())
            .finish()
    }
}
