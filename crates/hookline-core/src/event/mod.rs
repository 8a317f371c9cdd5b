//! Event plumbing ports: the message broker used for upsert notifications
//! and the sink that receives canonical events.

pub mod broker;
pub mod sink;

pub use broker::{BrokerMessage, EXTERNAL_SOURCE_UPSERTED, MessageBroker, PublishOptions};
pub use sink::EventSink;
