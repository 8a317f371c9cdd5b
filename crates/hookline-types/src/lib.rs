//! Shared domain types for Hookline.
//!
//! Trigger metadata, the persisted entities (workflows, external sources,
//! connections, event rules), canonical events, normalized inbound requests,
//! and the error types shared by every layer.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod event;
pub mod request;
pub mod source;
pub mod tenancy;
pub mod trigger;
pub mod webhook;
pub mod workflow;
