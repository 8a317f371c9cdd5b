//! Repository trait definitions (ports).
//!
//! These traits define the storage interface that the infrastructure layer
//! (hookline-infra) implements. Every write that establishes an entity is an
//! upsert on the entity's natural identity, so repeated reconciles converge on
//! the same rows instead of duplicating them.

pub mod connection;
pub mod event_rule;
pub mod external_source;
pub mod tenancy;
pub mod workflow;
