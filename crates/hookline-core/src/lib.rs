//! Business logic and port definitions for Hookline.
//!
//! This crate defines the repository traits, the message broker and
//! ingestion sink ports, and the webhook-integration capability that the
//! infrastructure layer implements. It depends only on `hookline-types`,
//! never on `hookline-infra` or any database/IO crate.

pub mod event;
pub mod integration;
pub mod repository;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;
