//! Infrastructure layer for Hookline.
//!
//! Contains implementations of the ports defined in `hookline-core`:
//! SQLite storage and ingestion, HMAC signature verification, the GitHub,
//! WhatsApp and manual webhook integrations, the outbound provider API
//! client, and the in-process message broker.

pub mod broker;
pub mod config;
pub mod integration;
pub mod provider;
pub mod sqlite;
pub mod webhook;
