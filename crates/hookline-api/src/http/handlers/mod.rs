//! HTTP request handlers.

pub mod health;
pub mod webhook;
pub mod workflow;
