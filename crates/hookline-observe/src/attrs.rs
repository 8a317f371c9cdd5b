//! Span and event field names shared across crates.
//!
//! Field names are written as identifiers at each call site
//! (`source_id = %id`); these constants are the canonical spelling. Span
//! names are passed to `info_span!` directly.

/// Id of the external source a delivery or registration belongs to.
pub const SOURCE_ID: &str = "source_id";

/// Provider service name (e.g. "github", "whatsapp", "provider-x").
pub const SERVICE: &str = "service";

/// Provider-assigned delivery id, or the generated event id.
pub const DELIVERY_ID: &str = "delivery_id";

pub const WORKFLOW_ID: &str = "workflow_id";

// --- Span names ---

pub const SPAN_DISPATCH: &str = "webhook.dispatch";

pub const SPAN_RECONCILE: &str = "trigger.reconcile";

pub const SPAN_REGISTER: &str = "webhook.register";
