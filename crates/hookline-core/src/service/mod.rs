//! Services orchestrating the ports: inbound dispatch, trigger
//! reconciliation and provider-side webhook registration.

pub mod dispatcher;
pub mod reconciler;
pub mod registration;
