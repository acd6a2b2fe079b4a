//! Domain layer for EventPulse
//!
//! Event models, domain errors, and the ports the reconciler depends on.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
