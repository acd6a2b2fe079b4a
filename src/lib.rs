//! EventPulse - Event Lifecycle Reconciler
//!
//! Periodically scans a host's events and closes every `Live` event whose
//! live window has elapsed, then invalidates the host's cached event views
//! so dashboards re-fetch.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): event model, lifecycle rules, ports
//! - **Adapters** (`adapters`): `SQLite` event store and the moka view cache
//! - **Service Layer** (`services`): reconciliation pass, daemon, supervisor
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use eventpulse::services::{DaemonConfig, ReconcilerSupervisor};
//!
//! let supervisor = ReconcilerSupervisor::new(reconciler, DaemonConfig::default());
//! let events = supervisor.activate(host_id).await;
//! // ...
//! supervisor.deactivate().await;
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{Config, Event, EventId, EventStatus, HostId};
pub use domain::ports::{Clock, EventRepository, ViewInvalidator, ViewKey};
pub use domain::{DomainError, DomainResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{LifecycleReconciler, PassReport, ReconcilerSupervisor};
