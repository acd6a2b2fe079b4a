//! Port trait definitions (Hexagonal Architecture)
//!
//! Interfaces the reconciler depends on abstractly:
//! - EventRepository: backend event store (owner/status query, point status update)
//! - ViewInvalidator: tells cached views of a host's events they are stale
//! - Clock: wall-clock source, replaceable in tests

pub mod clock;
pub mod event_repository;
pub mod view_invalidator;

pub use clock::{Clock, FixedClock, SystemClock};
pub use event_repository::{EventFilter, EventRepository};
pub use view_invalidator::{NullViewInvalidator, ViewInvalidator, ViewKey, ViewName};
