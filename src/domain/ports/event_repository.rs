use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Event, EventId, EventStatus, HostId};

/// Filters for listing events
#[derive(Default, Debug, Clone)]
pub struct EventFilter {
    pub host_id: Option<HostId>,
    /// Status set membership; empty means any status
    pub statuses: Vec<EventStatus>,
    pub limit: Option<i64>,
}

/// Repository port for event persistence
///
/// Storage is non-transactional across calls: concurrent writers resolve by
/// last-write-wins.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Insert a new event
    async fn insert(&self, event: &Event) -> DomainResult<()>;

    /// Get an event by ID
    async fn get(&self, id: EventId) -> DomainResult<Option<Event>>;

    /// List events with optional filters, most recent start first
    async fn list(&self, filter: EventFilter) -> DomainResult<Vec<Event>>;

    /// Events owned by `host_id` whose status is one of `statuses`
    ///
    /// An empty `statuses` slice matches nothing.
    async fn list_by_host_and_status(
        &self,
        host_id: &HostId,
        statuses: &[EventStatus],
    ) -> DomainResult<Vec<Event>>;

    /// Set a single event's status
    ///
    /// Re-setting the current status succeeds. Returns `EventNotFound` for an
    /// unknown id.
    async fn update_status(&self, id: EventId, status: EventStatus) -> DomainResult<()>;

    /// Delete an event by ID
    async fn delete(&self, id: EventId) -> DomainResult<()>;
}
