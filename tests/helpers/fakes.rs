//! In-memory port implementations with call accounting.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use eventpulse::domain::errors::{DomainError, DomainResult};
use eventpulse::domain::models::{Event, EventId, EventStatus, HostId};
use eventpulse::domain::ports::{EventFilter, EventRepository, ViewInvalidator, ViewKey};

/// Event store kept in memory. Listing can be slowed down to hold a pass
/// in flight.
#[derive(Default)]
pub struct InMemoryEventRepository {
    events: Mutex<HashMap<EventId, Event>>,
    list_calls: Mutex<HashMap<HostId, usize>>,
    updates: Mutex<Vec<(EventId, EventStatus)>>,
    list_delay: Option<Duration>,
}

impl InMemoryEventRepository {
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            events: Mutex::new(events.into_iter().map(|e| (e.id, e)).collect()),
            ..Self::default()
        }
    }

    pub fn with_list_delay(mut self, delay: Duration) -> Self {
        self.list_delay = Some(delay);
        self
    }

    /// Number of open-event fetches issued for `host`.
    pub fn list_calls(&self, host: &HostId) -> usize {
        self.list_calls.lock().unwrap().get(host).copied().unwrap_or(0)
    }

    pub fn total_list_calls(&self) -> usize {
        self.list_calls.lock().unwrap().values().sum()
    }

    pub fn updates(&self) -> Vec<(EventId, EventStatus)> {
        self.updates.lock().unwrap().clone()
    }

    pub fn status_of(&self, id: EventId) -> Option<EventStatus> {
        self.events.lock().unwrap().get(&id).map(|e| e.status)
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn insert(&self, event: &Event) -> DomainResult<()> {
        self.events.lock().unwrap().insert(event.id, event.clone());
        Ok(())
    }

    async fn get(&self, id: EventId) -> DomainResult<Option<Event>> {
        Ok(self.events.lock().unwrap().get(&id).cloned())
    }

    async fn list(&self, filter: EventFilter) -> DomainResult<Vec<Event>> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .values()
            .filter(|e| filter.host_id.as_ref().map_or(true, |h| &e.host_id == h))
            .filter(|e| filter.statuses.is_empty() || filter.statuses.contains(&e.status))
            .cloned()
            .collect())
    }

    async fn list_by_host_and_status(
        &self,
        host_id: &HostId,
        statuses: &[EventStatus],
    ) -> DomainResult<Vec<Event>> {
        *self.list_calls.lock().unwrap().entry(host_id.clone()).or_default() += 1;

        if let Some(delay) = self.list_delay {
            tokio::time::sleep(delay).await;
        }

        Ok(self
            .events
            .lock()
            .unwrap()
            .values()
            .filter(|e| &e.host_id == host_id && statuses.contains(&e.status))
            .cloned()
            .collect())
    }

    async fn update_status(&self, id: EventId, status: EventStatus) -> DomainResult<()> {
        let mut events = self.events.lock().unwrap();
        let event = events.get_mut(&id).ok_or(DomainError::EventNotFound(id))?;
        event.status = status;
        self.updates.lock().unwrap().push((id, status));
        Ok(())
    }

    async fn delete(&self, id: EventId) -> DomainResult<()> {
        self.events
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or(DomainError::EventNotFound(id))
    }
}

/// Records every invalidation signal.
#[derive(Default)]
pub struct RecordingInvalidator {
    keys: Mutex<Vec<ViewKey>>,
}

impl RecordingInvalidator {
    pub fn keys(&self) -> Vec<ViewKey> {
        self.keys.lock().unwrap().clone()
    }
}

#[async_trait]
impl ViewInvalidator for RecordingInvalidator {
    async fn invalidate(&self, key: &ViewKey) {
        self.keys.lock().unwrap().push(key.clone());
    }
}
