//! Cached wrapper for EventRepository using moka TTL cache.
//!
//! Caches `list_by_host_and_status` results per `(host, events)` view and
//! status set. This is the client-side query cache the reconciler signals:
//! `invalidate((host, events))` drops every cached list for that host and
//! publishes the key to subscribers so they can re-fetch.

use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use crate::domain::errors::DomainResult;
use crate::domain::models::{CacheConfig, Event, EventId, EventStatus, HostId};
use crate::domain::ports::{EventFilter, EventRepository, ViewInvalidator, ViewKey};

/// Capacity of the invalidation broadcast channel.
const INVALIDATION_CHANNEL_CAPACITY: usize = 64;

type ListKey = (ViewKey, Vec<EventStatus>);

/// Cached event repository decorator.
pub struct CachedEventRepository<R: EventRepository> {
    inner: Arc<R>,
    lists: Cache<ListKey, Arc<Vec<Event>>>,
    invalidations: broadcast::Sender<ViewKey>,
}

impl<R: EventRepository> CachedEventRepository<R> {
    /// Create a cached repository with the given cache settings.
    pub fn new(inner: Arc<R>, config: &CacheConfig) -> Self {
        Self::with_ttl(inner, config.ttl(), config.max_capacity)
    }

    /// Create with custom TTL and capacity.
    pub fn with_ttl(inner: Arc<R>, ttl: Duration, max_capacity: u64) -> Self {
        let lists = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .support_invalidation_closures()
            .build();
        let (invalidations, _) = broadcast::channel(INVALIDATION_CHANNEL_CAPACITY);

        Self {
            inner,
            lists,
            invalidations,
        }
    }

    /// Subscribe to invalidation signals.
    pub fn subscribe(&self) -> broadcast::Receiver<ViewKey> {
        self.invalidations.subscribe()
    }

    fn drop_views(&self, key: &ViewKey) {
        let target = key.clone();
        if let Err(e) = self.lists.invalidate_entries_if(move |key, _| key.0 == target) {
            tracing::warn!(key = %key, error = %e, "Predicate invalidation failed; clearing all cached views");
            self.lists.invalidate_all();
        }
        // No subscribers is fine.
        let _ = self.invalidations.send(key.clone());
    }

    async fn host_of(&self, id: EventId) -> Option<HostId> {
        self.inner.get(id).await.ok().flatten().map(|e| e.host_id)
    }

    fn after_write(&self, host: Option<HostId>) {
        match host {
            Some(host) => self.drop_views(&ViewKey::events(&host)),
            None => self.lists.invalidate_all(),
        }
    }
}

#[async_trait]
impl<R: EventRepository + 'static> ViewInvalidator for CachedEventRepository<R> {
    async fn invalidate(&self, key: &ViewKey) {
        tracing::debug!(key = %key, "Invalidating cached views");
        self.drop_views(key);
    }
}

#[async_trait]
impl<R: EventRepository + 'static> EventRepository for CachedEventRepository<R> {
    async fn insert(&self, event: &Event) -> DomainResult<()> {
        self.inner.insert(event).await?;
        self.after_write(Some(event.host_id.clone()));
        Ok(())
    }

    async fn get(&self, id: EventId) -> DomainResult<Option<Event>> {
        self.inner.get(id).await
    }

    async fn list(&self, filter: EventFilter) -> DomainResult<Vec<Event>> {
        self.inner.list(filter).await
    }

    async fn list_by_host_and_status(
        &self,
        host_id: &HostId,
        statuses: &[EventStatus],
    ) -> DomainResult<Vec<Event>> {
        let mut status_set = statuses.to_vec();
        status_set.sort();
        status_set.dedup();
        let key = (ViewKey::events(host_id), status_set);

        if let Some(cached) = self.lists.get(&key).await {
            return Ok((*cached).clone());
        }

        let events = self.inner.list_by_host_and_status(host_id, statuses).await?;
        self.lists.insert(key, Arc::new(events.clone())).await;
        Ok(events)
    }

    async fn update_status(&self, id: EventId, status: EventStatus) -> DomainResult<()> {
        let host = self.host_of(id).await;
        self.inner.update_status(id, status).await?;
        self.after_write(host);
        Ok(())
    }

    async fn delete(&self, id: EventId) -> DomainResult<()> {
        let host = self.host_of(id).await;
        self.inner.delete(id).await?;
        self.after_write(host);
        Ok(())
    }
}
