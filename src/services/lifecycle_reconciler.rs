//! Event lifecycle reconciliation.
//!
//! One pass scans a host's open events and closes every `Live` event whose
//! live window (`date_time + live_duration`) has elapsed:
//! - fetch `Scheduled`/`Live` events owned by the host
//! - issue one independent `Closed` update per due event
//! - invalidate the host's cached event views iff something was closed
//!
//! A pass never fails. Fetch and update errors are logged and the pass
//! degrades to "try again next interval".

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::domain::models::{EventId, EventStatus, HostId};
use crate::domain::ports::{Clock, EventRepository, ViewInvalidator, ViewKey};

/// How a reconciliation pass ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum PassOutcome {
    /// Every due event was attempted.
    Completed,
    /// Listing events failed; nothing was applied.
    FetchFailed(String),
    /// Cancelled before or during the pass; remaining transitions were not applied.
    Cancelled,
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub host_id: HostId,
    /// Number of open events fetched.
    pub fetched: usize,
    /// Events moved to `Closed` in this pass.
    pub closed: Vec<EventId>,
    /// Events whose update failed, with the error message.
    pub failed: Vec<(EventId, String)>,
    /// Whether the host's event views were invalidated.
    pub invalidated: bool,
    pub outcome: PassOutcome,
}

impl PassReport {
    fn empty(host_id: &HostId, outcome: PassOutcome) -> Self {
        Self {
            host_id: host_id.clone(),
            fetched: 0,
            closed: Vec::new(),
            failed: Vec::new(),
            invalidated: false,
            outcome,
        }
    }

    pub fn is_fetch_failure(&self) -> bool {
        matches!(self.outcome, PassOutcome::FetchFailed(_))
    }
}

/// Closes events whose live window has elapsed.
pub struct LifecycleReconciler {
    repository: Arc<dyn EventRepository>,
    invalidator: Arc<dyn ViewInvalidator>,
    clock: Arc<dyn Clock>,
    live_duration: Duration,
}

impl LifecycleReconciler {
    pub fn new(
        repository: Arc<dyn EventRepository>,
        invalidator: Arc<dyn ViewInvalidator>,
        clock: Arc<dyn Clock>,
        live_duration: Duration,
    ) -> Self {
        Self {
            repository,
            invalidator,
            clock,
            live_duration,
        }
    }

    /// Current time according to the injected clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Run one reconciliation pass for `host_id`.
    ///
    /// `cancel` is checked before the fetch and before every transition; once
    /// it fires no further update is issued.
    pub async fn run_pass(&self, host_id: &HostId, cancel: &CancellationToken) -> PassReport {
        if cancel.is_cancelled() {
            return PassReport::empty(host_id, PassOutcome::Cancelled);
        }

        let events = match self
            .repository
            .list_by_host_and_status(host_id, &EventStatus::OPEN)
            .await
        {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!(host_id = %host_id, error = %e, "Failed to fetch open events; skipping pass");
                return PassReport::empty(host_id, PassOutcome::FetchFailed(e.to_string()));
            }
        };

        let now = self.clock.now();
        let due: Vec<EventId> = events
            .iter()
            .filter(|e| e.is_due_for_closure(now, self.live_duration))
            .map(|e| e.id)
            .collect();

        let mut report = PassReport::empty(host_id, PassOutcome::Completed);
        report.fetched = events.len();

        for id in due {
            if cancel.is_cancelled() {
                tracing::debug!(host_id = %host_id, "Reconciler cancelled mid-pass");
                report.outcome = PassOutcome::Cancelled;
                break;
            }

            match self.repository.update_status(id, EventStatus::Closed).await {
                Ok(()) => {
                    tracing::info!(host_id = %host_id, event_id = %id, "Closed event after live window elapsed");
                    report.closed.push(id);
                }
                Err(e) => {
                    tracing::warn!(host_id = %host_id, event_id = %id, error = %e, "Failed to close event");
                    report.failed.push((id, e.to_string()));
                }
            }
        }

        if !report.closed.is_empty() {
            self.invalidator.invalidate(&ViewKey::events(host_id)).await;
            report.invalidated = true;
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::{DomainError, DomainResult};
    use crate::domain::models::Event;
    use crate::domain::ports::{EventFilter, FixedClock};
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// In-memory repository recording every call.
    #[derive(Default)]
    struct RecordingRepository {
        events: Mutex<Vec<Event>>,
        fail_fetch: bool,
        fail_updates_for: HashSet<EventId>,
        list_calls: Mutex<usize>,
        updates: Mutex<Vec<(EventId, EventStatus)>>,
    }

    impl RecordingRepository {
        fn with_events(events: Vec<Event>) -> Self {
            Self {
                events: Mutex::new(events),
                ..Default::default()
            }
        }

        fn updates(&self) -> Vec<(EventId, EventStatus)> {
            self.updates.lock().unwrap().clone()
        }

        fn status_of(&self, id: EventId) -> EventStatus {
            self.events.lock().unwrap().iter().find(|e| e.id == id).unwrap().status
        }
    }

    #[async_trait]
    impl EventRepository for RecordingRepository {
        async fn insert(&self, event: &Event) -> DomainResult<()> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }

        async fn get(&self, id: EventId) -> DomainResult<Option<Event>> {
            Ok(self.events.lock().unwrap().iter().find(|e| e.id == id).cloned())
        }

        async fn list(&self, _filter: EventFilter) -> DomainResult<Vec<Event>> {
            Ok(self.events.lock().unwrap().clone())
        }

        async fn list_by_host_and_status(
            &self,
            host_id: &HostId,
            statuses: &[EventStatus],
        ) -> DomainResult<Vec<Event>> {
            *self.list_calls.lock().unwrap() += 1;
            if self.fail_fetch {
                return Err(DomainError::DatabaseError("backend unreachable".to_string()));
            }
            Ok(self
                .events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| &e.host_id == host_id && statuses.contains(&e.status))
                .cloned()
                .collect())
        }

        async fn update_status(&self, id: EventId, status: EventStatus) -> DomainResult<()> {
            self.updates.lock().unwrap().push((id, status));
            if self.fail_updates_for.contains(&id) {
                return Err(DomainError::DatabaseError("write rejected".to_string()));
            }
            let mut events = self.events.lock().unwrap();
            let event = events.iter_mut().find(|e| e.id == id).ok_or(DomainError::EventNotFound(id))?;
            event.status = status;
            Ok(())
        }

        async fn delete(&self, id: EventId) -> DomainResult<()> {
            self.events.lock().unwrap().retain(|e| e.id != id);
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingInvalidator {
        keys: Mutex<Vec<ViewKey>>,
    }

    #[async_trait]
    impl ViewInvalidator for RecordingInvalidator {
        async fn invalidate(&self, key: &ViewKey) {
            self.keys.lock().unwrap().push(key.clone());
        }
    }

    fn t() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 20, 18, 0, 0).unwrap()
    }

    fn h1() -> HostId {
        HostId::parse("H1").unwrap()
    }

    fn reconciler(
        repo: &Arc<RecordingRepository>,
        invalidator: &Arc<RecordingInvalidator>,
        now: DateTime<Utc>,
    ) -> LifecycleReconciler {
        LifecycleReconciler::new(
            repo.clone(),
            invalidator.clone(),
            Arc::new(FixedClock::new(now)),
            Duration::hours(2),
        )
    }

    #[tokio::test]
    async fn test_example_scenario_closes_two_events() {
        let e1 = Event::new(h1(), "E1", t()).with_status(EventStatus::Live);
        let e2 = Event::new(h1(), "E2", t() - Duration::hours(3)).with_status(EventStatus::Live);
        let e3 = Event::new(h1(), "E3", t() + Duration::hours(1));
        let repo = Arc::new(RecordingRepository::with_events(vec![e1.clone(), e2.clone(), e3.clone()]));
        let invalidator = Arc::new(RecordingInvalidator::default());
        let now = t() + Duration::hours(2) + Duration::minutes(1);

        let report = reconciler(&repo, &invalidator, now)
            .run_pass(&h1(), &CancellationToken::new())
            .await;

        assert_eq!(report.outcome, PassOutcome::Completed);
        assert_eq!(report.fetched, 3);
        let mut closed = report.closed.clone();
        closed.sort();
        let mut expected = vec![e1.id, e2.id];
        expected.sort();
        assert_eq!(closed, expected);
        assert_eq!(repo.updates().len(), 2);
        assert_eq!(repo.status_of(e3.id), EventStatus::Scheduled);
        assert_eq!(*invalidator.keys.lock().unwrap(), vec![ViewKey::events(&h1())]);
        assert!(report.invalidated);
    }

    #[tokio::test]
    async fn test_live_event_inside_window_is_untouched() {
        let live = Event::new(h1(), "ongoing", t()).with_status(EventStatus::Live);
        let repo = Arc::new(RecordingRepository::with_events(vec![live.clone()]));
        let invalidator = Arc::new(RecordingInvalidator::default());

        // Exactly at the end of the window is not yet past it.
        let report = reconciler(&repo, &invalidator, t() + Duration::hours(2))
            .run_pass(&h1(), &CancellationToken::new())
            .await;

        assert!(report.closed.is_empty());
        assert!(repo.updates().is_empty());
        assert!(invalidator.keys.lock().unwrap().is_empty());
        assert_eq!(repo.status_of(live.id), EventStatus::Live);
    }

    #[tokio::test]
    async fn test_second_pass_is_idempotent() {
        let live = Event::new(h1(), "done", t()).with_status(EventStatus::Live);
        let repo = Arc::new(RecordingRepository::with_events(vec![live]));
        let invalidator = Arc::new(RecordingInvalidator::default());
        let reconciler = reconciler(&repo, &invalidator, t() + Duration::hours(5));

        let first = reconciler.run_pass(&h1(), &CancellationToken::new()).await;
        let second = reconciler.run_pass(&h1(), &CancellationToken::new()).await;

        assert_eq!(first.closed.len(), 1);
        assert!(second.closed.is_empty());
        assert_eq!(second.fetched, 0, "closed events are not fetched");
        assert_eq!(repo.updates().len(), 1);
        assert_eq!(invalidator.keys.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_applies_nothing() {
        let live = Event::new(h1(), "stale", t()).with_status(EventStatus::Live);
        let repo = Arc::new(RecordingRepository {
            fail_fetch: true,
            ..RecordingRepository::with_events(vec![live])
        });
        let invalidator = Arc::new(RecordingInvalidator::default());

        let report = reconciler(&repo, &invalidator, t() + Duration::hours(5))
            .run_pass(&h1(), &CancellationToken::new())
            .await;

        assert!(report.is_fetch_failure());
        assert!(repo.updates().is_empty());
        assert!(invalidator.keys.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_failure_does_not_block_others() {
        let a = Event::new(h1(), "A", t()).with_status(EventStatus::Live);
        let b = Event::new(h1(), "B", t() - Duration::hours(1)).with_status(EventStatus::Live);
        let repo = Arc::new(RecordingRepository {
            fail_updates_for: HashSet::from([a.id]),
            ..RecordingRepository::with_events(vec![a.clone(), b.clone()])
        });
        let invalidator = Arc::new(RecordingInvalidator::default());

        let report = reconciler(&repo, &invalidator, t() + Duration::hours(3))
            .run_pass(&h1(), &CancellationToken::new())
            .await;

        assert_eq!(report.closed, vec![b.id]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, a.id);
        assert_eq!(repo.status_of(a.id), EventStatus::Live);
        assert_eq!(repo.status_of(b.id), EventStatus::Closed);
        assert!(report.invalidated);
    }

    #[tokio::test]
    async fn test_all_updates_failing_skips_invalidation() {
        let a = Event::new(h1(), "A", t()).with_status(EventStatus::Live);
        let repo = Arc::new(RecordingRepository {
            fail_updates_for: HashSet::from([a.id]),
            ..RecordingRepository::with_events(vec![a])
        });
        let invalidator = Arc::new(RecordingInvalidator::default());

        let report = reconciler(&repo, &invalidator, t() + Duration::hours(3))
            .run_pass(&h1(), &CancellationToken::new())
            .await;

        assert!(report.closed.is_empty());
        assert!(!report.invalidated);
        assert!(invalidator.keys.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_token_skips_pass() {
        let live = Event::new(h1(), "late", t()).with_status(EventStatus::Live);
        let repo = Arc::new(RecordingRepository::with_events(vec![live]));
        let invalidator = Arc::new(RecordingInvalidator::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = reconciler(&repo, &invalidator, t() + Duration::hours(3))
            .run_pass(&h1(), &cancel)
            .await;

        assert_eq!(report.outcome, PassOutcome::Cancelled);
        assert_eq!(*repo.list_calls.lock().unwrap(), 0);
        assert!(repo.updates().is_empty());
    }

    #[tokio::test]
    async fn test_unrepresentable_window_closes_nothing() {
        let live = Event::new(h1(), "endless", t()).with_status(EventStatus::Live);
        let repo = Arc::new(RecordingRepository::with_events(vec![live.clone()]));
        let invalidator = Arc::new(RecordingInvalidator::default());

        for window in [Duration::seconds(10_000_000_000_000), Duration::MAX] {
            let reconciler = LifecycleReconciler::new(
                repo.clone(),
                invalidator.clone(),
                Arc::new(FixedClock::new(t() + Duration::days(3650))),
                window,
            );
            let report = reconciler.run_pass(&h1(), &CancellationToken::new()).await;

            assert_eq!(report.outcome, PassOutcome::Completed);
            assert_eq!(report.fetched, 1);
            assert!(report.closed.is_empty());
        }
        assert!(repo.updates().is_empty());
        assert!(invalidator.keys.lock().unwrap().is_empty());
        assert_eq!(repo.status_of(live.id), EventStatus::Live);
    }

    #[tokio::test]
    async fn test_other_hosts_are_ignored() {
        let other = Event::new(HostId::parse("H2").unwrap(), "theirs", t()).with_status(EventStatus::Live);
        let repo = Arc::new(RecordingRepository::with_events(vec![other.clone()]));
        let invalidator = Arc::new(RecordingInvalidator::default());

        let report = reconciler(&repo, &invalidator, t() + Duration::hours(3))
            .run_pass(&h1(), &CancellationToken::new())
            .await;

        assert_eq!(report.fetched, 0);
        assert_eq!(repo.status_of(other.id), EventStatus::Live);
    }
}
