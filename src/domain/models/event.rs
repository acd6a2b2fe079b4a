//! Event domain model.
//!
//! An Event is owned by the backend store. The reconciler only ever holds a
//! transient snapshot of it and writes back a single status field.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque event identifier.
pub type EventId = Uuid;

/// Identifier of the host that owns a set of events.
///
/// Always trimmed and non-empty. A missing or blank host id is modelled as
/// `Option::<HostId>::None`, which means "reconciliation inactive".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostId(String);

impl HostId {
    /// Parse a host id, returning `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Announced, not started yet.
    Scheduled,
    /// Currently running.
    Live,
    /// Finished. Set by the reconciler once the live window elapses.
    Closed,
    /// Called off by the host.
    Cancelled,
}

impl EventStatus {
    /// Statuses the reconciler fetches on every pass.
    pub const OPEN: [Self; 2] = [Self::Scheduled, Self::Live];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Live => "live",
            Self::Closed => "closed",
            Self::Cancelled => "cancelled",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "scheduled" => Some(Self::Scheduled),
            "live" => Some(Self::Live),
            "closed" => Some(Self::Closed),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Cancelled)
    }

    /// Whether a manual status change from `self` to `next` is allowed.
    ///
    /// Re-setting the current status is always allowed (idempotent write).
    pub fn can_transition_to(&self, next: Self) -> bool {
        if *self == next {
            return true;
        }
        matches!(
            (self, next),
            (Self::Scheduled, Self::Live)
                | (Self::Scheduled, Self::Cancelled)
                | (Self::Live, Self::Closed)
                | (Self::Live, Self::Cancelled)
        )
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hosted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub host_id: HostId,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub status: EventStatus,
    /// Scheduled start instant.
    pub date_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Create a new `Scheduled` event.
    pub fn new(host_id: HostId, title: impl Into<String>, date_time: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            host_id,
            title: title.into(),
            description: None,
            location: None,
            status: EventStatus::Scheduled,
            date_time,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_status(mut self, status: EventStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// End of the live window: start time plus the uniform live duration.
    ///
    /// `None` when the end lies beyond the representable range.
    pub fn end_time(&self, live_duration: Duration) -> Option<DateTime<Utc>> {
        self.date_time.checked_add_signed(live_duration)
    }

    /// True once `now` is strictly after the end of the live window. A window
    /// with no representable end never elapses.
    pub fn is_past_live_window(&self, now: DateTime<Utc>, live_duration: Duration) -> bool {
        self.end_time(live_duration).is_some_and(|end| now > end)
    }

    /// True for a `Live` event whose live window has elapsed.
    pub fn is_due_for_closure(&self, now: DateTime<Utc>, live_duration: Duration) -> bool {
        self.status == EventStatus::Live && self.is_past_live_window(now, live_duration)
    }
}
