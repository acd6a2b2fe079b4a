//! Shared fixtures for integration tests.

#![allow(dead_code)]

pub mod database;
pub mod fakes;

use chrono::{DateTime, Duration, TimeZone, Utc};
use eventpulse::domain::models::{Event, EventStatus, HostId};

/// Reference instant `T` used by lifecycle scenarios.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap()
}

pub fn host(id: &str) -> HostId {
    HostId::parse(id).expect("valid host id")
}

/// Event owned by `host` starting `offset` after `T`.
pub fn event_at(host_id: &str, title: &str, offset: Duration, status: EventStatus) -> Event {
    Event::new(host(host_id), title, t0() + offset).with_status(status)
}
