//! CLI command implementations.

pub mod event;
pub mod init;
pub mod reconcile;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::adapters::sqlite::{initialize_database, PoolConfig, SqliteEventRepository};
use crate::domain::models::{Config, EventStatus, HostId};

/// Open the configured database, applying pending migrations.
pub(crate) async fn open_event_repository(config: &Config) -> Result<Arc<SqliteEventRepository>> {
    let url = config.database.url();
    let pool = initialize_database(&url, Some(PoolConfig::from(&config.database)))
        .await
        .with_context(|| format!("Failed to open database at {}", config.database.path))?;
    Ok(Arc::new(SqliteEventRepository::new(pool)))
}

pub(crate) fn parse_host(raw: &str) -> Result<HostId> {
    HostId::parse(raw).context("Host id must not be empty")
}

pub(crate) fn parse_status(raw: &str) -> Result<EventStatus> {
    EventStatus::from_str(raw).with_context(|| {
        format!("Unknown status '{raw}'. Expected one of: scheduled, live, closed, cancelled")
    })
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Invalid RFC3339 timestamp: {raw}"))
}
