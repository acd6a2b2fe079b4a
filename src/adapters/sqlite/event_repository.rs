//! SQLite adapter for EventRepository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::adapters::sqlite::{parse_datetime, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Event, EventId, EventStatus, HostId};
use crate::domain::ports::{EventFilter, EventRepository};

#[derive(Clone)]
pub struct SqliteEventRepository {
    pool: SqlitePool,
}

impl SqliteEventRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct EventRow {
    id: String,
    host_id: String,
    title: String,
    description: Option<String>,
    location: Option<String>,
    status: String,
    date_time: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<EventRow> for Event {
    type Error = DomainError;

    fn try_from(row: EventRow) -> DomainResult<Self> {
        let host_id = HostId::parse(&row.host_id)
            .ok_or_else(|| DomainError::SerializationError(format!("empty host_id for event {}", row.id)))?;
        let status = EventStatus::from_str(&row.status)
            .ok_or_else(|| DomainError::SerializationError(format!("unknown event status: {}", row.status)))?;

        Ok(Self {
            id: parse_uuid(&row.id)?,
            host_id,
            title: row.title,
            description: row.description,
            location: row.location,
            status,
            date_time: parse_datetime(&row.date_time)?,
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
        })
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

#[async_trait]
impl EventRepository for SqliteEventRepository {
    async fn insert(&self, event: &Event) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO events
             (id, host_id, title, description, location, status, date_time, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
        )
        .bind(event.id.to_string())
        .bind(event.host_id.as_str())
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.location)
        .bind(event.status.as_str())
        .bind(event.date_time.to_rfc3339())
        .bind(event.created_at.to_rfc3339())
        .bind(event.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: EventId) -> DomainResult<Option<Event>> {
        let row: Option<EventRow> = sqlx::query_as("SELECT * FROM events WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Event::try_from).transpose()
    }

    async fn list(&self, filter: EventFilter) -> DomainResult<Vec<Event>> {
        let mut query = String::from("SELECT * FROM events WHERE 1=1");
        let mut bindings: Vec<String> = Vec::new();

        if let Some(host_id) = &filter.host_id {
            query.push_str(" AND host_id = ?");
            bindings.push(host_id.as_str().to_string());
        }
        if !filter.statuses.is_empty() {
            query.push_str(&format!(" AND status IN ({})", placeholders(filter.statuses.len())));
            bindings.extend(filter.statuses.iter().map(|s| s.as_str().to_string()));
        }

        query.push_str(" ORDER BY date_time DESC");
        if let Some(limit) = filter.limit {
            query.push_str(&format!(" LIMIT {}", limit.max(0)));
        }

        let mut q = sqlx::query_as::<_, EventRow>(&query);
        for binding in &bindings {
            q = q.bind(binding);
        }

        let rows: Vec<EventRow> = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(Event::try_from).collect()
    }

    async fn list_by_host_and_status(
        &self,
        host_id: &HostId,
        statuses: &[EventStatus],
    ) -> DomainResult<Vec<Event>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!(
            "SELECT * FROM events WHERE host_id = ? AND status IN ({}) ORDER BY date_time ASC",
            placeholders(statuses.len())
        );

        let mut q = sqlx::query_as::<_, EventRow>(&query).bind(host_id.as_str());
        for status in statuses {
            q = q.bind(status.as_str());
        }

        let rows: Vec<EventRow> = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(Event::try_from).collect()
    }

    async fn update_status(&self, id: EventId, status: EventStatus) -> DomainResult<()> {
        let result = sqlx::query("UPDATE events SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(Utc::now().to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::EventNotFound(id));
        }
        Ok(())
    }

    async fn delete(&self, id: EventId) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM events WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::EventNotFound(id));
        }
        Ok(())
    }
}
