//! Event management commands used by hosts: create, list, inspect and
//! manually move events through their lifecycle.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use uuid::Uuid;

use super::{open_event_repository, parse_host, parse_status, parse_timestamp};
use crate::cli::output::{output, render_events, CommandOutput};
use crate::domain::errors::DomainError;
use crate::domain::models::{Config, Event, EventStatus};
use crate::domain::ports::{EventFilter, EventRepository};

#[derive(Args, Debug)]
pub struct EventArgs {
    #[command(subcommand)]
    pub command: EventCommands,
}

#[derive(Subcommand, Debug)]
pub enum EventCommands {
    /// Create a new event
    Create {
        /// Owning host id
        #[arg(long)]
        host: String,
        /// Event title
        #[arg(long)]
        title: String,
        /// Start time (RFC3339, e.g. 2024-06-01T10:00:00Z)
        #[arg(long)]
        at: String,
        /// Optional description
        #[arg(long)]
        description: Option<String>,
        /// Optional location
        #[arg(long)]
        location: Option<String>,
        /// Initial status
        #[arg(long, default_value = "scheduled")]
        status: String,
    },
    /// List events
    List {
        /// Filter by host id
        #[arg(long)]
        host: Option<String>,
        /// Filter by status (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        status: Vec<String>,
        /// Maximum number of events to display
        #[arg(short, long, default_value = "50")]
        limit: i64,
    },
    /// Show details for a specific event
    Show {
        /// Event ID
        id: Uuid,
    },
    /// Change an event's status (scheduled -> live -> closed, or cancelled)
    SetStatus {
        /// Event ID
        id: Uuid,
        /// New status
        status: String,
    },
    /// Delete an event
    Delete {
        /// Event ID
        id: Uuid,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct EventOutput {
    pub success: bool,
    pub message: String,
    pub event: Event,
}

impl CommandOutput for EventOutput {
    fn to_human(&self) -> String {
        let event = &self.event;
        let mut lines = vec![
            self.message.clone(),
            String::new(),
            format!("ID:          {}", event.id),
            format!("Host:        {}", event.host_id),
            format!("Title:       {}", event.title),
            format!("Status:      {}", event.status),
            format!("Starts:      {}", event.date_time.to_rfc3339()),
        ];
        if let Some(ref description) = event.description {
            lines.push(format!("Description: {description}"));
        }
        if let Some(ref location) = event.location {
            lines.push(format!("Location:    {location}"));
        }
        lines.push(format!("Updated:     {}", event.updated_at.to_rfc3339()));
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct EventListOutput {
    pub events: Vec<Event>,
    pub total: usize,
}

impl CommandOutput for EventListOutput {
    fn to_human(&self) -> String {
        render_events(&self.events)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct EventDeleteOutput {
    pub success: bool,
    pub id: Uuid,
}

impl CommandOutput for EventDeleteOutput {
    fn to_human(&self) -> String {
        format!("Deleted event {}", self.id)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: EventArgs, config: &Config, json_mode: bool) -> Result<()> {
    let repo = open_event_repository(config).await?;

    match args.command {
        EventCommands::Create {
            host,
            title,
            at,
            description,
            location,
            status,
        } => {
            let mut event = Event::new(parse_host(&host)?, title, parse_timestamp(&at)?)
                .with_status(parse_status(&status)?);
            if let Some(description) = description {
                event = event.with_description(description);
            }
            if let Some(location) = location {
                event = event.with_location(location);
            }

            repo.insert(&event).await.context("Failed to create event")?;
            tracing::info!(event_id = %event.id, host_id = %event.host_id, "Event created");

            output(
                &EventOutput {
                    success: true,
                    message: "Event created.".to_string(),
                    event,
                },
                json_mode,
            );
        }
        EventCommands::List { host, status, limit } => {
            let filter = EventFilter {
                host_id: host.as_deref().map(parse_host).transpose()?,
                statuses: status.iter().map(|s| parse_status(s)).collect::<Result<_>>()?,
                limit: Some(limit),
            };
            let events = repo.list(filter).await.context("Failed to list events")?;
            let total = events.len();
            output(&EventListOutput { events, total }, json_mode);
        }
        EventCommands::Show { id } => {
            let event = repo
                .get(id)
                .await
                .context("Failed to load event")?
                .ok_or(DomainError::EventNotFound(id))?;
            output(
                &EventOutput {
                    success: true,
                    message: "Event details:".to_string(),
                    event,
                },
                json_mode,
            );
        }
        EventCommands::SetStatus { id, status } => {
            let next = parse_status(&status)?;
            let event = set_status(repo.as_ref(), id, next).await?;
            output(
                &EventOutput {
                    success: true,
                    message: format!("Event is now {next}."),
                    event,
                },
                json_mode,
            );
        }
        EventCommands::Delete { id } => {
            repo.delete(id).await.context("Failed to delete event")?;
            tracing::info!(event_id = %id, "Event deleted");
            output(&EventDeleteOutput { success: true, id }, json_mode);
        }
    }

    Ok(())
}

/// Apply a manual status change, rejecting transitions the lifecycle forbids.
async fn set_status(repo: &dyn EventRepository, id: Uuid, next: EventStatus) -> Result<Event> {
    let current = repo.get(id).await?.ok_or(DomainError::EventNotFound(id))?;

    if !current.status.can_transition_to(next) {
        return Err(DomainError::InvalidStateTransition {
            from: current.status.to_string(),
            to: next.to_string(),
        }
        .into());
    }

    repo.update_status(id, next).await?;
    tracing::info!(event_id = %id, from = %current.status, to = %next, "Event status changed");

    repo.get(id)
        .await?
        .ok_or_else(|| DomainError::EventNotFound(id).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteEventRepository};
    use crate::domain::models::HostId;
    use chrono::Utc;

    async fn repo_with(event: &Event) -> SqliteEventRepository {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = SqliteEventRepository::new(pool);
        repo.insert(event).await.unwrap();
        repo
    }

    #[tokio::test]
    async fn test_set_status_follows_lifecycle() {
        let event = Event::new(HostId::parse("H1").unwrap(), "Meetup", Utc::now());
        let repo = repo_with(&event).await;

        let live = set_status(&repo, event.id, EventStatus::Live).await.unwrap();
        assert_eq!(live.status, EventStatus::Live);

        let closed = set_status(&repo, event.id, EventStatus::Closed).await.unwrap();
        assert_eq!(closed.status, EventStatus::Closed);

        let err = set_status(&repo, event.id, EventStatus::Live).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DomainError>(),
            Some(DomainError::InvalidStateTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_set_status_unknown_event() {
        let event = Event::new(HostId::parse("H1").unwrap(), "Meetup", Utc::now());
        let repo = repo_with(&event).await;

        let missing = Uuid::new_v4();
        let err = set_status(&repo, missing, EventStatus::Cancelled).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DomainError>(),
            Some(DomainError::EventNotFound(id)) if *id == missing
        ));
    }
}
