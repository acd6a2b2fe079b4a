//! Output formatting utilities for the CLI.

use comfy_table::{presets, Cell, CellAlignment, ContentArrangement, Table};
use serde::Serialize;

use crate::domain::models::Event;

pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;
    fn to_json(&self) -> serde_json::Value;
}

pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap_or_default());
    } else {
        println!("{}", result.to_human());
    }
}

/// Truncate a string to a maximum number of characters, appending "..." if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Create a standard list table with the given headers.
///
/// Uses the NOTHING preset (no borders) for a clean CLI aesthetic.
pub fn list_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h.to_uppercase()).set_alignment(CellAlignment::Left)),
        );
    table
}

/// Render a list of events as a table with a count line.
pub fn render_events(events: &[Event]) -> String {
    if events.is_empty() {
        return "No events found.".to_string();
    }

    let mut table = list_table(&["id", "host", "title", "status", "starts"]);
    for event in events {
        table.add_row(vec![
            event.id.to_string(),
            event.host_id.to_string(),
            truncate(&event.title, 40),
            event.status.to_string(),
            event.date_time.format("%Y-%m-%d %H:%M UTC").to_string(),
        ]);
    }

    let noun = if events.len() == 1 { "event" } else { "events" };
    format!("{} {noun}:\n{table}", events.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::HostId;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer title here", 10), "a longe...");
        assert_eq!(truncate("ééééé", 4), "é...");
    }

    #[test]
    fn test_render_events() {
        assert_eq!(render_events(&[]), "No events found.");

        let host = HostId::parse("H1").unwrap();
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
        let rendered = render_events(&[Event::new(host, "Launch party", at)]);
        assert!(rendered.starts_with("1 event:"));
        assert!(rendered.contains("Launch party"));
        assert!(rendered.contains("scheduled"));
        assert!(rendered.contains("2024-06-01 10:00 UTC"));
    }
}
