//! Records flowing through a sync: calendar events in, task records out.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Placeholder used when an event has no summary.
pub const NO_TITLE: &str = "No title";
/// Placeholder used when an event has no description.
pub const NO_DESCRIPTION: &str = "No description";
/// Placeholder used when an event has no location.
pub const NO_LOCATION: &str = "No location specified";

fn default_description() -> String {
    NO_DESCRIPTION.to_string()
}

fn default_location() -> String {
    NO_LOCATION.to_string()
}

/// A calendar event for one day, as produced by the event source.
///
/// The JSON shape matches what `calnotion events` prints, so its output can
/// be fed back into `calnotion task import`. `title` is required; the other
/// fields fall back to the same placeholders the calendar adapter uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub title: String,
    #[serde(default)]
    pub start_time: String,
    #[serde(default = "default_description")]
    pub description: String,
    #[serde(default = "default_location")]
    pub location: String,
    #[serde(default)]
    pub attendees: Vec<String>,
}

impl CalendarEvent {
    pub fn has_description(&self) -> bool {
        self.description != NO_DESCRIPTION
    }

    pub fn has_location(&self) -> bool {
        self.location != NO_LOCATION
    }
}

/// Task priority as understood by the task database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = CoreError;

    /// Case-insensitive: "high", "HIGH" and "High" all parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(CoreError::MalformedInput(format!(
                "Invalid priority '{other}'. Use High, Medium or Low."
            ))),
        }
    }
}

/// Where a task record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TaskSource {
    #[default]
    Calendar,
    Meeting,
}

impl TaskSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskSource::Calendar => "Calendar",
            TaskSource::Meeting => "Meeting",
        }
    }
}

impl fmt::Display for TaskSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskSource {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "calendar" => Ok(TaskSource::Calendar),
            "meeting" => Ok(TaskSource::Meeting),
            other => Err(CoreError::MalformedInput(format!(
                "Invalid source '{other}'. Use Calendar or Meeting."
            ))),
        }
    }
}

/// A record to create in the task database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub title: String,
    pub description: String,
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
    pub source: TaskSource,
}

/// One row returned when listing the task database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub title: String,
    pub status: String,
    pub priority: String,
}

/// Input of the composite "meeting summary" operation.
///
/// Action items are supplied by the caller; nothing is extracted here.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MeetingSummaryRequest {
    pub meeting_title: String,
    pub meeting_date: Option<NaiveDate>,
    pub attendees: Vec<String>,
    pub summary: String,
    pub action_items: Vec<String>,
}

/// Which day a sync covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncType {
    Today,
    Date(NaiveDate),
}

impl fmt::Display for SyncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncType::Today => f.write_str("today"),
            SyncType::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// Outcome of one sync, kept only in memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    pub timestamp: DateTime<Utc>,
    pub sync_type: SyncType,
    pub event_count: usize,
    pub tasks_created: usize,
    pub action_items: usize,
    pub message: String,
}

/// Append-only list of sync outcomes for the current process.
#[derive(Debug, Clone, Default)]
pub struct SyncHistory {
    entries: Vec<SyncResult>,
}

impl SyncHistory {
    pub fn push(&mut self, result: SyncResult) {
        self.entries.push(result);
    }

    pub fn last(&self) -> Option<&SyncResult> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_json_requires_title_and_defaults_the_rest() {
        let ev: CalendarEvent = serde_json::from_str(r#"{"title": "Standup"}"#).unwrap();
        assert_eq!(ev.description, NO_DESCRIPTION);
        assert_eq!(ev.location, NO_LOCATION);
        assert!(ev.attendees.is_empty());
        assert!(!ev.has_description());

        let missing = serde_json::from_str::<CalendarEvent>(r#"{"start_time": "2024-03-01"}"#);
        assert!(missing.is_err());
    }

    #[test]
    fn priority_parses_case_insensitively() {
        assert_eq!("high".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!("LOW".parse::<Priority>().unwrap(), Priority::Low);
        assert_eq!(" Medium ".parse::<Priority>().unwrap(), Priority::Medium);
        assert!(matches!(
            "urgent".parse::<Priority>(),
            Err(CoreError::MalformedInput(_))
        ));
    }

    #[test]
    fn source_wire_names() {
        assert_eq!(TaskSource::Calendar.to_string(), "Calendar");
        assert_eq!("meeting".parse::<TaskSource>().unwrap(), TaskSource::Meeting);
    }

    #[test]
    fn history_keeps_the_latest_result_last() {
        let mut history = SyncHistory::default();
        assert!(history.is_empty());
        for n in 1..=2 {
            history.push(SyncResult {
                timestamp: Utc::now(),
                sync_type: SyncType::Today,
                event_count: n,
                tasks_created: n * 2,
                action_items: n,
                message: String::new(),
            });
        }
        assert_eq!(history.len(), 2);
        assert_eq!(history.last().unwrap().event_count, 2);
    }

    #[test]
    fn sync_type_display() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(SyncType::Date(d).to_string(), "2024-03-01");
        assert_eq!(SyncType::Today.to_string(), "today");
    }
}
