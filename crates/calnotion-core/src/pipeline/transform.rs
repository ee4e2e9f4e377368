//! Event → task record mapping.

use chrono::NaiveDate;

use super::extract::{extract_action_items, ExtractionLimits};
use super::model::{CalendarEvent, MeetingSummaryRequest, Priority, TaskRecord, TaskSource};

/// Parse a `YYYY-MM-DD` date, returning `None` for anything else.
pub fn parse_due_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Date portion of an event start: `2024-03-01T10:00:00Z` and `2024-03-01`
/// both give 2024-03-01.
pub fn due_date_from_start(start_time: &str) -> Option<NaiveDate> {
    let date_part = start_time.split('T').next().unwrap_or_default();
    parse_due_date(date_part)
}

fn event_description(event: &CalendarEvent) -> String {
    let mut desc = String::from("📅 Calendar Event\n");
    if event.has_location() {
        desc.push_str(&format!("📍 Location: {}\n", event.location));
    }
    if event.has_description() {
        desc.push_str(&format!("📝 Notes: {}\n", event.description));
    }
    desc
}

/// The record representing the event itself.
pub fn event_task(event: &CalendarEvent) -> TaskRecord {
    TaskRecord {
        title: format!("📅 {}", event.title),
        description: event_description(event),
        due_date: due_date_from_start(&event.start_time),
        priority: Priority::Medium,
        source: TaskSource::Calendar,
    }
}

/// A high-priority follow-up record for one extracted action item.
pub fn action_item_task(item: &str, meeting_title: &str, due_date: Option<NaiveDate>) -> TaskRecord {
    TaskRecord {
        title: format!("🎯 {item}"),
        description: format!("Action item from meeting: {meeting_title}"),
        due_date,
        priority: Priority::High,
        source: TaskSource::Meeting,
    }
}

/// Records produced for one event: the event record first, then one record
/// per extracted action item when `extract` is set and the event has notes.
pub fn event_tasks(event: &CalendarEvent, limits: ExtractionLimits, extract: bool) -> Vec<TaskRecord> {
    let main = event_task(event);
    let due_date = main.due_date;
    let mut records = vec![main];

    if extract && event.has_description() {
        records.extend(
            extract_action_items(&event.description, limits)
                .iter()
                .map(|item| action_item_task(item, &event.title, due_date)),
        );
    }

    records
}

/// Build the meeting summary input for an event, extracting its action
/// items with `limits`. `today` is used when the start has no usable date.
pub fn meeting_summary_request(
    event: &CalendarEvent,
    limits: ExtractionLimits,
    today: NaiveDate,
) -> MeetingSummaryRequest {
    MeetingSummaryRequest {
        meeting_title: event.title.clone(),
        meeting_date: Some(due_date_from_start(&event.start_time).unwrap_or(today)),
        attendees: event.attendees.clone(),
        summary: event.description.clone(),
        action_items: extract_action_items(&event.description, limits),
    }
}

/// Records making up a meeting summary: the summary itself followed by at
/// most `max_items` action items taken from the request as given.
pub fn meeting_summary_tasks(
    req: &MeetingSummaryRequest,
    max_items: usize,
    today: NaiveDate,
) -> Vec<TaskRecord> {
    let due_date = Some(req.meeting_date.unwrap_or(today));
    let items: Vec<&String> = req.action_items.iter().take(max_items).collect();

    let mut description = String::from("📊 Meeting Summary\n");
    if !req.attendees.is_empty() {
        description.push_str(&format!("👥 Attendees: {}\n", req.attendees.join(", ")));
    }
    description.push_str(&format!("📝 Summary:\n{}\n", req.summary));
    if !items.is_empty() {
        description.push_str("\n🎯 Action Items:\n");
        for item in &items {
            description.push_str(&format!("• {item}\n"));
        }
    }

    let mut records = vec![TaskRecord {
        title: format!("📊 Meeting Summary: {}", req.meeting_title),
        description,
        due_date,
        priority: Priority::Medium,
        source: TaskSource::Meeting,
    }];
    records.extend(
        items
            .into_iter()
            .map(|item| action_item_task(item, &req.meeting_title, due_date)),
    );
    records
}
