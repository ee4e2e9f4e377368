//! Orchestration of the event source, the pipeline and the task sink.
//!
//! Every operation here returns the text shown to the user. Errors from the
//! adapters are rendered into that text rather than propagated, so a caller
//! only ever prints the result.

use std::str::FromStr;

use chrono::{Local, NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::integrations::{EventSource, Integration, TaskSink};
use crate::pipeline::{
    analyze_meeting_notes, event_tasks, is_meeting_like, meeting_summary_request, parse_due_date,
    CalendarEvent, MeetingSummaryRequest, Priority, SyncHistory, SyncResult, SyncType, TaskRecord,
    TaskSource,
};
use crate::storage::ExtractionConfig;

const INVALID_DATE: &str = "Invalid date format. Please use YYYY-MM-DD.";

/// Loosely typed input of [`Workflow::create_task`].
#[derive(Debug, Clone, Default)]
pub struct TaskInput {
    pub title: String,
    pub description: String,
    /// `YYYY-MM-DD`; anything else is dropped.
    pub due_date: Option<String>,
    pub priority: Option<String>,
    pub source: Option<String>,
}

/// Loosely typed input of [`Workflow::create_meeting_summary`].
#[derive(Debug, Clone, Default)]
pub struct MeetingSummaryInput {
    pub meeting_title: String,
    /// `YYYY-MM-DD`, defaulting to today.
    pub meeting_date: Option<String>,
    /// Comma separated.
    pub attendees: String,
    pub summary: String,
    /// JSON array of strings; empty means none.
    pub action_items: String,
}

/// Tally of one batch of record creations.
#[derive(Debug, Default)]
struct BatchOutcome {
    created: usize,
    action_items: usize,
    lines: Vec<String>,
    failures: Vec<String>,
}

impl BatchOutcome {
    fn message(&self) -> String {
        let mut msg = format!("✅ Created {} tasks from calendar events:", self.created);
        for line in &self.lines {
            msg.push_str("\n• ");
            msg.push_str(line);
        }
        if !self.failures.is_empty() {
            msg.push_str(&format!("\n❌ Failed to create {} tasks:", self.failures.len()));
            for failure in &self.failures {
                msg.push_str("\n• ");
                msg.push_str(failure);
            }
        }
        msg
    }
}

/// Runs syncs and single operations against one source and one sink.
pub struct Workflow<S, T> {
    source: S,
    sink: T,
    extraction: ExtractionConfig,
    history: SyncHistory,
}

impl<S: EventSource, T: TaskSink> Workflow<S, T> {
    pub fn new(source: S, sink: T, extraction: ExtractionConfig) -> Self {
        Self {
            source,
            sink,
            extraction,
            history: SyncHistory::default(),
        }
    }

    /// Syncs run by this value so far.
    pub fn history(&self) -> &SyncHistory {
        &self.history
    }

    /// Events of today, or of `date` (`YYYY-MM-DD`), as pretty JSON.
    pub async fn events_json(&mut self, date: Option<&str>) -> String {
        let day = match date.map(parse_due_date) {
            Some(None) => return INVALID_DATE.to_string(),
            Some(parsed) => parsed,
            None => None,
        };

        let events = match self.source.events_for_day(day).await {
            Ok(events) => events,
            Err(e) => return format!("Error fetching events: {e}"),
        };
        if events.is_empty() {
            return format!("No events found for {}.", day_label(day));
        }
        serde_json::to_string_pretty(&events)
            .unwrap_or_else(|e| format!("Error fetching events: {e}"))
    }

    /// Create a single task record.
    pub async fn create_task(&self, input: TaskInput) -> String {
        let priority = match parse_optional::<Priority>(input.priority.as_deref()) {
            Ok(p) => p,
            Err(e) => return format!("❌ Error creating task: {e}"),
        };
        let source = match parse_optional::<TaskSource>(input.source.as_deref()) {
            Ok(s) => s,
            Err(e) => return format!("❌ Error creating task: {e}"),
        };
        let due_date = input.due_date.as_deref().and_then(|raw| {
            let parsed = parse_due_date(raw);
            if parsed.is_none() {
                debug!(due_date = %raw, "dropping unparseable due date");
            }
            parsed
        });

        let record = TaskRecord {
            title: input.title,
            description: input.description,
            due_date,
            priority,
            source,
        };
        match self.sink.create_task(&record).await {
            Ok(id) => format!(
                "✅ Task created successfully: '{}'\nPage ID: {id}",
                record.title
            ),
            Err(e) => format!("❌ Error creating task: {e}"),
        }
    }

    /// Create records for a JSON array of events, as printed by [`Self::events_json`].
    pub async fn create_tasks_from_events(&self, events_json: &str, extract: bool) -> String {
        let events: Vec<CalendarEvent> = match serde_json::from_str(events_json) {
            Ok(events) => events,
            Err(e) => {
                debug!(error = %e, "rejecting events payload");
                return "❌ Error: Invalid JSON format for events.".to_string();
            }
        };
        self.create_records(&events, extract).await.message()
    }

    /// Create a meeting summary record and its action items.
    pub async fn create_meeting_summary(&self, input: MeetingSummaryInput) -> String {
        let action_items: Vec<String> = if input.action_items.trim().is_empty() {
            Vec::new()
        } else {
            match serde_json::from_str(&input.action_items) {
                Ok(items) => items,
                Err(e) => return format!("❌ Error creating meeting summary: {e}"),
            }
        };

        let req = MeetingSummaryRequest {
            meeting_title: input.meeting_title,
            meeting_date: input.meeting_date.as_deref().and_then(parse_due_date),
            attendees: input
                .attendees
                .split(',')
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(String::from)
                .collect(),
            summary: input.summary,
            action_items,
        };
        self.meeting_summary_message(&req).await
    }

    /// Up to ten task records, optionally filtered by priority.
    pub async fn list_tasks(&self, priority_filter: Option<&str>) -> String {
        let filter = priority_filter.filter(|f| !f.trim().is_empty());
        match self.sink.list_tasks(filter).await {
            Ok(tasks) if tasks.is_empty() => "📋 No tasks found in the database.".to_string(),
            Ok(tasks) => {
                let lines: Vec<String> = tasks
                    .iter()
                    .map(|t| format!("• {} [{}] - {} priority", t.title, t.status, t.priority))
                    .collect();
                format!("📋 Found {} tasks:\n{}", tasks.len(), lines.join("\n"))
            }
            Err(e) => format!("❌ Error fetching tasks: {e}"),
        }
    }

    /// Sync the current local day.
    pub async fn sync_today(&mut self) -> String {
        self.sync(None).await
    }

    /// Sync the day given as `YYYY-MM-DD`.
    pub async fn sync_date(&mut self, date: &str) -> String {
        match parse_due_date(date) {
            Some(day) => self.sync(Some(day)).await,
            None => format!("❌ {INVALID_DATE}"),
        }
    }

    /// Keyword analysis of free-form meeting notes, as pretty JSON.
    pub fn analyze_meeting_notes(text: &str) -> String {
        serde_json::to_string_pretty(&analyze_meeting_notes(text))
            .unwrap_or_else(|e| format!("❌ Error analyzing meeting notes: {e}"))
    }

    /// One line per service saying whether it is reachable.
    pub async fn check_connections(&mut self) -> String {
        let source = match self.source.check_connection().await {
            Ok(()) => format!("✅ {}: connected", self.source.display_name()),
            Err(e) => format!("❌ {}: {e}", self.source.display_name()),
        };
        let sink = match self.sink.check_connection().await {
            Ok(()) => format!("✅ {}: connected", self.sink.display_name()),
            Err(e) => format!("❌ {}: {e}", self.sink.display_name()),
        };
        format!("{source}\n{sink}")
    }

    async fn sync(&mut self, day: Option<NaiveDate>) -> String {
        let sync_type = day.map_or(SyncType::Today, SyncType::Date);
        let label = day_label(day);
        info!(%sync_type, "starting sync");

        let events = match self.source.events_for_day(day).await {
            Ok(events) => events,
            Err(e) => {
                warn!(error = %e, "fetching events failed");
                return format!("❌ Error fetching calendar events: {e}");
            }
        };

        if events.is_empty() {
            let message = format!("📅 No events found for {label}.");
            self.record(sync_type, 0, 0, 0, &message);
            return message;
        }

        let outcome = self.create_records(&events, true).await;
        let mut tasks_created = outcome.created;
        let mut action_items = outcome.action_items;
        let mut message = format!(
            "📊 Found {} events for {label}\n{}",
            events.len(),
            outcome.message()
        );

        if self.extraction.meeting_summaries {
            let today = Local::now().date_naive();
            let limits = self.extraction.summary_limits();
            for event in events.iter().filter(|e| is_meeting_like(e)) {
                let req = meeting_summary_request(event, limits, today);
                match self
                    .sink
                    .create_meeting_summary(&req, self.extraction.bulk_max_items)
                    .await
                {
                    Ok(n) => {
                        tasks_created += n + 1;
                        action_items += n;
                        message.push_str(&format!(
                            "\n📊 Created meeting summary and {n} action items for: {}",
                            event.title
                        ));
                    }
                    Err(e) => {
                        warn!(title = %event.title, error = %e, "meeting summary failed");
                        message.push_str(&format!(
                            "\n❌ Error creating meeting summary for '{}': {e}",
                            event.title
                        ));
                    }
                }
            }
        }

        message.push_str("\n✅ Sync completed.");
        info!(
            events = events.len(),
            tasks = tasks_created,
            action_items,
            "sync finished"
        );
        self.record(sync_type, events.len(), tasks_created, action_items, &message);
        message
    }

    fn record(
        &mut self,
        sync_type: SyncType,
        event_count: usize,
        tasks_created: usize,
        action_items: usize,
        message: &str,
    ) {
        self.history.push(SyncResult {
            timestamp: Utc::now(),
            sync_type,
            event_count,
            tasks_created,
            action_items,
            message: message.to_string(),
        });
    }

    async fn create_records(&self, events: &[CalendarEvent], extract: bool) -> BatchOutcome {
        let limits = self.extraction.bulk_limits();
        let mut outcome = BatchOutcome::default();

        for event in events {
            for (i, record) in event_tasks(event, limits, extract).iter().enumerate() {
                let label = if i == 0 {
                    format!("Event: {}", event.title)
                } else {
                    let item = record.title.strip_prefix("🎯 ").unwrap_or(&record.title);
                    format!("Action: {item}")
                };
                match self.sink.create_task(record).await {
                    Ok(_) => {
                        outcome.created += 1;
                        if i > 0 {
                            outcome.action_items += 1;
                        }
                        outcome.lines.push(label);
                    }
                    Err(e) => {
                        warn!(title = %record.title, error = %e, "creating task failed");
                        outcome.failures.push(format!("{label} ({e})"));
                    }
                }
            }
        }
        outcome
    }

    async fn meeting_summary_message(&self, req: &MeetingSummaryRequest) -> String {
        match self
            .sink
            .create_meeting_summary(req, self.extraction.bulk_max_items)
            .await
        {
            Ok(n) => format!(
                "✅ Created meeting summary and {n} action items for: {}",
                req.meeting_title
            ),
            Err(e) => format!("❌ Error creating meeting summary: {e}"),
        }
    }
}

fn day_label(day: Option<NaiveDate>) -> String {
    day.map_or_else(|| "today".to_string(), |d| d.format("%Y-%m-%d").to_string())
}

fn parse_optional<P>(raw: Option<&str>) -> Result<P, P::Err>
where
    P: FromStr + Default,
{
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s.parse(),
        None => Ok(P::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CoreError, Result};
    use crate::pipeline::{meeting_summary_tasks, TaskSummary};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeSource {
        events: Vec<CalendarEvent>,
        fail: bool,
        requested: Vec<Option<NaiveDate>>,
    }

    impl Integration for FakeSource {
        fn name(&self) -> &str {
            "fake-calendar"
        }
        fn display_name(&self) -> &str {
            "Fake Calendar"
        }
        fn is_authenticated(&self) -> bool {
            true
        }
    }

    impl EventSource for FakeSource {
        async fn events_for_day(&mut self, date: Option<NaiveDate>) -> Result<Vec<CalendarEvent>> {
            self.requested.push(date);
            if self.fail {
                return Err(CoreError::Authentication("no token".into()));
            }
            Ok(self.events.clone())
        }

        async fn check_connection(&mut self) -> Result<()> {
            if self.fail {
                Err(CoreError::Authentication("no token".into()))
            } else {
                Ok(())
            }
        }
    }

    #[derive(Default)]
    struct FakeSink {
        created: Mutex<Vec<TaskRecord>>,
        listed: Vec<TaskSummary>,
        reject_containing: Option<&'static str>,
    }

    impl FakeSink {
        fn created(&self) -> Vec<TaskRecord> {
            self.created.lock().unwrap().clone()
        }
    }

    impl Integration for FakeSink {
        fn name(&self) -> &str {
            "fake-tasks"
        }
        fn display_name(&self) -> &str {
            "Fake Tasks"
        }
        fn is_authenticated(&self) -> bool {
            true
        }
    }

    impl TaskSink for FakeSink {
        async fn create_task(&self, task: &TaskRecord) -> Result<String> {
            if self
                .reject_containing
                .is_some_and(|needle| task.title.contains(needle))
            {
                return Err(CoreError::Remote {
                    service: "Fake".into(),
                    status: 400,
                    body: "rejected".into(),
                });
            }
            let mut created = self.created.lock().unwrap();
            created.push(task.clone());
            Ok(format!("page-{}", created.len()))
        }

        async fn list_tasks(&self, _filter: Option<&str>) -> Result<Vec<TaskSummary>> {
            Ok(self.listed.clone())
        }

        async fn create_meeting_summary(
            &self,
            req: &MeetingSummaryRequest,
            max_items: usize,
        ) -> Result<usize> {
            let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
            let records = meeting_summary_tasks(req, max_items, today);
            for record in &records {
                self.create_task(record).await?;
            }
            Ok(records.len() - 1)
        }

        async fn check_connection(&self) -> Result<()> {
            Ok(())
        }
    }

    fn workflow(source: FakeSource, sink: FakeSink) -> Workflow<FakeSource, FakeSink> {
        Workflow::new(source, sink, ExtractionConfig::default())
    }

    fn event(title: &str, description: &str) -> CalendarEvent {
        CalendarEvent {
            title: title.into(),
            start_time: "2024-03-01T10:00:00Z".into(),
            description: description.into(),
            location: crate::pipeline::model::NO_LOCATION.into(),
            attendees: vec!["a@example.com".into()],
        }
    }

    #[tokio::test]
    async fn create_task_reports_page_id_and_drops_bad_due_date() {
        let wf = workflow(FakeSource::default(), FakeSink::default());
        let msg = wf
            .create_task(TaskInput {
                title: "Write report".into(),
                due_date: Some("next friday".into()),
                priority: Some("high".into()),
                ..Default::default()
            })
            .await;
        assert_eq!(msg, "✅ Task created successfully: 'Write report'\nPage ID: page-1");

        let created = wf.sink.created();
        assert_eq!(created[0].due_date, None);
        assert_eq!(created[0].priority, Priority::High);
        assert_eq!(created[0].source, TaskSource::Calendar);
    }

    #[tokio::test]
    async fn create_task_rejects_unknown_priority() {
        let wf = workflow(FakeSource::default(), FakeSink::default());
        let msg = wf
            .create_task(TaskInput {
                title: "x".into(),
                priority: Some("urgent".into()),
                ..Default::default()
            })
            .await;
        assert!(msg.starts_with("❌ Error creating task: Invalid priority"), "{msg}");
        assert!(wf.sink.created().is_empty());
    }

    #[tokio::test]
    async fn bulk_create_rejects_invalid_json() {
        let wf = workflow(FakeSource::default(), FakeSink::default());
        assert_eq!(
            wf.create_tasks_from_events("{not json", true).await,
            "❌ Error: Invalid JSON format for events."
        );
        assert_eq!(
            wf.create_tasks_from_events(r#"[{"start_time": "2024-03-01"}]"#, true)
                .await,
            "❌ Error: Invalid JSON format for events."
        );
    }

    #[tokio::test]
    async fn bulk_create_lists_events_and_actions() {
        let wf = workflow(FakeSource::default(), FakeSink::default());
        let json = r#"[
            {"title": "Standup", "start_time": "2024-03-01T09:00:00Z",
             "description": "- TODO: call vendor\nchit chat"},
            {"title": "Lunch"}
        ]"#;
        let msg = wf.create_tasks_from_events(json, true).await;
        assert_eq!(
            msg,
            "✅ Created 3 tasks from calendar events:\n\
             • Event: Standup\n\
             • Action: TODO: call vendor\n\
             • Event: Lunch"
        );

        let msg = wf.create_tasks_from_events(json, false).await;
        assert!(msg.starts_with("✅ Created 2 tasks"), "{msg}");
    }

    #[tokio::test]
    async fn bulk_create_keeps_going_after_a_failure() {
        let sink = FakeSink {
            reject_containing: Some("Broken"),
            ..Default::default()
        };
        let wf = workflow(FakeSource::default(), sink);
        let msg = wf
            .create_tasks_from_events(r#"[{"title": "Broken"}, {"title": "Fine"}]"#, true)
            .await;
        assert!(msg.starts_with("✅ Created 1 tasks from calendar events:\n• Event: Fine"), "{msg}");
        assert!(msg.contains("❌ Failed to create 1 tasks:\n• Event: Broken"), "{msg}");
    }

    #[tokio::test]
    async fn meeting_summary_parses_action_items() {
        let wf = workflow(FakeSource::default(), FakeSink::default());
        let msg = wf
            .create_meeting_summary(MeetingSummaryInput {
                meeting_title: "Retro".into(),
                meeting_date: Some("2024-03-01".into()),
                attendees: "a@example.com, b@example.com".into(),
                summary: "went fine".into(),
                action_items: r#"["one", "two"]"#.into(),
            })
            .await;
        assert_eq!(msg, "✅ Created meeting summary and 2 action items for: Retro");

        let created = wf.sink.created();
        assert_eq!(created.len(), 3);
        assert!(created[0]
            .description
            .contains("👥 Attendees: a@example.com, b@example.com"));

        let msg = wf
            .create_meeting_summary(MeetingSummaryInput {
                meeting_title: "Retro".into(),
                action_items: "not a list".into(),
                ..Default::default()
            })
            .await;
        assert!(msg.starts_with("❌ Error creating meeting summary:"), "{msg}");
    }

    #[tokio::test]
    async fn list_tasks_formats_rows() {
        let sink = FakeSink {
            listed: vec![TaskSummary {
                title: "Ship it".into(),
                status: "Not started".into(),
                priority: "High".into(),
            }],
            ..Default::default()
        };
        let wf = workflow(FakeSource::default(), sink);
        assert_eq!(
            wf.list_tasks(Some("high")).await,
            "📋 Found 1 tasks:\n• Ship it [Not started] - High priority"
        );

        let wf = workflow(FakeSource::default(), FakeSink::default());
        assert_eq!(wf.list_tasks(None).await, "📋 No tasks found in the database.");
    }

    #[tokio::test]
    async fn sync_with_no_events_is_not_an_error() {
        let mut wf = workflow(FakeSource::default(), FakeSink::default());
        assert_eq!(wf.sync_today().await, "📅 No events found for today.");
        assert_eq!(wf.sync_date("2024-03-01").await, "📅 No events found for 2024-03-01.");
        assert_eq!(wf.history().len(), 2);
        let last = wf.history().last().unwrap();
        assert_eq!(last.event_count, 0);
        assert_eq!(last.tasks_created, 0);
        assert_eq!(
            wf.source.requested,
            vec![None, NaiveDate::from_ymd_opt(2024, 3, 1)]
        );
    }

    #[tokio::test]
    async fn sync_rejects_bad_date_without_fetching() {
        let mut wf = workflow(FakeSource::default(), FakeSink::default());
        assert_eq!(
            wf.sync_date("03/01/2024").await,
            "❌ Invalid date format. Please use YYYY-MM-DD."
        );
        assert!(wf.source.requested.is_empty());
        assert!(wf.history().is_empty());
    }

    #[tokio::test]
    async fn sync_creates_tasks_and_meeting_summaries() {
        let notes = "Weekly review meeting for the launch.\n- TODO: update the roadmap doc\n- assign owners to bugs";
        let source = FakeSource {
            events: vec![event("Planning", notes), event("Lunch", "No description")],
            ..Default::default()
        };
        let mut wf = workflow(source, FakeSink::default());
        let msg = wf.sync_today().await;

        assert!(msg.starts_with("📊 Found 2 events for today\n✅ Created 4 tasks"), "{msg}");
        assert!(
            msg.contains("📊 Created meeting summary and 2 action items for: Planning"),
            "{msg}"
        );
        assert!(msg.ends_with("✅ Sync completed."), "{msg}");

        // 2 event tasks + 2 actions, then 1 summary + 2 actions.
        assert_eq!(wf.sink.created().len(), 7);
        let last = wf.history().last().unwrap();
        assert_eq!(last.sync_type, SyncType::Today);
        assert_eq!(last.event_count, 2);
        assert_eq!(last.tasks_created, 7);
        assert_eq!(last.action_items, 4);
    }

    #[tokio::test]
    async fn meeting_summaries_can_be_disabled() {
        let notes = "Weekly review meeting for the launch.\n- TODO: update the roadmap doc";
        let source = FakeSource {
            events: vec![event("Planning", notes)],
            ..Default::default()
        };
        let extraction = ExtractionConfig {
            meeting_summaries: false,
            ..Default::default()
        };
        let mut wf = Workflow::new(source, FakeSink::default(), extraction);
        wf.sync_today().await;
        assert_eq!(wf.sink.created().len(), 2);
    }

    #[tokio::test]
    async fn source_failure_is_reported_as_text() {
        let source = FakeSource {
            fail: true,
            ..Default::default()
        };
        let mut wf = workflow(source, FakeSink::default());
        let msg = wf.sync_today().await;
        assert!(msg.starts_with("❌ Error fetching calendar events: Authentication error"), "{msg}");

        let msg = wf.check_connections().await;
        assert_eq!(
            msg,
            "❌ Fake Calendar: Authentication error: no token\n✅ Fake Tasks: connected"
        );
    }

    #[tokio::test]
    async fn events_json_round_trips_into_bulk_import() {
        let source = FakeSource {
            events: vec![event("Standup", "No description")],
            ..Default::default()
        };
        let mut wf = workflow(source, FakeSink::default());
        let json = wf.events_json(Some("2024-03-01")).await;
        let msg = wf.create_tasks_from_events(&json, true).await;
        assert_eq!(msg, "✅ Created 1 tasks from calendar events:\n• Event: Standup");

        assert_eq!(wf.events_json(Some("tomorrow")).await, INVALID_DATE);
    }

    #[tokio::test]
    async fn events_json_reports_empty_day() {
        let mut wf = workflow(FakeSource::default(), FakeSink::default());
        assert_eq!(wf.events_json(None).await, "No events found for today.");
    }

    #[test]
    fn analysis_is_json() {
        let out = Workflow::<FakeSource, FakeSink>::analyze_meeting_notes(
            "We will discuss the budget\nTODO: send notes to @sam",
        );
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["summary"], "Meeting details extracted");
        assert_eq!(v["key_topics"][0], "We will discuss the budget");
        assert_eq!(v["potential_action_items"][0], "TODO: send notes to @sam");
    }
}
