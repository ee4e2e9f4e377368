//! Transformation pipeline: calendar events in, task records out.

pub mod extract;
pub mod model;
pub mod transform;

pub use extract::{
    analyze_meeting_notes, extract_action_items, is_meeting_like, ExtractionLimits,
    MeetingAnalysis,
};
pub use model::{
    CalendarEvent, MeetingSummaryRequest, Priority, SyncHistory, SyncResult, SyncType, TaskRecord,
    TaskSource, TaskSummary,
};
pub use transform::{
    due_date_from_start, event_task, event_tasks, meeting_summary_request, meeting_summary_tasks,
    parse_due_date,
};
