use chrono::NaiveDate;

use crate::error::Result;
use crate::pipeline::{CalendarEvent, MeetingSummaryRequest, TaskRecord, TaskSummary};

/// Every external service integration implements this trait.
pub trait Integration: Send + Sync {
    /// Unique identifier (e.g. "google", "notion").
    fn name(&self) -> &str;

    /// Human-readable display name.
    fn display_name(&self) -> &str;

    /// Whether credentials for this service are available locally.
    fn is_authenticated(&self) -> bool;
}

/// Where calendar events come from.
#[allow(async_fn_in_trait)]
pub trait EventSource: Integration {
    /// Events starting within `[date, date + 1 day)`, in start order.
    /// `None` means the current local day.
    async fn events_for_day(&mut self, date: Option<NaiveDate>) -> Result<Vec<CalendarEvent>>;

    /// Cheap authenticated request proving the service is reachable.
    async fn check_connection(&mut self) -> Result<()>;
}

/// Where task records go.
#[allow(async_fn_in_trait)]
pub trait TaskSink: Integration {
    /// Create one record, returning its remote id.
    async fn create_task(&self, task: &TaskRecord) -> Result<String>;

    /// Up to ten records, optionally filtered by priority name.
    async fn list_tasks(&self, priority_filter: Option<&str>) -> Result<Vec<TaskSummary>>;

    /// Create a summary record plus up to `max_items` action items,
    /// returning how many action items were created.
    async fn create_meeting_summary(
        &self,
        req: &MeetingSummaryRequest,
        max_items: usize,
    ) -> Result<usize>;

    /// Cheap authenticated request proving the service is reachable.
    async fn check_connection(&self) -> Result<()>;
}
