//! # calnotion Core Library
//!
//! Business logic for syncing one day of calendar events into a task
//! database. The `calnotion` CLI is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Integrations**: the Google Calendar event source, the Notion task sink
//!   and the OAuth credential cache the calendar relies on
//! - **Pipeline**: keyword heuristics and the event → task record mapping
//! - **Storage**: TOML-based configuration
//! - **Workflow**: source → pipeline → sink orchestration with textual results
//!
//! ## Key Components
//!
//! - [`GoogleCalendar`]: events of one day
//! - [`NotionTasks`]: task record creation and listing
//! - [`Workflow`]: every user-facing operation
//! - [`Config`]: application configuration management

pub mod error;
pub mod integrations;
pub mod pipeline;
pub mod storage;
pub mod workflow;

pub use error::{ConfigError, CoreError, OAuthError, Result};
pub use integrations::{
    CredentialCache, EventSource, GoogleCalendar, Integration, KeyringTokenStore,
    MemoryTokenStore, NotionTasks, TaskSink, TokenStore,
};
pub use pipeline::{
    CalendarEvent, ExtractionLimits, MeetingAnalysis, MeetingSummaryRequest, Priority, SyncHistory,
    SyncResult, SyncType, TaskRecord, TaskSource, TaskSummary,
};
pub use storage::{Config, ExtractionConfig, GoogleConfig, NotionConfig};
pub use workflow::{MeetingSummaryInput, TaskInput, Workflow};
