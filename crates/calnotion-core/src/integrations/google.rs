//! Google Calendar event source.
//!
//! Reads the events of one day from the Calendar v3 API. Uses OAuth2 with a
//! read-only calendar scope; the token lives in a [`CredentialCache`].

use chrono::{Duration, Local, NaiveDate, NaiveTime};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use super::oauth::{CredentialCache, OAuthConfig, TokenStore};
use super::traits::{EventSource, Integration};
use crate::error::{CoreError, Result};
use crate::pipeline::model::{NO_DESCRIPTION, NO_LOCATION, NO_TITLE};
use crate::pipeline::{parse_due_date, CalendarEvent};
use crate::storage::GoogleConfig;

const SERVICE: &str = "Google Calendar";
const SCOPE_READONLY: &str = "https://www.googleapis.com/auth/calendar.readonly";

#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    items: Vec<GoogleEvent>,
}

#[derive(Debug, Deserialize)]
struct GoogleEvent {
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    start: Option<EventDateTime>,
    #[serde(default)]
    attendees: Vec<Attendee>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventDateTime {
    date_time: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Attendee {
    email: Option<String>,
}

impl From<GoogleEvent> for CalendarEvent {
    fn from(ev: GoogleEvent) -> Self {
        let start_time = ev
            .start
            .and_then(|s| s.date_time.or(s.date))
            .unwrap_or_default();
        CalendarEvent {
            title: ev.summary.unwrap_or_else(|| NO_TITLE.to_string()),
            start_time,
            description: ev.description.unwrap_or_else(|| NO_DESCRIPTION.to_string()),
            location: ev.location.unwrap_or_else(|| NO_LOCATION.to_string()),
            attendees: ev.attendees.into_iter().filter_map(|a| a.email).collect(),
        }
    }
}

/// `[date 00:00Z, date+1 00:00Z)` as RFC 3339 strings.
fn day_bounds(date: NaiveDate) -> (String, String) {
    let start = date.and_time(NaiveTime::MIN);
    let end = start + Duration::days(1);
    let fmt = "%Y-%m-%dT%H:%M:%SZ";
    (start.format(fmt).to_string(), end.format(fmt).to_string())
}

/// Google Calendar event source.
pub struct GoogleCalendar {
    http: Client,
    base_url: String,
    calendar_id: String,
    credentials: CredentialCache,
}

impl GoogleCalendar {
    pub fn new(config: &GoogleConfig, store: Box<dyn TokenStore>) -> Self {
        let http = Client::new();
        let credentials = CredentialCache::new(Self::oauth_config(config), store, http.clone());
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            calendar_id: config.calendar_id.clone(),
            credentials,
        }
    }

    fn oauth_config(config: &GoogleConfig) -> OAuthConfig {
        OAuthConfig {
            service_name: "google".to_string(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            auth_url: config.auth_url.clone(),
            token_url: config.token_url.clone(),
            scopes: vec![SCOPE_READONLY.to_string()],
            redirect_port: config.redirect_port,
        }
    }

    /// Run the interactive OAuth flow in the browser.
    pub async fn authorize(&mut self) -> Result<()> {
        self.credentials.authorize().await
    }

    /// Remove stored tokens.
    pub fn disconnect(&mut self) -> Result<()> {
        self.credentials.clear()
    }

    fn url(&self, segments: &[&str]) -> Result<url::Url> {
        let mut url = url::Url::parse(&self.base_url)
            .map_err(|e| CoreError::MalformedInput(format!("invalid Google base url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| CoreError::MalformedInput("Google base url cannot hold a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Events of `date` (default: today) in `calendar_id`, ordered by start time.
    pub async fn events_for_calendar(
        &mut self,
        date: Option<NaiveDate>,
        calendar_id: &str,
    ) -> Result<Vec<CalendarEvent>> {
        let token = self.credentials.access_token().await?;
        let date = date.unwrap_or_else(|| Local::now().date_naive());
        let (time_min, time_max) = day_bounds(date);
        let url = self.url(&["calendars", calendar_id, "events"])?;

        debug!(%calendar_id, %time_min, %time_max, "listing calendar events");
        let resp = self
            .http
            .get(url)
            .bearer_auth(&token)
            .query(&[
                ("timeMin", time_min.as_str()),
                ("timeMax", time_max.as_str()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(CoreError::from_response(SERVICE, resp).await);
        }

        let body: EventsResponse = resp.json().await?;
        let events: Vec<CalendarEvent> = body.items.into_iter().map(CalendarEvent::from).collect();
        info!(count = events.len(), %date, "fetched calendar events");
        Ok(events)
    }

    /// Like [`EventSource::events_for_day`] but takes a `YYYY-MM-DD` string.
    pub async fn events_for_date_str(&mut self, date: &str) -> Result<Vec<CalendarEvent>> {
        let date = parse_due_date(date).ok_or_else(|| {
            CoreError::MalformedInput("Invalid date format. Please use YYYY-MM-DD.".into())
        })?;
        self.events_for_day(Some(date)).await
    }
}

impl Integration for GoogleCalendar {
    fn name(&self) -> &str {
        "google"
    }

    fn display_name(&self) -> &str {
        SERVICE
    }

    fn is_authenticated(&self) -> bool {
        self.credentials.is_authenticated()
    }
}

impl EventSource for GoogleCalendar {
    async fn events_for_day(&mut self, date: Option<NaiveDate>) -> Result<Vec<CalendarEvent>> {
        let calendar_id = self.calendar_id.clone();
        self.events_for_calendar(date, &calendar_id).await
    }

    async fn check_connection(&mut self) -> Result<()> {
        let token = self.credentials.access_token().await?;
        let url = self.url(&["users", "me", "calendarList"])?;
        let resp = self
            .http
            .get(url)
            .bearer_auth(&token)
            .query(&[("maxResults", "1")])
            .send()
            .await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(CoreError::from_response(SERVICE, resp).await)
        }
    }
}
