//! Notion task database sink.
//!
//! Creates pages in a database with the `Name`, `Status`, `Priority`,
//! `Source`, `Created` and optional `Due Date` properties, and lists the
//! most recent ones back.

use std::str::FromStr;

use chrono::{Local, NaiveDate};
use reqwest::{Client, Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::traits::{Integration, TaskSink};
use crate::error::{CoreError, Result};
use crate::pipeline::{meeting_summary_tasks, MeetingSummaryRequest, Priority, TaskRecord, TaskSummary};
use crate::storage::NotionConfig;

const SERVICE: &str = "Notion";
const NOTION_VERSION: &str = "2022-06-28";
const PAGE_SIZE: u32 = 10;
/// Longest content Notion accepts in a single rich text object.
const RICH_TEXT_LIMIT: usize = 2000;
const NEW_STATUS: &str = "Not started";

// ── Request payloads ────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct CreatePage<'a> {
    parent: Parent<'a>,
    properties: PageProperties<'a>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<Block>,
}

#[derive(Debug, Serialize)]
struct Parent<'a> {
    database_id: &'a str,
}

#[derive(Debug, Serialize)]
struct PageProperties<'a> {
    #[serde(rename = "Name")]
    name: TitleProperty,
    #[serde(rename = "Status")]
    status: SelectProperty<'a>,
    #[serde(rename = "Priority")]
    priority: SelectProperty<'a>,
    #[serde(rename = "Source")]
    source: SelectProperty<'a>,
    #[serde(rename = "Created")]
    created: DateProperty,
    #[serde(rename = "Due Date", skip_serializing_if = "Option::is_none")]
    due_date: Option<DateProperty>,
}

#[derive(Debug, Serialize)]
struct TitleProperty {
    title: Vec<RichText>,
}

#[derive(Debug, Serialize)]
struct RichText {
    text: TextContent,
}

#[derive(Debug, Serialize)]
struct TextContent {
    content: String,
}

#[derive(Debug, Serialize)]
struct SelectProperty<'a> {
    select: SelectName<'a>,
}

#[derive(Debug, Serialize)]
struct SelectName<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct DateProperty {
    date: DateStart,
}

#[derive(Debug, Serialize)]
struct DateStart {
    start: String,
}

#[derive(Debug, Serialize)]
struct Block {
    object: &'static str,
    #[serde(rename = "type")]
    kind: &'static str,
    paragraph: Paragraph,
}

#[derive(Debug, Serialize)]
struct Paragraph {
    rich_text: Vec<RichText>,
}

#[derive(Debug, Serialize)]
struct QueryRequest {
    page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<PriorityFilter>,
}

#[derive(Debug, Serialize)]
struct PriorityFilter {
    property: &'static str,
    select: SelectEquals,
}

#[derive(Debug, Serialize)]
struct SelectEquals {
    equals: &'static str,
}

// ── Response payloads ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CreatedPage {
    id: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<PageObject>,
}

#[derive(Debug, Default, Deserialize)]
struct PageObject {
    #[serde(default)]
    properties: ListedProperties,
}

#[derive(Debug, Default, Deserialize)]
struct ListedProperties {
    #[serde(rename = "Name")]
    name: Option<TitleValue>,
    #[serde(rename = "Status")]
    status: Option<OptionValue>,
    #[serde(rename = "Priority")]
    priority: Option<OptionValue>,
}

#[derive(Debug, Deserialize)]
struct TitleValue {
    #[serde(default)]
    title: Vec<TextValue>,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    plain_text: Option<String>,
    text: Option<TextValueContent>,
}

#[derive(Debug, Deserialize)]
struct TextValueContent {
    content: String,
}

/// A `select` property, or a native `status` property.
#[derive(Debug, Deserialize)]
struct OptionValue {
    select: Option<NamedOption>,
    status: Option<NamedOption>,
}

#[derive(Debug, Deserialize)]
struct NamedOption {
    name: String,
}

impl OptionValue {
    fn name(self) -> Option<String> {
        self.select.or(self.status).map(|o| o.name)
    }
}

impl From<PageObject> for TaskSummary {
    fn from(page: PageObject) -> Self {
        let props = page.properties;
        let title = props
            .name
            .and_then(|t| t.title.into_iter().next())
            .and_then(|t| t.plain_text.or(t.text.map(|c| c.content)))
            .unwrap_or_else(|| "Untitled".to_string());
        TaskSummary {
            title,
            status: props
                .status
                .and_then(OptionValue::name)
                .unwrap_or_else(|| "Unknown".to_string()),
            priority: props
                .priority
                .and_then(OptionValue::name)
                .unwrap_or_else(|| "Unknown".to_string()),
        }
    }
}

fn rich_text(content: &str) -> Vec<RichText> {
    let chars: Vec<char> = content.chars().collect();
    chars
        .chunks(RICH_TEXT_LIMIT)
        .map(|chunk| RichText {
            text: TextContent {
                content: chunk.iter().collect(),
            },
        })
        .collect()
}

fn date_property(date: NaiveDate) -> DateProperty {
    DateProperty {
        date: DateStart {
            start: date.format("%Y-%m-%d").to_string(),
        },
    }
}

/// Notion database task sink.
pub struct NotionTasks {
    http: Client,
    api_key: String,
    database_id: String,
    base_url: String,
}

impl NotionTasks {
    pub fn new(config: &NotionConfig) -> Self {
        Self {
            http: Client::new(),
            api_key: config.api_key.clone(),
            database_id: config.database_id.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn ensure_configured(&self) -> Result<()> {
        if self.api_key.is_empty() || self.database_id.is_empty() {
            return Err(CoreError::NotConfigured(
                "Notion API key or database ID not configured.".into(),
            ));
        }
        Ok(())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/{path}", self.base_url))
            .bearer_auth(&self.api_key)
            .header("Notion-Version", NOTION_VERSION)
    }

    fn page_payload<'a>(&'a self, task: &'a TaskRecord) -> CreatePage<'a> {
        let children = if task.description.is_empty() {
            Vec::new()
        } else {
            vec![Block {
                object: "block",
                kind: "paragraph",
                paragraph: Paragraph {
                    rich_text: rich_text(&task.description),
                },
            }]
        };

        CreatePage {
            parent: Parent {
                database_id: &self.database_id,
            },
            properties: PageProperties {
                name: TitleProperty {
                    title: rich_text(&task.title),
                },
                status: SelectProperty {
                    select: SelectName { name: NEW_STATUS },
                },
                priority: SelectProperty {
                    select: SelectName {
                        name: task.priority.as_str(),
                    },
                },
                source: SelectProperty {
                    select: SelectName {
                        name: task.source.as_str(),
                    },
                },
                created: DateProperty {
                    date: DateStart {
                        start: Local::now().to_rfc3339(),
                    },
                },
                due_date: task.due_date.map(date_property),
            },
            children,
        }
    }

    fn query_payload(priority_filter: Option<&str>) -> QueryRequest {
        let filter = priority_filter.and_then(|raw| match Priority::from_str(raw) {
            Ok(p) => Some(PriorityFilter {
                property: "Priority",
                select: SelectEquals { equals: p.as_str() },
            }),
            Err(_) => {
                debug!(filter = %raw, "ignoring unknown priority filter");
                None
            }
        });
        QueryRequest {
            page_size: PAGE_SIZE,
            filter,
        }
    }
}

impl Integration for NotionTasks {
    fn name(&self) -> &str {
        "notion"
    }

    fn display_name(&self) -> &str {
        SERVICE
    }

    fn is_authenticated(&self) -> bool {
        !self.api_key.is_empty() && !self.database_id.is_empty()
    }
}

impl TaskSink for NotionTasks {
    async fn create_task(&self, task: &TaskRecord) -> Result<String> {
        self.ensure_configured()?;

        let resp = self
            .request(Method::POST, "pages")
            .json(&self.page_payload(task))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(CoreError::from_response(SERVICE, resp).await);
        }

        let page: CreatedPage = resp.json().await?;
        info!(page_id = %page.id, title = %task.title, "created Notion page");
        Ok(page.id)
    }

    async fn list_tasks(&self, priority_filter: Option<&str>) -> Result<Vec<TaskSummary>> {
        self.ensure_configured()?;

        let path = format!("databases/{}/query", self.database_id);
        let resp = self
            .request(Method::POST, &path)
            .json(&Self::query_payload(priority_filter))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(CoreError::from_response(SERVICE, resp).await);
        }

        let body: QueryResponse = resp.json().await?;
        Ok(body.results.into_iter().map(TaskSummary::from).collect())
    }

    async fn create_meeting_summary(
        &self,
        req: &MeetingSummaryRequest,
        max_items: usize,
    ) -> Result<usize> {
        self.ensure_configured()?;

        let records = meeting_summary_tasks(req, max_items, Local::now().date_naive());
        for record in &records {
            self.create_task(record).await?;
        }
        Ok(records.len().saturating_sub(1))
    }

    async fn check_connection(&self) -> Result<()> {
        self.ensure_configured()?;
        let resp = self.request(Method::GET, "users/me").send().await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(CoreError::from_response(SERVICE, resp).await)
        }
    }
}
