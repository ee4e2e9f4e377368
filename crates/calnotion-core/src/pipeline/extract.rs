//! Keyword heuristics over free-text event descriptions.
//!
//! Everything here is a single linear pass over the lines of the text:
//! a line is flagged when it contains one of a fixed set of keywords,
//! compared case-insensitively.

use serde::{Deserialize, Serialize};

use super::model::CalendarEvent;

/// Keywords that flag a line as an action item.
pub const ACTION_KEYWORDS: [&str; 7] = [
    "todo",
    "action item",
    "follow up",
    "assign",
    "task",
    "deadline",
    "due",
];

/// Keywords that flag a line as a discussion topic.
pub const TOPIC_KEYWORDS: [&str; 7] = [
    "discuss", "review", "plan", "strategy", "budget", "timeline", "project",
];

/// Keywords that make an event look like a meeting worth summarizing.
pub const MEETING_KEYWORDS: [&str; 6] = ["meeting", "discuss", "review", "action", "todo", "follow"];

/// Cleaned items must be longer than this many characters.
const MIN_ITEM_CHARS: usize = 10;

/// Descriptions must be longer than this to get a meeting summary.
const MIN_MEETING_DESCRIPTION_CHARS: usize = 50;

/// Caps applied to one extraction pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionLimits {
    /// Maximum number of action items kept per text.
    pub max_items: usize,
    /// Maximum length, in characters, of each kept item.
    pub title_limit: usize,
}

impl ExtractionLimits {
    /// Limits used when bulk-creating tasks from events.
    pub const BULK: ExtractionLimits = ExtractionLimits {
        max_items: 5,
        title_limit: 100,
    };

    /// Limits used when building a meeting summary.
    pub const SUMMARY: ExtractionLimits = ExtractionLimits {
        max_items: 3,
        title_limit: 80,
    };
}

impl Default for ExtractionLimits {
    fn default() -> Self {
        Self::BULK
    }
}

fn contains_any(line_lower: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| line_lower.contains(k))
}

/// Strip bullet markers ("- " and "* ") and surrounding whitespace.
fn clean_line(line: &str) -> String {
    line.trim().replace("- ", "").replace("* ", "").trim().to_string()
}

fn truncate_chars(s: &str, limit: usize) -> String {
    s.chars().take(limit).collect()
}

/// Extract action items from free text.
///
/// Matching is case-insensitive but the returned items keep the casing of
/// the source text. Items of ten characters or fewer are skipped; the rest
/// are truncated to `limits.title_limit` characters and at most
/// `limits.max_items` are returned, in text order.
pub fn extract_action_items(text: &str, limits: ExtractionLimits) -> Vec<String> {
    text.split('\n')
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty() && contains_any(&trimmed.to_lowercase(), &ACTION_KEYWORDS)
        })
        .map(clean_line)
        .filter(|item| item.chars().count() > MIN_ITEM_CHARS)
        .map(|item| truncate_chars(&item, limits.title_limit))
        .take(limits.max_items)
        .collect()
}

/// Whether an event's notes are substantial enough to warrant a meeting summary.
pub fn is_meeting_like(event: &CalendarEvent) -> bool {
    event.has_description()
        && event.description.chars().count() > MIN_MEETING_DESCRIPTION_CHARS
        && contains_any(&event.description.to_lowercase(), &MEETING_KEYWORDS)
}

/// Result of [`analyze_meeting_notes`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MeetingAnalysis {
    pub summary: String,
    pub potential_action_items: Vec<String>,
    pub key_topics: Vec<String>,
    /// Always empty; names are not recognised in free text.
    pub attendees_mentioned: Vec<String>,
}

/// Uncapped scan of meeting notes for action items and topics.
///
/// Unlike [`extract_action_items`] nothing is filtered by length or
/// truncated; every matching line is reported trimmed.
pub fn analyze_meeting_notes(text: &str) -> MeetingAnalysis {
    let mut analysis = MeetingAnalysis {
        summary: "Meeting details extracted".to_string(),
        ..Default::default()
    };

    for line in text.split('\n') {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let lower = trimmed.to_lowercase();
        if contains_any(&lower, &ACTION_KEYWORDS) {
            analysis.potential_action_items.push(trimmed.to_string());
        }
        if contains_any(&lower, &TOPIC_KEYWORDS) {
            analysis.key_topics.push(trimmed.to_string());
        }
    }

    analysis
}
