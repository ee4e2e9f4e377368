//! Meeting summary commands for CLI.

use calnotion_core::{Config, GoogleCalendar, MeetingSummaryInput, NotionTasks, Workflow};
use clap::Subcommand;

use super::CliResult;

#[derive(Subcommand)]
pub enum MeetingAction {
    /// Create a meeting summary task plus one task per action item
    Summary {
        /// Meeting title
        title: String,
        /// Summary text
        #[arg(long)]
        summary: String,
        /// Meeting date (YYYY-MM-DD), default today
        #[arg(long)]
        date: Option<String>,
        /// Comma-separated attendees
        #[arg(long, default_value = "")]
        attendees: String,
        /// Action item (repeatable)
        #[arg(long = "action-item")]
        action_items: Vec<String>,
    },
    /// Print action items and topics found in meeting notes
    Analyze {
        /// Notes text, or `-` for stdin
        text: String,
    },
}

pub async fn run(action: MeetingAction) -> CliResult {
    match action {
        MeetingAction::Summary {
            title,
            summary,
            date,
            attendees,
            action_items,
        } => {
            let config = Config::load()?;
            let wf = super::workflow(&config);
            let message = wf
                .create_meeting_summary(MeetingSummaryInput {
                    meeting_title: title,
                    meeting_date: date,
                    attendees,
                    summary,
                    action_items: serde_json::to_string(&action_items)?,
                })
                .await;
            println!("{message}");
        }
        MeetingAction::Analyze { text } => {
            let text = notes_text(text)?;
            println!(
                "{}",
                Workflow::<GoogleCalendar, NotionTasks>::analyze_meeting_notes(&text)
            );
        }
    }
    Ok(())
}

/// The notes themselves, or stdin when given `-`.
fn notes_text(text: String) -> std::io::Result<String> {
    if text == "-" {
        super::read_input("-")
    } else {
        Ok(text)
    }
}
