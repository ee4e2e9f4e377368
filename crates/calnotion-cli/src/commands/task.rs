//! Task record commands for CLI.

use calnotion_core::{Config, TaskInput};
use clap::Subcommand;

use super::CliResult;

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a single task
    Create {
        /// Task title
        title: String,
        /// Task description
        #[arg(long, default_value = "")]
        description: String,
        /// Due date (YYYY-MM-DD); invalid dates are ignored
        #[arg(long)]
        due: Option<String>,
        /// High, Medium or Low (default: Medium)
        #[arg(long)]
        priority: Option<String>,
        /// Calendar or Meeting (default: Calendar)
        #[arg(long)]
        source: Option<String>,
    },
    /// List the ten most recent tasks
    List {
        /// Only tasks with this priority (High, Medium or Low)
        #[arg(long)]
        priority: Option<String>,
    },
    /// Create tasks from a JSON array of events (as printed by `calnotion events`)
    Import {
        /// JSON file, or `-` for stdin
        file: String,
        /// Do not create action item tasks from event notes
        #[arg(long)]
        no_extract: bool,
    },
}

pub async fn run(action: TaskAction) -> CliResult {
    let config = Config::load()?;
    let wf = super::workflow(&config);

    let message = match action {
        TaskAction::Create {
            title,
            description,
            due,
            priority,
            source,
        } => {
            wf.create_task(TaskInput {
                title,
                description,
                due_date: due,
                priority,
                source,
            })
            .await
        }
        TaskAction::List { priority } => wf.list_tasks(priority.as_deref()).await,
        TaskAction::Import { file, no_extract } => {
            let json = super::read_input(&file)?;
            wf.create_tasks_from_events(&json, !no_extract).await
        }
    };
    println!("{message}");
    Ok(())
}
