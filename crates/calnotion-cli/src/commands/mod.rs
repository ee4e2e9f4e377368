pub mod auth;
pub mod check;
pub mod completions;
pub mod config;
pub mod events;
pub mod meeting;
pub mod sync;
pub mod task;

use std::io::Read;

use calnotion_core::{Config, GoogleCalendar, KeyringTokenStore, NotionTasks, Workflow};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// The workflow every networked command runs through.
pub fn workflow(config: &Config) -> Workflow<GoogleCalendar, NotionTasks> {
    Workflow::new(
        GoogleCalendar::new(&config.google, Box::new(KeyringTokenStore)),
        NotionTasks::new(&config.notion),
        config.extraction.clone(),
    )
}

/// Contents of `path`, or of stdin when `path` is `-`.
pub fn read_input(path: &str) -> std::io::Result<String> {
    if path == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path)
    }
}
