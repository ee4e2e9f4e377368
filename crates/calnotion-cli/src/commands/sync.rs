use calnotion_core::{Config, SyncResult};

use super::CliResult;

pub async fn run(date: Option<String>, json: bool) -> CliResult {
    let config = Config::load()?;
    let mut wf = super::workflow(&config);
    let message = match date {
        Some(date) => wf.sync_date(&date).await,
        None => wf.sync_today().await,
    };
    println!("{}", render(message, wf.history().last(), json)?);
    Ok(())
}

/// The sync message, or the recorded result as JSON when asked for and one exists.
fn render(message: String, recorded: Option<&SyncResult>, json: bool) -> serde_json::Result<String> {
    match recorded {
        Some(result) if json => serde_json::to_string_pretty(result),
        _ => Ok(message),
    }
}
