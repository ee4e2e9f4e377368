use calnotion_core::Config;

use super::CliResult;

pub async fn run(date: Option<String>, calendar: Option<String>) -> CliResult {
    let mut config = Config::load()?;
    if let Some(calendar) = calendar {
        config.google.calendar_id = calendar;
    }
    let mut wf = super::workflow(&config);
    println!("{}", wf.events_json(date.as_deref()).await);
    Ok(())
}
