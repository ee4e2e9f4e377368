use calnotion_core::Config;

use super::CliResult;

pub async fn run() -> CliResult {
    let config = Config::load()?;
    let mut wf = super::workflow(&config);
    println!("{}", wf.check_connections().await);
    Ok(())
}
