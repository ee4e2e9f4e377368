use calnotion_core::{
    Config, EventSource, GoogleCalendar, Integration, KeyringTokenStore, NotionTasks, TaskSink,
};
use clap::Subcommand;

use super::CliResult;

#[derive(Subcommand)]
pub enum AuthAction {
    /// Google Calendar: login / logout / status
    Google {
        #[command(subcommand)]
        action: AuthOp,
    },
    /// Notion: login / logout / status
    Notion {
        #[command(subcommand)]
        action: AuthOp,
    },
}

#[derive(Subcommand)]
pub enum AuthOp {
    /// Authenticate with the service
    Login {
        /// API token (for Notion)
        #[arg(long)]
        token: Option<String>,
        /// Database ID (for Notion)
        #[arg(long)]
        database_id: Option<String>,
        /// OAuth client ID (for Google)
        #[arg(long)]
        client_id: Option<String>,
        /// OAuth client secret (for Google)
        #[arg(long)]
        client_secret: Option<String>,
    },
    /// Remove credentials
    Logout,
    /// Check authentication status
    Status,
}

pub async fn run(action: AuthAction) -> CliResult {
    match action {
        AuthAction::Google { action: op } => handle_google(op).await,
        AuthAction::Notion { action: op } => handle_notion(op).await,
    }
}

fn status_line(authenticated: bool) -> &'static str {
    if authenticated {
        "authenticated"
    } else {
        "not authenticated"
    }
}

async fn handle_google(op: AuthOp) -> CliResult {
    match op {
        AuthOp::Login {
            client_id,
            client_secret,
            ..
        } => {
            if client_id.is_some() || client_secret.is_some() {
                let mut file = Config::load_file()?;
                if let Some(cid) = client_id {
                    file.google.client_id = cid;
                }
                if let Some(csec) = client_secret {
                    file.google.client_secret = csec;
                }
                file.save()?;
            }

            let config = Config::load()?;
            if !config.google.has_client_credentials() {
                return Err(
                    "--client-id and --client-secret required for Google (or set GOOGLE_CLIENT_ID / GOOGLE_CLIENT_SECRET)"
                        .into(),
                );
            }
            let mut google = GoogleCalendar::new(&config.google, Box::new(KeyringTokenStore));
            google.authorize().await?;
            google.check_connection().await?;
            println!("Google authenticated");
        }
        AuthOp::Logout => {
            let config = Config::load()?;
            let mut google = GoogleCalendar::new(&config.google, Box::new(KeyringTokenStore));
            google.disconnect()?;
            println!("Google disconnected");
        }
        AuthOp::Status => {
            let config = Config::load()?;
            let google = GoogleCalendar::new(&config.google, Box::new(KeyringTokenStore));
            println!("{}", status_line(google.is_authenticated()));
        }
    }
    Ok(())
}

async fn handle_notion(op: AuthOp) -> CliResult {
    match op {
        AuthOp::Login {
            token, database_id, ..
        } => {
            let tok = token.ok_or("--token required for Notion")?;
            let db_id = database_id.ok_or("--database-id required for Notion")?;

            let mut file = Config::load_file()?;
            file.notion.api_key = tok;
            file.notion.database_id = db_id;
            file.save()?;

            NotionTasks::new(&file.notion).check_connection().await?;
            println!("Notion authenticated");
        }
        AuthOp::Logout => {
            let mut file = Config::load_file()?;
            file.notion.api_key.clear();
            file.notion.database_id.clear();
            file.save()?;
            println!("Notion disconnected");
        }
        AuthOp::Status => {
            let config = Config::load()?;
            println!(
                "{}",
                status_line(NotionTasks::new(&config.notion).is_authenticated())
            );
        }
    }
    Ok(())
}
