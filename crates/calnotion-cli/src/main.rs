use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "calnotion",
    version,
    about = "Sync Google Calendar events into a Notion task database"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create tasks for the events of today or of a given day
    Sync {
        /// Day to sync (YYYY-MM-DD), default today
        #[arg(long)]
        date: Option<String>,
        /// Print the recorded sync result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the events of a day as JSON
    Events {
        /// Day to fetch (YYYY-MM-DD), default today
        #[arg(long)]
        date: Option<String>,
        /// Calendar to read instead of the configured one
        #[arg(long)]
        calendar: Option<String>,
    },
    /// Task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Meeting summaries and note analysis
    Meeting {
        #[command(subcommand)]
        action: commands::meeting::MeetingAction,
    },
    /// Authentication management for integrations
    Auth {
        #[command(subcommand)]
        action: commands::auth::AuthAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Check that both services are reachable
    Check,
    /// Generate shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Sync { date, json } => commands::sync::run(date, json).await,
        Commands::Events { date, calendar } => commands::events::run(date, calendar).await,
        Commands::Task { action } => commands::task::run(action).await,
        Commands::Meeting { action } => commands::meeting::run(action).await,
        Commands::Auth { action } => commands::auth::run(action).await,
        Commands::Config { action } => commands::config::run(action),
        Commands::Check => commands::check::run().await,
        Commands::Completions { shell } => commands::completions::run(shell, Cli::command()),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
