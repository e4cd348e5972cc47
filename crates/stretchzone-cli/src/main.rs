use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "stretchzone", version, about = "Stretchzone CLI")]
struct Cli {
    /// Challenge catalog (JSON array). Defaults to the bundled catalog.
    #[arg(long, global = true, value_name = "PATH")]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Daily challenge
    Challenge {
        #[command(subcommand)]
        action: commands::challenge::ChallengeAction,
    },
    /// Mood check-ins
    Mood {
        #[command(subcommand)]
        action: commands::mood::MoodAction,
    },
    /// Experience points and level
    Xp {
        #[command(subcommand)]
        action: commands::xp::XpAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Wipe XP, mood history and the current challenge
    Reset {
        /// Skip the confirmation guard
        #[arg(long)]
        yes: bool,
    },
    /// Print shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("STRETCHZONE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let catalog = cli.catalog.as_deref();

    let result = match cli.command {
        Commands::Challenge { action } => commands::challenge::run(action, catalog).await,
        Commands::Mood { action } => commands::mood::run(action, catalog).await,
        Commands::Xp { action } => commands::xp::run(action, catalog).await,
        Commands::Config { action } => commands::config::run(action),
        Commands::Reset { yes } => commands::reset(yes, catalog).await,
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "stretchzone", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
