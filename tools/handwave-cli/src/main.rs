//! Handwave CLI: drive the gesture-responsive avatar from the command line.
//!
//! Usage:
//!   handwave table                 Show the gesture-to-behavior map
//!   handwave simulate <SCRIPT>     Run a detection recording through the orchestrator
//!   handwave replay <SCRIPT>       Replay a recording through a live session
//!   handwave config init|show|check

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use handwave_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "handwave",
    about = "Gesture-driven avatar responses",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of the standard location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show how each gesture maps to a behavior
    Table {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a detection recording through the orchestrator on a simulated clock
    Simulate {
        /// Path to a JSONL detection recording
        script: PathBuf,

        /// Animation tick interval (milliseconds)
        #[arg(long, default_value = "16")]
        tick_ms: u64,

        /// Keep simulating this long after the last detection (seconds)
        #[arg(long, default_value = "5.0")]
        tail_secs: f64,

        /// Print transitions as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Replay a detection recording through a real-time session
    Replay {
        /// Path to a JSONL detection recording
        script: PathBuf,

        /// Keep the session running this long after the recording ends (seconds)
        #[arg(long, default_value = "4.0")]
        tail_secs: f64,

        /// Record delivered detections to this file
        #[arg(long)]
        record: Option<PathBuf>,

        /// Print published frames as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write the default configuration
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,

    /// Validate a configuration file
    Check {
        /// File to check (defaults to the standard location)
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {e}", path.display()))?,
        None => AppConfig::load(),
    };

    // Initialize logging
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    handwave_common::logging::init_logging(&logging);
    tracing::debug!(
        config = ?cli.config,
        crossfade_ms = config.response.crossfade_ms,
        auto_revert_ms = config.response.auto_revert_ms,
        "Configuration loaded"
    );

    match cli.command {
        Commands::Table { json } => commands::table::run(&config, json),
        Commands::Simulate {
            script,
            tick_ms,
            tail_secs,
            json,
        } => commands::simulate::run(&config, script, tick_ms, tail_secs, json),
        Commands::Replay {
            script,
            tail_secs,
            record,
            json,
        } => commands::replay::run(&config, script, tail_secs, record, json).await,
        Commands::Config { action } => match action {
            ConfigAction::Init { force } => commands::config::init(force),
            ConfigAction::Show => commands::config::show(&config),
            ConfigAction::Check { path } => commands::config::check(path),
        },
    }
}
