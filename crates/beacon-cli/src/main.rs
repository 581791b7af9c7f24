//! beacon CLI - run the service and inspect its data from the command line.

mod commands;
mod output;

use anyhow::Result;
use beacon_core::{Channel, Priority};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "beacon")]
#[command(author, version, about = "Changelog pipeline and notification router")]
#[command(propagate_version = true)]
struct Cli {
    /// Output format
    #[arg(long, global = true, default_value = "human")]
    format: output::OutputFormat,

    /// Log format
    #[arg(long, global = true, default_value = "human", env = "BEACON_LOG_FORMAT")]
    log_format: LogFormat,

    /// Data directory (defaults to `store.path` from the config)
    #[arg(long, short = 'C', global = true, env = "BEACON_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Config file
    #[arg(long, global = true, default_value = "beacon.yml", env = "BEACON_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Human,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a data directory
    Init,

    /// Start the HTTP service
    Serve {
        /// Port to listen on (overrides config)
        #[arg(long, short = 'p', env = "BEACON_PORT")]
        port: Option<u16>,

        /// Host to bind to (overrides config)
        #[arg(long, env = "BEACON_HOST")]
        host: Option<String>,
    },

    /// Classify a webhook payload file without storing anything
    Classify {
        /// Path to a JSON webhook body
        file: PathBuf,
    },

    /// List derived changelog records
    #[command(alias = "ls")]
    Records,

    /// Show recent notification dispatches
    Deliveries {
        /// Number of entries to show
        #[arg(long, short = 'n', default_value = "20")]
        limit: usize,
    },

    /// Show or edit recipient preferences
    #[command(subcommand)]
    Prefs(PrefsCommands),
}

#[derive(Subcommand)]
enum PrefsCommands {
    /// Show a user's preferences (defaults if none are stored)
    Get { user_id: String },

    /// Update a user's preferences
    Set {
        user_id: String,

        /// Channels to enable (can be specified multiple times)
        #[arg(long, value_parser = parse_channel)]
        enable: Vec<Channel>,

        /// Channels to disable (can be specified multiple times)
        #[arg(long, value_parser = parse_channel)]
        disable: Vec<Channel>,

        /// Minimum priority delivered to this user
        #[arg(long, value_parser = parse_priority)]
        threshold: Option<Priority>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        phone: Option<String>,
    },
}

fn parse_channel(value: &str) -> Result<Channel, String> {
    value.parse().map_err(|e: beacon_core::CoreError| e.to_string())
}

fn parse_priority(value: &str) -> Result<Priority, String> {
    value.parse().map_err(|e: beacon_core::CoreError| e.to_string())
}

fn init_tracing(format: LogFormat) {
    let registry = tracing_subscriber::registry().with(EnvFilter::from_default_env());
    match format {
        LogFormat::Human => registry.with(fmt::layer()).init(),
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let ctx = commands::Context::load(&cli.config, cli.data_dir)?;

    match cli.command {
        Commands::Init => commands::init(&ctx, cli.format),
        Commands::Serve { port, host } => commands::serve(ctx, host, port),
        Commands::Classify { file } => commands::classify(&file, cli.format),
        Commands::Records => commands::records(&ctx, cli.format),
        Commands::Deliveries { limit } => commands::deliveries(&ctx, limit, cli.format),
        Commands::Prefs(PrefsCommands::Get { user_id }) => {
            commands::prefs_get(&ctx, &user_id, cli.format)
        }
        Commands::Prefs(PrefsCommands::Set {
            user_id,
            enable,
            disable,
            threshold,
            email,
            phone,
        }) => commands::prefs_set(
            &ctx,
            &user_id,
            &commands::PrefsUpdate {
                enable,
                disable,
                threshold,
                email,
                phone,
            },
            cli.format,
        ),
    }
}
