//! Folio CLI — the main entry point.
//!
//! Commands:
//! - `serve`     — Start the HTTP gateway with the eviction sweeper
//! - `enhance`   — Run prompts against one conversation in-process
//! - `classify`  — Show how a prompt would be classified
//! - `config`    — Print the effective configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "folio",
    about = "Folio — incremental financial report engine",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Read configuration from this file instead of ~/.folio/config.toml
    #[arg(long, global = true, env = "FOLIO_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run one or more prompts, in order, against a conversation
    Enhance {
        /// Conversation id
        #[arg(short, long, default_value = "cli")]
        conversation: String,

        /// Prompts; the first builds the report, later ones enhance it
        #[arg(required = true)]
        prompts: Vec<String>,

        /// Print the full JSON response instead of the document
        #[arg(long)]
        json: bool,
    },

    /// Classify a prompt without running it
    Classify {
        prompt: String,

        /// Classify as a follow-up to an existing report
        #[arg(long)]
        existing: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { port } => commands::serve::run(config, port).await?,
        Commands::Enhance {
            conversation,
            prompts,
            json,
        } => commands::enhance::run(&config, &conversation, &prompts, json)?,
        Commands::Classify { prompt, existing } => {
            commands::classify::run(&config, &prompt, existing)?
        }
        Commands::Config => commands::config_cmd::run(&config)?,
    }

    Ok(())
}
