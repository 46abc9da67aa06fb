//! codewright CLI, the main entry point.
//!
//! Commands:
//! - `chat`: Interactive session
//! - `execute`: Run a single request and print the answer
//! - `tools`: List the tools the model will see
//! - `init`: Write the default config file

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "codewright",
    about = "codewright, a coding agent for your terminal",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config.toml (defaults to ~/.codewright/config.toml)
    #[arg(short, long, global = true, env = "CODEWRIGHT_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the agent interactively
    Chat,

    /// Send a single request and print the answer
    Execute {
        /// The request to run
        query: String,
    },

    /// List local and remote tools
    Tools,

    /// Write the default configuration file
    Init,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Chat => commands::chat::run(config_path).await?,
        Commands::Execute { query } => commands::execute::run(config_path, query).await?,
        Commands::Tools => commands::tools::run(config_path).await?,
        Commands::Init => commands::init::run(config_path).await?,
    }

    Ok(())
}
