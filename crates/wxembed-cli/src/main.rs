//! wxembed CLI - Embeddings from IBM watsonx.ai
//!
//! A command-line interface for embedding text, checking credentials and
//! listing the embedding models a watsonx deployment offers.
//!
//! # Usage
//!
//! ```bash
//! # Create a config file, then edit [watsonx]
//! wxembed config init
//!
//! # Check credentials
//! WATSONX_API_KEY=... wxembed validate
//!
//! # Embed text
//! wxembed embed "hello world" "another text" --json
//!
//! # List embedding models
//! wxembed models
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use wxembed_config::{ConfigOverrides, LogFormat, LoggingConfig};
use wxembed_embedder::Platform;

mod commands;
mod progress;

/// wxembed - Vector embeddings from IBM watsonx.ai
#[derive(Parser, Debug)]
#[command(name = "wxembed")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOptions,
}

/// Global options available to all commands
#[derive(Args, Debug, Clone)]
struct GlobalOptions {
    /// Path to configuration file (skips global and local config files)
    #[arg(long, short = 'c', global = true, env = "WXEMBED_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Deployment platform (ibmCloud, cloudPak)
    #[arg(long, global = true, env = "WXEMBED_PLATFORM", value_parser = parse_platform)]
    platform: Option<Platform>,

    /// watsonx service URL
    #[arg(long, global = true, env = "WXEMBED_BASE_URL")]
    base_url: Option<String>,

    /// watsonx project ID
    #[arg(long, global = true, env = "WXEMBED_PROJECT_ID")]
    project_id: Option<String>,

    /// Embedding model ID
    #[arg(long, global = true, env = "WXEMBED_MODEL")]
    model: Option<String>,
}

/// Parse platform from string
fn parse_platform(s: &str) -> Result<Platform, String> {
    s.parse()
        .map_err(|e: wxembed_embedder::EmbedderError| e.to_string())
}

impl GlobalOptions {
    /// Convert global options to config overrides
    pub fn to_config_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            platform: self.platform,
            base_url: self.base_url.clone(),
            project_id: self.project_id.clone(),
            model_id: self.model.clone(),
            log_level: None,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Embed one or more texts
    Embed(commands::embed::EmbedArgs),

    /// Check credentials with a test request
    Validate(commands::validate::ValidateArgs),

    /// List available embedding models
    Models(commands::models::ModelsArgs),

    /// View and manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),
}

/// Install the stderr subscriber
///
/// `--quiet` and `--verbose` win over `RUST_LOG`, which wins over the
/// configured level.
fn init_tracing(global: &GlobalOptions, logging: &LoggingConfig) -> Result<()> {
    let filter = if global.quiet {
        EnvFilter::new("error")
    } else if global.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level))
    };

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match logging.format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
        LogFormat::Text => {
            tracing::subscriber::set_global_default(builder.with_ansi(true).finish())?
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A broken config file is reported by the command itself
    let logging = commands::load_config(&cli.global)
        .map(|config| config.logging)
        .unwrap_or_default();
    init_tracing(&cli.global, &logging)?;

    match cli.command {
        Commands::Embed(args) => commands::embed::execute(args, cli.global).await,
        Commands::Validate(args) => commands::validate::execute(args, cli.global).await,
        Commands::Models(args) => commands::models::execute(args, cli.global).await,
        Commands::Config(cmd) => commands::config::execute(cmd, cli.global).await,
    }
}
