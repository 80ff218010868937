//! Config command - View and manage configuration
//!
//! - Show configuration file paths
//! - Show the effective (merged) configuration
//! - Create a default configuration file

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use serde::Serialize;
use wxembed_config::ConfigLoader;

use super::{load_config, print_info};
use crate::GlobalOptions;

/// Config management commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show configuration file paths
    Path(PathArgs),

    /// Show the effective configuration
    Show(ShowArgs),

    /// Create a configuration file with default values
    Init(InitArgs),
}

/// Arguments for the path command
#[derive(clap::Args, Debug)]
pub struct PathArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Arguments for the show command
#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Output as JSON instead of TOML
    #[arg(long)]
    json: bool,
}

/// Arguments for the init command
#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Create the global config (~/.wxembed/config.toml) instead of local
    #[arg(long)]
    global: bool,
}

/// Configuration paths
#[derive(Debug, Clone, Serialize)]
pub struct ConfigPaths {
    /// Global config file path
    pub global: Option<PathBuf>,
    /// Local config file path
    pub local: PathBuf,
    /// Whether global config exists
    pub global_exists: bool,
    /// Whether local config exists
    pub local_exists: bool,
}

/// Execute the config command
pub async fn execute(cmd: ConfigCommand, global: GlobalOptions) -> Result<()> {
    match cmd {
        ConfigCommand::Path(args) => execute_path(args),
        ConfigCommand::Show(args) => execute_show(args, global),
        ConfigCommand::Init(args) => execute_init(args, global),
    }
}

fn execute_path(args: PathArgs) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let loader = ConfigLoader::new();

    let global_path = loader.global_config_path();
    let local_path = loader.local_config_path(&cwd);

    let paths = ConfigPaths {
        global_exists: global_path.as_ref().map(|p| p.exists()).unwrap_or(false),
        local_exists: local_path.exists(),
        global: global_path,
        local: local_path,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&paths)?);
    } else {
        println!("Configuration Paths");
        println!("===================\n");

        if let Some(ref gp) = paths.global {
            println!("Global: {} ({})", gp.display(), exists_label(paths.global_exists));
        } else {
            println!("Global: not available (no home directory)");
        }

        println!(
            "Local:  {} ({})",
            paths.local.display(),
            exists_label(paths.local_exists)
        );
    }

    Ok(())
}

fn exists_label(exists: bool) -> &'static str {
    if exists {
        "exists"
    } else {
        "not found"
    }
}

fn execute_show(args: ShowArgs, global: GlobalOptions) -> Result<()> {
    let config = load_config(&global)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        print!(
            "{}",
            toml::to_string_pretty(&config).context("Failed to serialize configuration")?
        );
    }

    if let Err(e) = config.validate() {
        print_info(&format!("warning: {}", e), global.quiet);
    }

    Ok(())
}

fn execute_init(args: InitArgs, global: GlobalOptions) -> Result<()> {
    let loader = ConfigLoader::new();

    let path = if args.global {
        loader.init_global()?
    } else {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        loader.init_local(&cwd)?
    };

    println!("Config file: {}", path.display());
    print_info(
        "Set [watsonx] platform and project_id, and export WATSONX_API_KEY",
        global.quiet,
    );

    Ok(())
}
