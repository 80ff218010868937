//! CLI command implementations

pub mod config;
pub mod embed;
pub mod models;
pub mod validate;

use anyhow::{Context, Result};
use wxembed_config::{ConfigLoader, WxConfig};
use wxembed_embedder::WatsonxEmbedder;

use crate::GlobalOptions;

/// Load configuration and apply CLI overrides.
///
/// `--config` loads that file alone; otherwise global and local files are
/// merged for the current directory.
pub fn load_config(global: &GlobalOptions) -> Result<WxConfig> {
    let overrides = global.to_config_overrides();
    let mut loader = ConfigLoader::new();

    if let Some(ref config_path) = global.config {
        return loader
            .load_file(config_path, Some(&overrides))
            .with_context(|| format!("Failed to load config file {}", config_path.display()));
    }

    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    loader
        .load(&cwd, Some(&overrides))
        .context("Failed to load configuration")
}

/// Load and validate configuration, then build the embedder.
pub fn create_embedder(global: &GlobalOptions) -> Result<(WxConfig, WatsonxEmbedder)> {
    let config = load_config(global)?;
    config.validate().context("Invalid watsonx configuration")?;

    let options = config
        .embedder_options()
        .context("Failed to resolve watsonx credentials")?;
    let embedder =
        WatsonxEmbedder::new(options).context("Failed to create IBM watsonx embedder")?;

    Ok((config, embedder))
}

/// Print an info message (respects quiet flag).
pub fn print_info(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{}", message);
    }
}
