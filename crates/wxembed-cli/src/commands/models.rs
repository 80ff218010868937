//! Models command - List embedding models

use anyhow::{Context, Result};
use clap::Args;
use wxembed_embedder::{get_embedded_watsonx_models, ModelCatalog};

use super::{create_embedder, load_config, print_info};
use crate::progress;
use crate::GlobalOptions;

/// Arguments for the models command
#[derive(Args, Debug)]
pub struct ModelsArgs {
    /// Only IBM models listed by the service, without the configured model
    #[arg(long)]
    remote_only: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Execute the models command
pub async fn execute(args: ModelsArgs, global: GlobalOptions) -> Result<()> {
    let pb = progress::spinner(
        "Fetching IBM watsonx embedding models...",
        global.quiet || args.json,
    );

    let catalog = if args.remote_only {
        let config = load_config(&global)?;
        let credentials = config
            .to_credentials()
            .context("Failed to resolve watsonx credentials")?;
        get_embedded_watsonx_models(&credentials).await
    } else {
        let (_, embedder) = create_embedder(&global)?;
        embedder.get_available_models().await
    };

    if catalog.is_empty() {
        progress::finish_spinner_warn(pb, "No embedding models found");
        print_info(
            "Check credentials with `wxembed validate`, or run with --verbose for details",
            global.quiet || args.json,
        );
    } else {
        progress::finish_spinner(pb, &format!("Found {} model(s)", catalog.len()));
    }

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&catalog).context("Failed to serialize models")?
        );
    } else {
        print!("{}", format_catalog(&catalog));
    }

    Ok(())
}

fn format_catalog(catalog: &ModelCatalog) -> String {
    let width = catalog.keys().map(String::len).max().unwrap_or(0);
    catalog
        .iter()
        .map(|(id, info)| format!("{:<width$}  {}\n", id, info.dimension, width = width))
        .collect()
}
