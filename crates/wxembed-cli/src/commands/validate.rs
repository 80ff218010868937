//! Validate command - Send a test request with the configured credentials

use anyhow::Result;
use clap::Args;
use wxembed_embedder::{Embedder, ValidationResult};

use super::create_embedder;
use crate::progress;
use crate::GlobalOptions;

/// Arguments for the validate command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Execute the validate command
///
/// Exits with status 1 when the configuration is invalid.
pub async fn execute(args: ValidateArgs, global: GlobalOptions) -> Result<()> {
    let (_, embedder) = create_embedder(&global)?;

    let pb = progress::spinner(
        "Validating IBM watsonx configuration...",
        global.quiet || args.json,
    );
    let result = embedder.validate_configuration().await;

    if result.valid {
        progress::finish_spinner(pb, "Configuration is valid");
    } else {
        progress::finish_spinner_error(pb, "Configuration is invalid");
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if !result.valid {
        println!("{}", describe_failure(&result));
    }

    if !result.valid {
        std::process::exit(1);
    }

    Ok(())
}

/// Error text with its translation key, when the category is known
fn describe_failure(result: &ValidationResult) -> String {
    let error = result.error.as_deref().unwrap_or("unknownError");
    match result.kind() {
        Some(kind) => format!("{} [{}]", error, kind.translation_key()),
        None => error.to_string(),
    }
}
