//! Embed command - Create embeddings for texts

use anyhow::Result;
use clap::Args;
use wxembed_embedder::{Embedder, EmbeddingResult};

use super::create_embedder;
use crate::progress;
use crate::GlobalOptions;

/// Number of leading vector values shown in text output
const PREVIEW_VALUES: usize = 4;

/// Arguments for the embed command
#[derive(Args, Debug)]
pub struct EmbedArgs {
    /// Texts to embed
    #[arg(required = true)]
    texts: Vec<String>,

    /// Embed with this model instead of the configured one
    #[arg(long = "model-override", value_name = "MODEL_ID")]
    model_override: Option<String>,

    /// Output the full result as JSON
    #[arg(long)]
    json: bool,
}

/// Execute the embed command
pub async fn execute(args: EmbedArgs, global: GlobalOptions) -> Result<()> {
    let (_, embedder) = create_embedder(&global)?;

    let model = args
        .model_override
        .as_deref()
        .unwrap_or_else(|| embedder.model_id());
    let pb = progress::spinner(
        &format!("Embedding {} text(s) with {}...", args.texts.len(), model),
        global.quiet || args.json,
    );

    let result = embedder
        .create_embeddings(args.texts, args.model_override.as_deref())
        .await;

    let embedded = result.embeddings.iter().filter(|v| !v.is_empty()).count();
    if embedded == result.embeddings.len() {
        progress::finish_spinner(pb, &format!("Embedded {} text(s)", embedded));
    } else {
        progress::finish_spinner_warn(
            pb,
            &format!(
                "Embedded {} of {} text(s)",
                embedded,
                result.embeddings.len()
            ),
        );
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", format_result(&result));
    }

    Ok(())
}

/// One line per input plus a usage line
fn format_result(result: &EmbeddingResult) -> String {
    let mut out = String::new();
    for (index, vector) in result.embeddings.iter().enumerate() {
        if vector.is_empty() {
            out.push_str(&format!("[{}] skipped\n", index));
            continue;
        }
        let preview: Vec<String> = vector
            .iter()
            .take(PREVIEW_VALUES)
            .map(|v| format!("{:.4}", v))
            .collect();
        let ellipsis = if vector.len() > PREVIEW_VALUES { ", ..." } else { "" };
        out.push_str(&format!(
            "[{}] dim={} [{}{}]\n",
            index,
            vector.len(),
            preview.join(", "),
            ellipsis
        ));
    }
    out.push_str(&format!(
        "Usage: {} prompt tokens, {} total tokens\n",
        result.usage.prompt_tokens, result.usage.total_tokens
    ));
    out
}
