//! Foundation-model service abstraction
//!
//! The embedder talks to watsonx through [`FoundationModelService`]. The
//! production implementation is [`WatsonxService`](crate::transport::WatsonxService);
//! tests substitute scripted implementations.
//!
//! # Wire format
//!
//! - Embed: `{"model_id", "inputs", "project_id", "parameters": {"truncate_input_tokens", "return_options": {"input_text": true}}}`
//!   → `{"results": [{"embedding": [...]}], "input_token_count": N}`
//! - Catalog: `filters=function_embedding`
//!   → `{"models" | "resources" | "foundation_models": [{"id" | "name" | "model_id", "model_limits": {"embedding_dimension"}}]}`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Catalog filter selecting embedding-capable models
pub const EMBEDDING_FUNCTION_FILTER: &str = "function_embedding";

/// Per-request embedding parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedParameters {
    /// Server-side truncation limit for each input
    pub truncate_input_tokens: usize,
    pub return_options: ReturnOptions,
}

impl EmbedParameters {
    /// Truncate at `max_tokens` and echo input text back
    pub fn truncating_at(max_tokens: usize) -> Self {
        Self {
            truncate_input_tokens: max_tokens,
            return_options: ReturnOptions { input_text: true },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnOptions {
    pub input_text: bool,
}

/// Request body for the text embeddings endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedTextRequest {
    pub model_id: String,
    pub inputs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub parameters: EmbedParameters,
}

/// One embedding in an embed response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingItem {
    #[serde(default)]
    pub embedding: Vec<f32>,
    /// Echoed input text (present when `return_options.input_text` is set)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
}

impl EmbeddingItem {
    pub fn new(embedding: Vec<f32>) -> Self {
        Self {
            embedding,
            input: None,
        }
    }
}

/// Response from the text embeddings endpoint
///
/// `results` stays optional so a response without it can be told apart
/// from one with an empty list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedTextResponse {
    #[serde(default)]
    pub results: Option<Vec<EmbeddingItem>>,
    #[serde(default)]
    pub input_token_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
}

impl EmbedTextResponse {
    /// Response carrying the given vectors
    pub fn with_embeddings(embeddings: Vec<Vec<f32>>, input_token_count: u64) -> Self {
        Self {
            results: Some(embeddings.into_iter().map(EmbeddingItem::new).collect()),
            input_token_count,
            model_id: None,
        }
    }
}

/// Query for the foundation model catalog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListModelSpecsRequest {
    pub filters: Option<String>,
}

impl ListModelSpecsRequest {
    /// Only models that support the embedding function
    pub fn embedding_models() -> Self {
        Self {
            filters: Some(EMBEDDING_FUNCTION_FILTER.to_string()),
        }
    }
}

/// Limits advertised for a catalog model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelLimits {
    #[serde(default)]
    pub embedding_dimension: Option<usize>,
}

/// One catalog entry as returned by the service
///
/// Different service versions name the identifier `id`, `name` or
/// `model_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawModelSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_limits: Option<ModelLimits>,
}

/// Catalog response body, with each known envelope key optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpecsResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub models: Option<Vec<RawModelSpec>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<RawModelSpec>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foundation_models: Option<Vec<RawModelSpec>>,
}

/// Authenticated connection to a watsonx deployment
#[async_trait]
pub trait FoundationModelService: Send + Sync {
    /// Embed a batch of texts
    async fn embed_text(&self, request: EmbedTextRequest) -> Result<EmbedTextResponse>;

    /// List foundation model specifications
    async fn list_foundation_model_specs(
        &self,
        request: ListModelSpecsRequest,
    ) -> Result<ModelSpecsResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = EmbedTextRequest {
            model_id: "ibm/slate-30m-english-rtrvr".into(),
            inputs: vec!["hello".into()],
            project_id: Some("project-id".into()),
            parameters: EmbedParameters::truncating_at(8191),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "model_id": "ibm/slate-30m-english-rtrvr",
                "inputs": ["hello"],
                "project_id": "project-id",
                "parameters": {
                    "truncate_input_tokens": 8191,
                    "return_options": {"input_text": true}
                }
            })
        );
    }

    #[test]
    fn test_request_omits_missing_project() {
        let request = EmbedTextRequest {
            model_id: "m".into(),
            inputs: vec![],
            project_id: None,
            parameters: EmbedParameters::truncating_at(10),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("project_id").is_none());
    }

    #[test]
    fn test_response_without_results() {
        let response: EmbedTextResponse = serde_json::from_str("{}").unwrap();
        assert!(response.results.is_none());
        assert_eq!(response.input_token_count, 0);
    }

    #[test]
    fn test_response_with_results() {
        let response: EmbedTextResponse = serde_json::from_value(serde_json::json!({
            "model_id": "ibm/slate-30m-english-rtrvr",
            "results": [{"embedding": [0.1, 0.2], "input": "hello"}],
            "created_at": "2024-05-31T00:00:00Z",
            "input_token_count": 3
        }))
        .unwrap();

        let results = response.results.unwrap();
        assert_eq!(results[0].embedding, vec![0.1, 0.2]);
        assert_eq!(results[0].input.as_deref(), Some("hello"));
        assert_eq!(response.input_token_count, 3);
    }
}
