//! Embedder trait and result types
//!
//! This is the boundary the indexing pipeline codes against. Implementations
//! degrade instead of failing: `create_embeddings` always returns one vector
//! slot per input, and `validate_configuration` reports problems in its
//! result rather than as an error.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Largest input, in estimated tokens, sent to the service
pub const MAX_ITEM_TOKENS: usize = 8191;

/// Value filling synthesized vectors when the service returns an empty one
pub const FALLBACK_VALUE: f32 = 0.0001;

/// Rough token estimate: one token per four characters, rounded up
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Token usage of an embedding call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub prompt_tokens: u64,
    pub total_tokens: u64,
}

impl Usage {
    /// Embedding endpoints have no completion tokens; both counters match
    pub fn from_input_tokens(tokens: u64) -> Self {
        Self {
            prompt_tokens: tokens,
            total_tokens: tokens,
        }
    }
}

/// Vectors for a batch of inputs
///
/// `embeddings.len()` always equals the number of inputs. Skipped or failed
/// items hold an empty vector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingResult {
    pub embeddings: Vec<Vec<f32>>,
    pub usage: Usage,
}

impl EmbeddingResult {
    /// `len` empty placeholders and zero usage
    pub fn empty(len: usize) -> Self {
        Self {
            embeddings: vec![Vec::new(); len],
            usage: Usage::default(),
        }
    }
}

/// Category of a failed validation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidationErrorKind {
    InvalidApiKey,
    EndpointNotFound,
    ConnectionTimeout,
    InvalidProjectId,
    InvalidModelId,
    UnknownError,
    InvalidResponse,
}

impl ValidationErrorKind {
    /// Classify an error message; first matching rule wins
    pub fn classify(message: &str) -> Self {
        if message.contains("401") {
            Self::InvalidApiKey
        } else if message.contains("404") {
            Self::EndpointNotFound
        } else if message.to_lowercase().contains("timeout") {
            Self::ConnectionTimeout
        } else if message.contains("project") {
            Self::InvalidProjectId
        } else if message.contains("model") {
            Self::InvalidModelId
        } else {
            Self::UnknownError
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidApiKey => "invalidApiKey",
            Self::EndpointNotFound => "endpointNotFound",
            Self::ConnectionTimeout => "connectionTimeout",
            Self::InvalidProjectId => "invalidProjectId",
            Self::InvalidModelId => "invalidModelId",
            Self::UnknownError => "unknownError",
            Self::InvalidResponse => "invalidResponse",
        }
    }

    /// Key for the external translation lookup
    pub fn translation_key(&self) -> String {
        format!("embeddings:validation.{}", self.as_str())
    }
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a configuration check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    /// Invalid with a bare category, e.g. `invalidResponse`
    pub fn invalid(kind: ValidationErrorKind) -> Self {
        Self {
            valid: false,
            error: Some(kind.to_string()),
        }
    }

    /// Invalid with the category and the underlying message:
    /// `"<category> (<message>)"`
    pub fn failed(kind: ValidationErrorKind, message: &str) -> Self {
        Self {
            valid: false,
            error: Some(format!("{} ({})", kind, message)),
        }
    }

    /// Category of the error, if any
    pub fn kind(&self) -> Option<ValidationErrorKind> {
        let error = self.error.as_deref()?;
        let tag = error.split(" (").next().unwrap_or(error);
        [
            ValidationErrorKind::InvalidApiKey,
            ValidationErrorKind::EndpointNotFound,
            ValidationErrorKind::ConnectionTimeout,
            ValidationErrorKind::InvalidProjectId,
            ValidationErrorKind::InvalidModelId,
            ValidationErrorKind::UnknownError,
            ValidationErrorKind::InvalidResponse,
        ]
        .into_iter()
        .find(|kind| kind.as_str() == tag)
    }
}

/// Identity of an embedding provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedderInfo {
    pub name: String,
}

/// Embedding provider as seen by the indexing pipeline
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed `inputs`, optionally with a model other than the configured one
    async fn create_embeddings(
        &self,
        inputs: Vec<String>,
        model_override: Option<&str>,
    ) -> EmbeddingResult;

    /// Send a test request with the configured credentials
    async fn validate_configuration(&self) -> ValidationResult;

    fn embedder_info(&self) -> EmbedderInfo;
}
