//! IBM watsonx embedding client
//!
//! # Pipeline
//!
//! 1. Inputs that are empty or over [`MAX_ITEM_TOKENS`] are dropped from the
//!    request and keep an empty slot in the result.
//! 2. The remaining inputs go out in one `embed_text` call per attempt,
//!    retried under the client's [`RetryPolicy`].
//! 3. Returned vectors are mapped back to their input positions; empty or
//!    missing vectors are replaced by a constant fallback vector of the
//!    model's expected width.
//!
//! Exhausted retries degrade to an all-empty result. Nothing on the embedding
//! path returns an error to the caller.
//!
//! # Example
//!
//! ```ignore
//! use wxembed_embedder::{Credentials, Embedder, WatsonxEmbedder, WatsonxOptions};
//!
//! let credentials = Credentials::ibm_cloud(api_key, project_id, "https://us-south.ml.cloud.ibm.com");
//! let embedder = WatsonxEmbedder::new(WatsonxOptions::new(credentials))?;
//!
//! let result = embedder.create_embeddings(vec!["hello world".into()], None).await;
//! assert_eq!(result.embeddings.len(), 1);
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::auth::{select_authenticator, Credentials};
use crate::catalog::{discover_models, merge_specs, ModelCatalog, ModelInfo};
use crate::dimensions::{expected_dimension, DEFAULT_MODEL_ID};
use crate::embedder::{
    estimate_tokens, Embedder, EmbedderInfo, EmbeddingResult, Usage, ValidationErrorKind,
    ValidationResult, FALLBACK_VALUE, MAX_ITEM_TOKENS,
};
use crate::error::{EmbedderError, Result};
use crate::retry::{RetryDecision, RetryPolicy};
use crate::service::{EmbedParameters, EmbedTextRequest, EmbedTextResponse, FoundationModelService};
use crate::transport::{TransportConfig, WatsonxService};

/// Provider name reported by [`Embedder::embedder_info`]
pub const EMBEDDER_NAME: &str = "ibm-watsonx";

/// Text embedded by the configuration check
const VALIDATION_TEXT: &str = "test";

/// Construction options for [`WatsonxEmbedder`]
#[derive(Debug, Clone)]
pub struct WatsonxOptions {
    pub credentials: Credentials,
    /// Model to embed with; [`DEFAULT_MODEL_ID`] when unset or empty
    pub model_id: Option<String>,
    pub transport: TransportConfig,
    pub retry_policy: RetryPolicy,
}

impl WatsonxOptions {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            model_id: None,
            transport: TransportConfig::default(),
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }
}

/// Embedding client for one watsonx deployment
///
/// Immutable after construction; concurrent calls share only the service
/// handle.
pub struct WatsonxEmbedder {
    service: Arc<dyn FoundationModelService>,
    model_id: String,
    project_id: Option<String>,
    expected_dimension: usize,
    retry_policy: RetryPolicy,
}

impl WatsonxEmbedder {
    /// Validate credentials and connect an HTTP service handle
    ///
    /// Fails with a configuration error naming the first missing credential.
    pub fn new(options: WatsonxOptions) -> Result<Self> {
        let WatsonxOptions {
            credentials,
            model_id,
            transport,
            retry_policy,
        } = options;

        let authenticator = select_authenticator(&credentials)?;
        let service = WatsonxService::new(authenticator, &credentials, transport)?;

        debug!(
            service_url = service.service_url(),
            platform = %service.authenticator().platform(),
            "Created IBM watsonx embedder"
        );

        Ok(Self::with_service(
            Arc::new(service),
            model_id,
            credentials.project_id().map(str::to_string),
        )
        .with_retry_policy(retry_policy))
    }

    /// Wrap an existing service handle
    pub fn with_service(
        service: Arc<dyn FoundationModelService>,
        model_id: Option<String>,
        project_id: Option<String>,
    ) -> Self {
        let model_id = model_id
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL_ID.to_string());
        let expected_dimension = expected_dimension(&model_id);

        Self {
            service,
            model_id,
            project_id,
            expected_dimension,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    /// Vector width expected from the configured model
    pub fn expected_dimension(&self) -> usize {
        self.expected_dimension
    }

    fn embed_request(&self, model_id: &str, inputs: Vec<String>) -> EmbedTextRequest {
        EmbedTextRequest {
            model_id: model_id.to_string(),
            inputs,
            project_id: self.project_id.clone(),
            parameters: EmbedParameters::truncating_at(MAX_ITEM_TOKENS),
        }
    }

    /// Send one request under the retry policy; `None` once attempts run out
    async fn embed_with_retry(&self, request: EmbedTextRequest) -> Option<EmbedTextResponse> {
        let policy = self.retry_policy;
        let mut state = policy.start::<EmbedderError>();

        loop {
            let attempt = state.begin_attempt();
            match self.service.embed_text(request.clone()).await {
                Ok(response) => {
                    if attempt > 1 {
                        debug!(attempt, "Embedding request succeeded after retry");
                    }
                    return Some(response);
                }
                Err(e) => match state.record_failure(e, &policy) {
                    RetryDecision::Retry { attempt, delay } => {
                        warn!(
                            error = %state.last_error().map(ToString::to_string).unwrap_or_default(),
                            "Embedding request failed (attempt {}/{}), retrying in {}ms",
                            attempt,
                            policy.max_attempts,
                            delay.as_millis()
                        );
                        tokio::time::sleep(delay).await;
                    }
                    RetryDecision::GiveUp { attempts } => {
                        error!(
                            error = %state.last_error().map(ToString::to_string).unwrap_or_default(),
                            "Failed to create embeddings after {} attempts",
                            attempts
                        );
                        return None;
                    }
                },
            }
        }
    }

    /// Configured model plus every embedding model the service lists
    ///
    /// The configured model is always present, even when discovery fails.
    /// Listed models overwrite it on an id collision.
    pub async fn get_available_models(&self) -> ModelCatalog {
        let mut catalog = ModelCatalog::from([(
            self.model_id.clone(),
            ModelInfo {
                dimension: self.expected_dimension,
            },
        )]);

        match discover_models(self.service.as_ref()).await {
            Ok(specs) => {
                debug!(count = specs.len(), "Discovered IBM watsonx embedding models");
                merge_specs(&mut catalog, specs);
            }
            Err(e) => warn!(
                error = %e,
                "Error fetching IBM watsonx embedding models, using configured model only"
            ),
        }

        catalog
    }
}

#[async_trait]
impl Embedder for WatsonxEmbedder {
    async fn create_embeddings(
        &self,
        inputs: Vec<String>,
        model_override: Option<&str>,
    ) -> EmbeddingResult {
        let (model_id, dimension) = match model_override.filter(|m| !m.is_empty()) {
            Some(model) => (model, expected_dimension(model)),
            None => (self.model_id.as_str(), self.expected_dimension),
        };

        let mut result = EmbeddingResult::empty(inputs.len());
        let mut positions = Vec::with_capacity(inputs.len());
        let mut batch = Vec::with_capacity(inputs.len());

        for (index, text) in inputs.into_iter().enumerate() {
            if text.is_empty() {
                continue;
            }
            let tokens = estimate_tokens(&text);
            if tokens > MAX_ITEM_TOKENS {
                warn!(
                    index,
                    estimated_tokens = tokens,
                    max_tokens = MAX_ITEM_TOKENS,
                    "Text at index {} exceeds maximum token limit ({} > {}). Skipping.",
                    index,
                    tokens,
                    MAX_ITEM_TOKENS
                );
                continue;
            }
            positions.push(index);
            batch.push(text);
        }

        if batch.is_empty() {
            return result;
        }

        let request = self.embed_request(model_id, batch);
        let Some(response) = self.embed_with_retry(request).await else {
            return result;
        };

        let mut vectors = response.results.unwrap_or_default().into_iter();
        for index in positions {
            let embedding = vectors.next().map(|item| item.embedding).unwrap_or_default();
            result.embeddings[index] = if embedding.is_empty() {
                error!(
                    index,
                    dimension, "Empty embedding returned for text at index {}, using fallback vector", index
                );
                vec![FALLBACK_VALUE; dimension]
            } else {
                embedding
            };
        }
        result.usage = Usage::from_input_tokens(response.input_token_count);

        result
    }

    async fn validate_configuration(&self) -> ValidationResult {
        let request = self.embed_request(&self.model_id, vec![VALIDATION_TEXT.to_string()]);

        match self.service.embed_text(request).await {
            Ok(response) => match response.results {
                Some(results) if !results.is_empty() => ValidationResult::valid(),
                _ => {
                    error!("Invalid response from IBM watsonx: no embedding results");
                    ValidationResult::invalid(ValidationErrorKind::InvalidResponse)
                }
            },
            Err(e) => {
                let message = e.to_string();
                let kind = ValidationErrorKind::classify(&message);
                error!(error = %message, category = %kind, "IBM watsonx validation failed");
                ValidationResult::failed(kind, &message)
            }
        }
    }

    fn embedder_info(&self) -> EmbedderInfo {
        EmbedderInfo {
            name: EMBEDDER_NAME.to_string(),
        }
    }
}

impl std::fmt::Debug for WatsonxEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatsonxEmbedder")
            .field("model_id", &self.model_id)
            .field("project_id", &self.project_id)
            .field("expected_dimension", &self.expected_dimension)
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}
