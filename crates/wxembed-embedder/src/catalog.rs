//! Model catalog discovery
//!
//! The catalog endpoint has answered with three different envelopes over
//! time (`models`, `resources`, `foundation_models`), and entries name their
//! identifier `id`, `name` or `model_id`. [`normalize_catalog`] folds all of
//! them into a flat list of [`ModelSpec`]s.
//!
//! [`get_embedded_watsonx_models`] is usable without a constructed embedder,
//! e.g. to fill a model picker from raw credentials. It never fails: any
//! error yields an empty catalog.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::auth::{select_authenticator, Credentials};
use crate::error::{EmbedderError, Result};
use crate::service::{FoundationModelService, ListModelSpecsRequest, ModelSpecsResponse, RawModelSpec};
use crate::transport::{TransportConfig, WatsonxService};

/// Vendor prefix kept by the standalone fetcher
pub const IBM_VENDOR_PREFIX: &str = "ibm";

/// Catalog information for one model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub dimension: usize,
}

/// Model id → model info
pub type ModelCatalog = BTreeMap<String, ModelInfo>;

/// A catalog entry with its identifier and dimension resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub id: String,
    pub dimension: usize,
}

/// Which envelope key carried the model list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogEnvelope {
    Models(Vec<RawModelSpec>),
    Resources(Vec<RawModelSpec>),
    FoundationModels(Vec<RawModelSpec>),
}

impl CatalogEnvelope {
    /// Pick the envelope, first of `models`, `resources`, `foundation_models`
    pub fn from_response(response: ModelSpecsResponse) -> Option<Self> {
        let ModelSpecsResponse {
            models,
            resources,
            foundation_models,
        } = response;

        models
            .map(Self::Models)
            .or_else(|| resources.map(Self::Resources))
            .or_else(|| foundation_models.map(Self::FoundationModels))
    }

    /// Envelope key, for logging
    pub fn key(&self) -> &'static str {
        match self {
            Self::Models(_) => "models",
            Self::Resources(_) => "resources",
            Self::FoundationModels(_) => "foundation_models",
        }
    }

    pub fn into_specs(self) -> Vec<RawModelSpec> {
        match self {
            Self::Models(specs) | Self::Resources(specs) | Self::FoundationModels(specs) => specs,
        }
    }
}

impl RawModelSpec {
    /// First identifier present among `id`, `name`, `model_id`
    pub fn identifier(&self) -> Option<&str> {
        [&self.id, &self.name, &self.model_id]
            .into_iter()
            .find_map(|v| v.as_deref().filter(|s| !s.is_empty()))
    }

    pub fn embedding_dimension(&self) -> Option<usize> {
        self.model_limits.as_ref()?.embedding_dimension
    }
}

/// Normalize a catalog response into model specs
///
/// Entries lacking an identifier or an embedding dimension are skipped.
/// A response with none of the known envelope keys is an error.
pub fn normalize_catalog(response: ModelSpecsResponse) -> Result<Vec<ModelSpec>> {
    let envelope = CatalogEnvelope::from_response(response).ok_or_else(|| {
        EmbedderError::InvalidResponse(
            "catalog response has no models, resources or foundation_models list".into(),
        )
    })?;

    debug!(envelope = envelope.key(), "Normalizing model catalog");

    let specs = envelope
        .into_specs()
        .into_iter()
        .filter_map(|raw| match (raw.identifier(), raw.embedding_dimension()) {
            (Some(id), Some(dimension)) => Some(ModelSpec {
                id: id.to_string(),
                dimension,
            }),
            _ => {
                debug!(?raw, "Skipping catalog entry without id or embedding dimension");
                None
            }
        })
        .collect();

    Ok(specs)
}

/// Query a service for embedding models and normalize the answer
pub async fn discover_models(service: &dyn FoundationModelService) -> Result<Vec<ModelSpec>> {
    let response = service
        .list_foundation_model_specs(ListModelSpecsRequest::embedding_models())
        .await?;
    normalize_catalog(response)
}

/// Merge specs into a catalog; later entries overwrite earlier ones
pub fn merge_specs(catalog: &mut ModelCatalog, specs: impl IntoIterator<Item = ModelSpec>) {
    for spec in specs {
        catalog.insert(
            spec.id,
            ModelInfo {
                dimension: spec.dimension,
            },
        );
    }
}

/// IBM embedding models offered by `service`, empty on failure
pub async fn embedded_models_from(service: &dyn FoundationModelService) -> ModelCatalog {
    let mut catalog = ModelCatalog::new();

    match discover_models(service).await {
        Ok(specs) => merge_specs(
            &mut catalog,
            specs
                .into_iter()
                .filter(|spec| spec.id.starts_with(IBM_VENDOR_PREFIX)),
        ),
        Err(e) => warn!(error = %e, "Error fetching embedded models from IBM watsonx API"),
    }

    catalog
}

/// Fetch IBM embedding models straight from credentials
///
/// Builds a throwaway authenticated service. Credential validation errors,
/// transport errors and malformed responses all produce an empty catalog.
pub async fn get_embedded_watsonx_models(credentials: &Credentials) -> ModelCatalog {
    let service = match select_authenticator(credentials)
        .and_then(|auth| WatsonxService::new(auth, credentials, TransportConfig::default()))
    {
        Ok(service) => service,
        Err(e) => {
            error!(error = %e, "Error fetching embedded IBM watsonx models");
            return ModelCatalog::new();
        }
    };

    embedded_models_from(&service).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockService;
    use pretty_assertions::assert_eq;

    fn spec(json: serde_json::Value) -> RawModelSpec {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_envelope_precedence() {
        let response = ModelSpecsResponse {
            models: None,
            resources: Some(vec![]),
            foundation_models: Some(vec![RawModelSpec::default()]),
        };
        let envelope = CatalogEnvelope::from_response(response).unwrap();
        assert_eq!(envelope.key(), "resources");
    }

    #[test]
    fn test_no_envelope_is_error() {
        let result = normalize_catalog(ModelSpecsResponse::default());
        assert!(matches!(result, Err(EmbedderError::InvalidResponse(_))));
    }

    #[test]
    fn test_identifier_fallbacks() {
        assert_eq!(spec(serde_json::json!({"id": "a", "name": "b"})).identifier(), Some("a"));
        assert_eq!(spec(serde_json::json!({"name": "b"})).identifier(), Some("b"));
        assert_eq!(spec(serde_json::json!({"model_id": "c"})).identifier(), Some("c"));
        assert_eq!(spec(serde_json::json!({})).identifier(), None);
    }

    #[test]
    fn test_normalize_each_envelope() {
        for key in ["models", "resources", "foundation_models"] {
            let id_key = match key {
                "models" => "id",
                "resources" => "name",
                _ => "model_id",
            };
            let response: ModelSpecsResponse = serde_json::from_value(serde_json::json!({
                key: [{id_key: "model1", "model_limits": {"embedding_dimension": 512}}]
            }))
            .unwrap();

            assert_eq!(
                normalize_catalog(response).unwrap(),
                vec![ModelSpec {
                    id: "model1".into(),
                    dimension: 512
                }],
                "envelope {key}"
            );
        }
    }

    #[test]
    fn test_entries_without_dimension_are_skipped() {
        let response: ModelSpecsResponse = serde_json::from_value(serde_json::json!({
            "resources": [
                {"model_id": "ibm/slate-30m-english-rtrvr", "model_limits": {"embedding_dimension": 384}},
                {"model_id": "ibm/granite-13b-chat-v2", "model_limits": {"max_sequence_length": 8192}},
                {"label": "nameless"}
            ]
        }))
        .unwrap();

        let specs = normalize_catalog(response).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].id, "ibm/slate-30m-english-rtrvr");
    }

    #[tokio::test]
    async fn test_embedded_models_keeps_ibm_prefix_only() {
        let service = MockService::new().with_catalog(Ok(serde_json::from_value(
            serde_json::json!({
                "resources": [
                    {"model_id": "ibm/slate-125m-english-rtrvr-v2", "model_limits": {"embedding_dimension": 768}},
                    {"model_id": "intfloat/multilingual-e5-large", "model_limits": {"embedding_dimension": 1024}}
                ]
            }),
        )
        .unwrap()));

        let catalog = embedded_models_from(&service).await;
        assert_eq!(
            catalog,
            ModelCatalog::from([(
                "ibm/slate-125m-english-rtrvr-v2".to_string(),
                ModelInfo { dimension: 768 }
            )])
        );
        assert_eq!(
            service.catalog_requests(),
            vec![ListModelSpecsRequest::embedding_models()]
        );
    }

    #[tokio::test]
    async fn test_embedded_models_empty_on_error() {
        let service = MockService::new()
            .with_catalog(Err(EmbedderError::Transport("connection refused".into())));
        assert!(embedded_models_from(&service).await.is_empty());
    }

    #[tokio::test]
    async fn test_fetcher_empty_on_invalid_credentials() {
        let credentials = Credentials {
            platform: Some("ibmCloud".into()),
            ..Default::default()
        };
        assert!(get_embedded_watsonx_models(&credentials).await.is_empty());

        assert!(get_embedded_watsonx_models(&Credentials::default())
            .await
            .is_empty());
    }
}
