//! wxembed embedder - Vector embeddings from IBM watsonx.ai
//!
//! This crate turns text into embedding vectors using the watsonx.ai
//! foundation-model service, on either deployment:
//!
//! - **IBM Cloud** - IAM API-key authentication
//! - **IBM Cloud Pak for Data** - username + API key or password against the
//!   cluster's `/icp4d-api` endpoint
//!
//! # Architecture
//!
//! ```text
//! Credentials ──select_authenticator──▶ Authenticator
//!                                          │
//!                                          ▼
//!                     FoundationModelService (trait)
//!                          └── WatsonxService   - reqwest + token cache
//!                                          │
//!                                          ▼
//!                     Embedder (trait)
//!                          └── WatsonxEmbedder  - batching, retry, fallback vectors
//! ```
//!
//! [`get_embedded_watsonx_models`] queries the model catalog straight from
//! credentials, without building an embedder.
//!
//! # Example
//!
//! ```ignore
//! use wxembed_embedder::{Credentials, Embedder, WatsonxEmbedder, WatsonxOptions};
//!
//! let credentials = Credentials::ibm_cloud(api_key, project_id, "https://us-south.ml.cloud.ibm.com");
//! let embedder = WatsonxEmbedder::new(WatsonxOptions::new(credentials))?;
//!
//! let status = embedder.validate_configuration().await;
//! let result = embedder.create_embeddings(vec!["hello".into()], None).await;
//! let models = embedder.get_available_models().await;
//! ```

pub mod auth;
pub mod catalog;
pub mod dimensions;
pub mod embedder;
pub mod error;
pub mod retry;
pub mod service;
pub mod transport;
pub mod watsonx;

#[cfg(test)]
mod test_support;

// Re-exports for convenience
pub use auth::{select_authenticator, AuthType, Authenticator, CloudPakSecret, Credentials, Platform};
pub use catalog::{get_embedded_watsonx_models, normalize_catalog, ModelCatalog, ModelInfo};
pub use dimensions::{expected_dimension, DEFAULT_DIMENSION, DEFAULT_MODEL_ID};
pub use embedder::{
    Embedder, EmbedderInfo, EmbeddingResult, Usage, ValidationErrorKind, ValidationResult,
    FALLBACK_VALUE, MAX_ITEM_TOKENS,
};
pub use error::{EmbedderError, Result};
pub use retry::RetryPolicy;
pub use service::FoundationModelService;
pub use transport::{TransportConfig, WatsonxService};
pub use watsonx::{WatsonxEmbedder, WatsonxOptions};
