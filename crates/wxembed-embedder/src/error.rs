//! Error types for wxembed-embedder

use thiserror::Error;

use crate::auth::{CredentialField, Platform};

/// Errors that can occur while building or driving a watsonx embedder
#[derive(Error, Debug)]
pub enum EmbedderError {
    // =========================================================================
    // Configuration errors
    // =========================================================================
    /// No platform was selected
    #[error("Platform selection is required for IBM watsonx embedded provider")]
    PlatformRequired,

    /// Platform tag is not one of the supported deployments
    #[error("Unsupported platform for IBM watsonx embedded provider: '{0}'")]
    UnsupportedPlatform(String),

    /// Cloud Pak auth type is not one of the supported modes
    #[error("Unsupported auth type for IBM watsonx embedded provider: '{0}'")]
    UnsupportedAuthType(String),

    /// A credential required by the selected platform is missing
    #[error("{field} is required in IBM watsonx embedded provider for {platform}")]
    MissingCredential {
        field: CredentialField,
        platform: Platform,
    },

    // =========================================================================
    // Transport errors
    // =========================================================================
    /// Token exchange with the authenticator failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Service answered with a non-success status
    #[error("{status}{}", detail(.message))]
    Api {
        status: reqwest::StatusCode,
        message: String,
    },

    /// Request exceeded the client deadline
    #[error("request timeout")]
    Timeout,

    /// Connection or protocol failure below the HTTP status level
    #[error("Request failed: {0}")]
    Transport(String),

    // =========================================================================
    // Response errors
    // =========================================================================
    /// Response body did not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EmbedderError {
    /// Build a missing-credential error for a platform
    pub fn missing(field: CredentialField, platform: Platform) -> Self {
        Self::MissingCredential { field, platform }
    }

    /// Whether this error comes from construction-time validation
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::PlatformRequired
                | Self::UnsupportedPlatform(_)
                | Self::UnsupportedAuthType(_)
                | Self::MissingCredential { .. }
        )
    }
}

impl From<reqwest::Error> for EmbedderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            EmbedderError::Timeout
        } else if err.is_decode() {
            EmbedderError::InvalidResponse(err.to_string())
        } else {
            EmbedderError::Transport(err.to_string())
        }
    }
}

/// `": <message>"`, or nothing for an empty body
fn detail(message: &str) -> String {
    if message.is_empty() {
        String::new()
    } else {
        format!(": {}", message)
    }
}

/// Result type for wxembed-embedder operations
pub type Result<T> = std::result::Result<T, EmbedderError>;
