//! wxembed Configuration Management
//!
//! Provides configuration loading with support for:
//! - Global config: `~/.wxembed/config.toml`
//! - Local config: `.wxembed/config.toml` (in the working directory)
//! - CLI overrides via `ConfigOverrides`
//!
//! Configuration is merged in order: global → local → CLI overrides.
//!
//! Secrets never live in the file. `[watsonx]` names the environment
//! variables holding the API key and password, and
//! [`WxConfig::to_credentials`] reads them.

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::ConfigLoader;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use wxembed_embedder::{
    AuthType, Credentials, Platform, RetryPolicy, TransportConfig, WatsonxOptions,
};

/// Default environment variable holding the API key
pub const DEFAULT_API_KEY_ENV: &str = "WATSONX_API_KEY";

/// Default environment variable holding the Cloud Pak password
pub const DEFAULT_PASSWORD_ENV: &str = "WATSONX_PASSWORD";

/// Default IBM Cloud region
pub const DEFAULT_REGION: &str = "us-south";

/// Root configuration for wxembed.
///
/// Represents the fully merged configuration from all sources.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct WxConfig {
    /// Service connection settings
    pub watsonx: WatsonxSettings,

    /// Embedding request settings
    pub embedding: EmbeddingSettings,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Connection settings for a watsonx deployment.
///
/// # Example TOML
///
/// ```toml
/// [watsonx]
/// platform = "cloudPak"
/// base_url = "https://cpd.example.com"
/// project_id = "0f4c..."
/// auth_type = "password"
/// username = "admin"
/// password_env = "CPD_PASSWORD"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WatsonxSettings {
    /// Deployment: "ibmCloud" or "cloudPak"
    pub platform: Option<Platform>,

    /// Service URL; IBM Cloud derives it from `region` when unset
    pub base_url: Option<String>,

    /// IBM Cloud region
    pub region: String,

    pub project_id: Option<String>,

    /// Cloud Pak secret kind: "apiKey" or "password"
    pub auth_type: Option<AuthType>,

    /// Cloud Pak username
    pub username: Option<String>,

    /// Environment variable containing the API key
    pub api_key_env: String,

    /// Environment variable containing the Cloud Pak password
    pub password_env: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for WatsonxSettings {
    fn default() -> Self {
        Self {
            platform: None,
            base_url: None,
            region: DEFAULT_REGION.to_string(),
            project_id: None,
            auth_type: None,
            username: None,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            password_env: DEFAULT_PASSWORD_ENV.to_string(),
            timeout_secs: 30,
        }
    }
}

impl WatsonxSettings {
    /// Explicit base URL, or the regional IBM Cloud URL
    pub fn effective_base_url(&self) -> Option<String> {
        match (non_empty(&self.base_url), self.platform) {
            (Some(url), _) => Some(url.to_string()),
            (None, Some(Platform::IbmCloud)) if !self.region.is_empty() => {
                Some(format!("https://{}.ml.cloud.ibm.com", self.region))
            }
            _ => None,
        }
    }

    /// Validate that required settings exist for the selected platform.
    ///
    /// Reports the first missing setting, in the same order the embedder
    /// checks credentials.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let Some(platform) = self.platform else {
            return Err(ConfigError::missing("watsonx.platform"));
        };

        match platform {
            Platform::IbmCloud => {
                require(&self.project_id, "watsonx.project_id")?;
                if self.effective_base_url().is_none() {
                    return Err(ConfigError::missing("watsonx.base_url"));
                }
            }
            Platform::CloudPak => {
                require(&self.base_url, "watsonx.base_url")?;
                require(&self.project_id, "watsonx.project_id")?;
                require(&self.username, "watsonx.username")?;
                if self.auth_type.is_none() {
                    return Err(ConfigError::missing("watsonx.auth_type"));
                }
            }
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "watsonx.timeout_secs",
                "must be greater than zero",
            ));
        }

        Ok(())
    }
}

/// Embedding request settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Model id (None = embedder default)
    pub model_id: Option<String>,

    /// Maximum attempts per embedding request
    pub max_retries: u32,

    /// Wait after the first failed attempt (doubles per retry)
    pub retry_base_delay_ms: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model_id: None,
            max_retries: 3,
            retry_base_delay_ms: 500,
        }
    }
}

impl EmbeddingSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.retry_base_delay_ms),
        )
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON structured logging
    Json,
}

/// CLI overrides for configuration values.
///
/// Used to apply command-line arguments over file-based config.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub platform: Option<Platform>,
    pub base_url: Option<String>,
    pub project_id: Option<String>,
    pub model_id: Option<String>,

    /// Override log level
    pub log_level: Option<String>,
}

impl WxConfig {
    /// Apply CLI overrides to this configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(platform) = overrides.platform {
            self.watsonx.platform = Some(platform);
        }

        if let Some(ref url) = overrides.base_url {
            self.watsonx.base_url = Some(url.clone());
        }

        if let Some(ref project_id) = overrides.project_id {
            self.watsonx.project_id = Some(project_id.clone());
        }

        if let Some(ref model_id) = overrides.model_id {
            self.embedding.model_id = Some(model_id.clone());
        }

        if let Some(ref level) = overrides.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.watsonx.validate()
    }

    /// Build credentials, reading secrets from the process environment
    pub fn to_credentials(&self) -> Result<Credentials, ConfigError> {
        self.to_credentials_with(|name| std::env::var(name).ok())
    }

    /// Build credentials, reading secrets through `lookup`
    ///
    /// Fails when the variable holding the secret of the selected platform
    /// and auth type is unset or empty. Other missing settings are left to
    /// [`WxConfig::validate`].
    pub fn to_credentials_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Credentials, ConfigError> {
        let settings = &self.watsonx;
        let secret = |name: &str| {
            if name.is_empty() {
                None
            } else {
                lookup(name).filter(|v| !v.is_empty())
            }
        };

        let api_key = secret(&settings.api_key_env);
        let password = secret(&settings.password_env);

        match (settings.platform, settings.auth_type) {
            (Some(Platform::IbmCloud), _) | (Some(Platform::CloudPak), Some(AuthType::ApiKey))
                if api_key.is_none() =>
            {
                return Err(ConfigError::secret_env_missing(
                    "watsonx.api_key_env",
                    &settings.api_key_env,
                ));
            }
            (Some(Platform::CloudPak), Some(AuthType::Password)) if password.is_none() => {
                return Err(ConfigError::secret_env_missing(
                    "watsonx.password_env",
                    &settings.password_env,
                ));
            }
            _ => {}
        }

        Ok(Credentials {
            api_key,
            project_id: settings.project_id.clone(),
            platform: settings.platform.map(|p| p.as_str().to_string()),
            base_url: settings.effective_base_url(),
            auth_type: settings.auth_type.map(|a| a.as_str().to_string()),
            username: settings.username.clone(),
            password,
        })
    }

    /// Embedder construction options, with secrets from the environment
    pub fn embedder_options(&self) -> Result<WatsonxOptions, ConfigError> {
        Ok(self.embedder_options_with(self.to_credentials()?))
    }

    /// Embedder construction options around the given credentials
    pub fn embedder_options_with(&self, credentials: Credentials) -> WatsonxOptions {
        let mut options = WatsonxOptions::new(credentials)
            .with_transport(TransportConfig::default().with_timeout(self.watsonx.timeout_secs))
            .with_retry_policy(self.embedding.retry_policy());
        if let Some(model_id) = non_empty(&self.embedding.model_id) {
            options = options.with_model_id(model_id);
        }
        options
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn require(value: &Option<String>, key: &'static str) -> Result<(), ConfigError> {
    non_empty(value)
        .map(|_| ())
        .ok_or_else(|| ConfigError::missing(key))
}
