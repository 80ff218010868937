//! Authenticator selection for the two watsonx deployments
//!
//! IBM Cloud uses an IAM API key. Cloud Pak for Data uses a username plus
//! either an API key or a password, exchanged against the cluster's
//! `/icp4d-api` endpoint.
//!
//! Validation is fail-fast: the first missing field in the documented order
//! is reported, never a bundle of all missing fields.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EmbedderError, Result};

/// Path appended to the Cloud Pak base URL for token exchange
pub const CLOUD_PAK_AUTH_PATH: &str = "/icp4d-api";

/// Deployment topology of the watsonx service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Platform {
    /// Public IBM Cloud
    IbmCloud,
    /// Self-hosted IBM Cloud Pak for Data
    CloudPak,
}

impl Platform {
    /// Tag used in settings ("ibmCloud" / "cloudPak")
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::IbmCloud => "ibmCloud",
            Platform::CloudPak => "cloudPak",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::IbmCloud => write!(f, "IBM Cloud"),
            Platform::CloudPak => write!(f, "IBM Cloud Pak for Data"),
        }
    }
}

impl FromStr for Platform {
    type Err = EmbedderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "ibmcloud" => Ok(Platform::IbmCloud),
            "cloudpak" => Ok(Platform::CloudPak),
            _ => Err(EmbedderError::UnsupportedPlatform(s.to_string())),
        }
    }
}

/// Secondary credential used with a Cloud Pak username
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthType {
    ApiKey,
    Password,
}

impl AuthType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthType::ApiKey => "apiKey",
            AuthType::Password => "password",
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthType {
    type Err = EmbedderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "apikey" => Ok(AuthType::ApiKey),
            "password" => Ok(AuthType::Password),
            _ => Err(EmbedderError::UnsupportedAuthType(s.to_string())),
        }
    }
}

/// Credential fields named in missing-field errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialField {
    ApiKey,
    ProjectId,
    BaseUrl,
    Username,
    AuthType,
    Password,
}

impl fmt::Display for CredentialField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CredentialField::ApiKey => "API key",
            CredentialField::ProjectId => "Project ID",
            CredentialField::BaseUrl => "Base URL",
            CredentialField::Username => "Username",
            CredentialField::AuthType => "Auth Type selection",
            CredentialField::Password => "Password",
        };
        f.write_str(label)
    }
}

/// Raw credential fields as supplied by the configuration store
///
/// Every field is optional; which ones are required depends on the platform
/// and, for Cloud Pak, the auth type. Empty strings count as missing.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: Option<String>,
    pub project_id: Option<String>,
    pub platform: Option<String>,
    pub base_url: Option<String>,
    pub auth_type: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    /// IBM Cloud credentials
    pub fn ibm_cloud(
        api_key: impl Into<String>,
        project_id: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            api_key: Some(api_key.into()),
            project_id: Some(project_id.into()),
            platform: Some(Platform::IbmCloud.as_str().to_string()),
            base_url: Some(base_url.into()),
            ..Default::default()
        }
    }

    /// Cloud Pak for Data credentials; set the secret with
    /// [`with_api_key`](Self::with_api_key) or [`with_password`](Self::with_password)
    pub fn cloud_pak(
        base_url: impl Into<String>,
        project_id: impl Into<String>,
        username: impl Into<String>,
        auth_type: AuthType,
    ) -> Self {
        Self {
            project_id: Some(project_id.into()),
            platform: Some(Platform::CloudPak.as_str().to_string()),
            base_url: Some(base_url.into()),
            auth_type: Some(auth_type.as_str().to_string()),
            username: Some(username.into()),
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Project ID, if set to a non-empty value
    pub fn project_id(&self) -> Option<&str> {
        present(&self.project_id)
    }

    /// Base URL, if set to a non-empty value
    pub fn base_url(&self) -> Option<&str> {
        present(&self.base_url)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("project_id", &self.project_id)
            .field("platform", &self.platform)
            .field("base_url", &self.base_url)
            .field("auth_type", &self.auth_type)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Secret paired with a Cloud Pak username
#[derive(Clone, PartialEq, Eq)]
pub enum CloudPakSecret {
    Password(String),
    ApiKey(String),
}

impl fmt::Debug for CloudPakSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloudPakSecret::Password(_) => write!(f, "Password(<redacted>)"),
            CloudPakSecret::ApiKey(_) => write!(f, "ApiKey(<redacted>)"),
        }
    }
}

/// Authenticator for one of the two deployments
#[derive(Clone, PartialEq, Eq)]
pub enum Authenticator {
    /// IBM Cloud IAM, API key exchanged for a bearer token
    Iam { api_key: String },
    /// Cloud Pak for Data, username + secret exchanged at `url`
    CloudPak {
        url: String,
        username: String,
        secret: CloudPakSecret,
    },
}

impl Authenticator {
    pub fn platform(&self) -> Platform {
        match self {
            Authenticator::Iam { .. } => Platform::IbmCloud,
            Authenticator::CloudPak { .. } => Platform::CloudPak,
        }
    }
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Authenticator::Iam { .. } => f
                .debug_struct("Iam")
                .field("api_key", &"<redacted>")
                .finish(),
            Authenticator::CloudPak {
                url,
                username,
                secret,
            } => f
                .debug_struct("CloudPak")
                .field("url", url)
                .field("username", username)
                .field("secret", secret)
                .finish(),
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn require(value: &Option<String>, field: CredentialField, platform: Platform) -> Result<String> {
    present(value)
        .map(str::to_string)
        .ok_or_else(|| EmbedderError::missing(field, platform))
}

/// Validate credentials and build the authenticator for their platform
pub fn select_authenticator(credentials: &Credentials) -> Result<Authenticator> {
    let platform: Platform = present(&credentials.platform)
        .ok_or(EmbedderError::PlatformRequired)?
        .parse()?;

    match platform {
        Platform::IbmCloud => {
            let api_key = require(&credentials.api_key, CredentialField::ApiKey, platform)?;
            require(&credentials.project_id, CredentialField::ProjectId, platform)?;
            require(&credentials.base_url, CredentialField::BaseUrl, platform)?;
            Ok(Authenticator::Iam { api_key })
        }
        Platform::CloudPak => {
            let base_url = require(&credentials.base_url, CredentialField::BaseUrl, platform)?;
            require(&credentials.project_id, CredentialField::ProjectId, platform)?;
            let username = require(&credentials.username, CredentialField::Username, platform)?;
            let auth_type: AuthType =
                require(&credentials.auth_type, CredentialField::AuthType, platform)?.parse()?;

            match auth_type {
                AuthType::ApiKey => {
                    require(&credentials.api_key, CredentialField::ApiKey, platform)?;
                }
                AuthType::Password => {
                    require(&credentials.password, CredentialField::Password, platform)?;
                }
            }

            // Password wins when both secrets are present
            let secret = match (present(&credentials.password), present(&credentials.api_key)) {
                (Some(password), _) => CloudPakSecret::Password(password.to_string()),
                (None, Some(api_key)) => CloudPakSecret::ApiKey(api_key.to_string()),
                (None, None) => {
                    return Err(EmbedderError::missing(CredentialField::ApiKey, platform))
                }
            };

            Ok(Authenticator::CloudPak {
                url: format!("{}{}", base_url.trim_end_matches('/'), CLOUD_PAK_AUTH_PATH),
                username,
                secret,
            })
        }
    }
}
