//! HTTP transport for watsonx.ai
//!
//! # Endpoints
//!
//! - POST `{service_url}/ml/v1/text/embeddings?version=2024-05-31`
//! - GET `{service_url}/ml/v1/foundation_model_specs?version=2024-05-31&filters=...`
//!
//! # Authentication
//!
//! - IBM Cloud: the API key is exchanged at the IAM token endpoint
//!   (`grant_type=urn:ibm:params:oauth:grant-type:apikey`).
//! - Cloud Pak for Data: username + password/API key are exchanged at
//!   `{base_url}/icp4d-api/v1/authorize`.
//!
//! Bearer tokens are cached until shortly before they expire.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, trace};

#[cfg(feature = "rate-limit")]
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
#[cfg(feature = "rate-limit")]
use std::num::NonZeroU32;

use crate::auth::{Authenticator, CloudPakSecret, CredentialField, Credentials};
use crate::error::{EmbedderError, Result};
use crate::service::{
    EmbedTextRequest, EmbedTextResponse, FoundationModelService, ListModelSpecsRequest,
    ModelSpecsResponse,
};

/// API version date sent with every request
pub const API_VERSION: &str = "2024-05-31";

/// IBM Cloud IAM token endpoint
pub const IAM_TOKEN_URL: &str = "https://iam.cloud.ibm.com/identity/token";

/// Default timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Refresh tokens this long before they expire
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Cloud Pak does not report expiry; its tokens are reused for this long
const CLOUD_PAK_TOKEN_TTL: Duration = Duration::from_secs(20 * 60);

const IAM_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

/// Default requests per second limit
#[cfg(feature = "rate-limit")]
const DEFAULT_REQUESTS_PER_SECOND: u32 = 10;

#[cfg(feature = "rate-limit")]
type WatsonxRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Transport settings
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// IAM token endpoint (IBM Cloud only)
    pub iam_url: String,
    /// API version date
    pub version: String,
    /// Requests per second limit (when rate-limit feature enabled)
    #[cfg(feature = "rate-limit")]
    pub requests_per_second: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            iam_url: IAM_TOKEN_URL.to_string(),
            version: API_VERSION.to_string(),
            #[cfg(feature = "rate-limit")]
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
        }
    }
}

impl TransportConfig {
    /// Set request timeout
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Point IAM token exchange at another endpoint
    pub fn with_iam_url(mut self, url: impl Into<String>) -> Self {
        self.iam_url = url.into();
        self
    }

    /// Set requests per second limit (when rate-limit feature enabled)
    #[cfg(feature = "rate-limit")]
    pub fn with_requests_per_second(mut self, rps: u32) -> Self {
        self.requests_per_second = rps;
        self
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

impl CachedToken {
    fn new(value: String, lifetime: Duration) -> Self {
        Self {
            value,
            refresh_at: Instant::now() + lifetime.saturating_sub(TOKEN_REFRESH_MARGIN),
        }
    }

    fn is_fresh(&self) -> bool {
        Instant::now() < self.refresh_at
    }
}

#[derive(Debug, Deserialize)]
struct IamTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct CloudPakTokenResponse {
    token: String,
}

/// Error body returned by watsonx endpoints
#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    #[serde(default)]
    errors: Vec<ServiceErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ServiceErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

/// Extract the first error message from a watsonx error body
fn error_message(body: &str) -> String {
    serde_json::from_str::<ServiceErrorBody>(body)
        .ok()
        .and_then(|b| b.errors.into_iter().find_map(|e| e.message))
        .unwrap_or_else(|| body.trim().to_string())
}

/// Authenticated HTTP client for one watsonx deployment
pub struct WatsonxService {
    client: Client,
    authenticator: Authenticator,
    service_url: String,
    config: TransportConfig,
    token: Mutex<Option<CachedToken>>,
    #[cfg(feature = "rate-limit")]
    rate_limiter: WatsonxRateLimiter,
}

impl WatsonxService {
    /// Create a service for a validated authenticator
    ///
    /// Requests go to the credentials' base URL, which both platforms require.
    pub fn new(
        authenticator: Authenticator,
        credentials: &Credentials,
        config: TransportConfig,
    ) -> Result<Self> {
        let service_url = credentials
            .base_url()
            .map(|url| url.trim_end_matches('/').to_string())
            .ok_or_else(|| {
                EmbedderError::missing(CredentialField::BaseUrl, authenticator.platform())
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbedderError::Transport(format!("HTTP client error: {}", e)))?;

        #[cfg(feature = "rate-limit")]
        let rate_limiter = {
            let rps = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
            RateLimiter::direct(Quota::per_second(rps))
        };

        Ok(Self {
            client,
            authenticator,
            service_url,
            config,
            token: Mutex::new(None),
            #[cfg(feature = "rate-limit")]
            rate_limiter,
        })
    }

    /// Base URL requests are sent to
    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    /// Wait for rate limiter permission (when feature enabled)
    #[cfg(feature = "rate-limit")]
    async fn wait_for_permit(&self) {
        self.rate_limiter.until_ready().await;
    }

    /// No-op when rate limiting is disabled
    #[cfg(not(feature = "rate-limit"))]
    async fn wait_for_permit(&self) {}

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.service_url, path)
    }

    /// Current bearer token, exchanging credentials when needed
    async fn bearer_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
            trace!("Reusing cached bearer token");
            return Ok(token.value.clone());
        }

        let token = self.request_token().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    /// Like [`check_status`], but a 401 also drops the cached token so the
    /// next call exchanges credentials again
    async fn check_service_status(&self, response: Response) -> Result<Response> {
        let result = check_status(response).await;
        if let Err(EmbedderError::Api { status, .. }) = &result {
            if *status == StatusCode::UNAUTHORIZED {
                debug!("Bearer token rejected, clearing token cache");
                *self.token.lock().await = None;
            }
        }
        result
    }

    async fn request_token(&self) -> Result<CachedToken> {
        match &self.authenticator {
            Authenticator::Iam { api_key } => {
                debug!(url = %self.config.iam_url, "Requesting IAM token");
                let response = self
                    .client
                    .post(&self.config.iam_url)
                    .header("Accept", "application/json")
                    .form(&[("grant_type", IAM_GRANT_TYPE), ("apikey", api_key.as_str())])
                    .send()
                    .await?;
                let response = check_auth_status(response).await?;
                let body: IamTokenResponse = response.json().await?;
                let lifetime = Duration::from_secs(body.expires_in.unwrap_or(3600));
                Ok(CachedToken::new(body.access_token, lifetime))
            }
            Authenticator::CloudPak {
                url,
                username,
                secret,
            } => {
                debug!(%url, %username, "Requesting Cloud Pak for Data token");
                let body = match secret {
                    CloudPakSecret::Password(password) => {
                        serde_json::json!({"username": username, "password": password})
                    }
                    CloudPakSecret::ApiKey(api_key) => {
                        serde_json::json!({"username": username, "api_key": api_key})
                    }
                };
                let response = self
                    .client
                    .post(format!("{}/v1/authorize", url))
                    .json(&body)
                    .send()
                    .await?;
                let response = check_auth_status(response).await?;
                let body: CloudPakTokenResponse = response.json().await?;
                Ok(CachedToken::new(body.token, CLOUD_PAK_TOKEN_TTL))
            }
        }
    }
}

/// Map a non-success service status to an error
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(EmbedderError::Api {
        status,
        message: error_message(&body),
    })
}

/// Map a non-success token-exchange status to an auth error
async fn check_auth_status(response: Response) -> Result<Response> {
    check_status(response).await.map_err(|e| match e {
        EmbedderError::Api { .. } => EmbedderError::Auth(e.to_string()),
        other => other,
    })
}

#[async_trait]
impl FoundationModelService for WatsonxService {
    async fn embed_text(&self, request: EmbedTextRequest) -> Result<EmbedTextResponse> {
        let token = self.bearer_token().await?;
        self.wait_for_permit().await;

        debug!(
            model_id = %request.model_id,
            inputs = request.inputs.len(),
            "Sending embedding request"
        );

        let response = self
            .client
            .post(self.endpoint("/ml/v1/text/embeddings"))
            .query(&[("version", self.config.version.as_str())])
            .bearer_auth(token)
            .json(&request)
            .send()
            .await?;

        let response = self.check_service_status(response).await?;
        Ok(response.json().await?)
    }

    async fn list_foundation_model_specs(
        &self,
        request: ListModelSpecsRequest,
    ) -> Result<ModelSpecsResponse> {
        let token = self.bearer_token().await?;
        self.wait_for_permit().await;

        let mut query = vec![("version", self.config.version.clone())];
        if let Some(filters) = request.filters {
            query.push(("filters", filters));
        }

        let response = self
            .client
            .get(self.endpoint("/ml/v1/foundation_model_specs"))
            .query(&query)
            .bearer_auth(token)
            .send()
            .await?;

        let response = self.check_service_status(response).await?;
        Ok(response.json().await?)
    }
}

impl std::fmt::Debug for WatsonxService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatsonxService")
            .field("service_url", &self.service_url)
            .field("authenticator", &self.authenticator)
            .field("timeout_secs", &self.config.timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{select_authenticator, AuthType};
    use crate::service::EmbedParameters;
    use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn cloud_service(server: &MockServer) -> WatsonxService {
        let credentials = Credentials::ibm_cloud("api-key", "project-id", server.uri());
        let auth = select_authenticator(&credentials).unwrap();
        let config = TransportConfig::default()
            .with_timeout(5)
            .with_iam_url(format!("{}/identity/token", server.uri()));
        WatsonxService::new(auth, &credentials, config).unwrap()
    }

    async fn mount_iam(server: &MockServer, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/identity/token"))
            .and(body_string_contains("apikey=api-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "iam-token",
                "token_type": "Bearer",
                "expires_in": 3600
            })))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    fn embed_request() -> EmbedTextRequest {
        EmbedTextRequest {
            model_id: "ibm/slate-30m-english-rtrvr".into(),
            inputs: vec!["hello world".into()],
            project_id: Some("project-id".into()),
            parameters: EmbedParameters::truncating_at(8191),
        }
    }

    #[tokio::test]
    async fn test_embed_text_with_iam_token() {
        let server = MockServer::start().await;
        mount_iam(&server, 1).await;

        Mock::given(method("POST"))
            .and(path("/ml/v1/text/embeddings"))
            .and(query_param("version", API_VERSION))
            .and(header("Authorization", "Bearer iam-token"))
            .and(body_json(embed_request()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model_id": "ibm/slate-30m-english-rtrvr",
                "results": [{"embedding": [0.1, 0.2, 0.3], "input": "hello world"}],
                "input_token_count": 4
            })))
            .expect(2)
            .mount(&server)
            .await;

        let service = cloud_service(&server);
        let first = service.embed_text(embed_request()).await.unwrap();
        let second = service.embed_text(embed_request()).await.unwrap();

        assert_eq!(first.input_token_count, 4);
        assert_eq!(
            first.results.unwrap()[0].embedding,
            vec![0.1_f32, 0.2, 0.3]
        );
        assert_eq!(second.input_token_count, 4);
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_status_error() {
        let server = MockServer::start().await;
        mount_iam(&server, 1).await;

        Mock::given(method("POST"))
            .and(path("/ml/v1/text/embeddings"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "errors": [{"code": "authentication_token_not_valid", "message": "Invalid token"}],
                "status_code": 401
            })))
            .mount(&server)
            .await;

        let service = cloud_service(&server);
        let err = service.embed_text(embed_request()).await.unwrap_err();

        assert!(matches!(err, EmbedderError::Api { status, .. } if status.as_u16() == 401));
        assert_eq!(err.to_string(), "401 Unauthorized: Invalid token");
    }

    #[tokio::test]
    async fn test_iam_failure_is_auth_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/identity/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Provided API key could not be found"))
            .mount(&server)
            .await;

        let service = cloud_service(&server);
        let err = service.embed_text(embed_request()).await.unwrap_err();

        assert!(matches!(err, EmbedderError::Auth(_)));
        assert!(err.to_string().contains("400"));
    }

    #[tokio::test]
    async fn test_list_model_specs_sends_filter() {
        let server = MockServer::start().await;
        mount_iam(&server, 1).await;

        Mock::given(method("GET"))
            .and(path("/ml/v1/foundation_model_specs"))
            .and(query_param("version", API_VERSION))
            .and(query_param("filters", "function_embedding"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "total_count": 1,
                "resources": [{
                    "model_id": "ibm/slate-30m-english-rtrvr",
                    "model_limits": {"max_sequence_length": 512, "embedding_dimension": 384}
                }]
            })))
            .mount(&server)
            .await;

        let service = cloud_service(&server);
        let response = service
            .list_foundation_model_specs(ListModelSpecsRequest::embedding_models())
            .await
            .unwrap();

        let resources = response.resources.unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(
            resources[0].model_limits.as_ref().unwrap().embedding_dimension,
            Some(384)
        );
    }

    #[tokio::test]
    async fn test_cloud_pak_password_token() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/icp4d-api/v1/authorize"))
            .and(body_json(serde_json::json!({"username": "admin", "password": "secret"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"_messageCode_": "200", "token": "cpd-token"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/ml/v1/text/embeddings"))
            .and(header("Authorization", "Bearer cpd-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{"embedding": [0.5]}],
                "input_token_count": 2
            })))
            .mount(&server)
            .await;

        let credentials =
            Credentials::cloud_pak(server.uri(), "project-id", "admin", AuthType::Password)
                .with_password("secret");
        let auth = select_authenticator(&credentials).unwrap();
        let service = WatsonxService::new(auth, &credentials, TransportConfig::default()).unwrap();

        let response = service.embed_text(embed_request()).await.unwrap();
        assert_eq!(response.input_token_count, 2);
    }

    #[test]
    fn test_service_url_from_base_url() {
        let credentials =
            Credentials::ibm_cloud("api-key", "project-id", "https://eu-de.ml.cloud.ibm.com/");
        let auth = select_authenticator(&credentials).unwrap();
        let service = WatsonxService::new(auth, &credentials, TransportConfig::default()).unwrap();
        assert_eq!(service.service_url(), "https://eu-de.ml.cloud.ibm.com");
    }

    #[test]
    fn test_missing_base_url() {
        let credentials = Credentials {
            api_key: Some("api-key".into()),
            ..Default::default()
        };
        let auth = Authenticator::Iam {
            api_key: "api-key".into(),
        };
        let err = WatsonxService::new(auth, &credentials, TransportConfig::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Base URL is required in IBM watsonx embedded provider for IBM Cloud"
        );
    }

    #[tokio::test]
    async fn test_unauthorized_clears_cached_token() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/identity/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "revoked-token",
                "expires_in": 3600
            })))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        mount_iam(&server, 1).await;

        Mock::given(method("POST"))
            .and(path("/ml/v1/text/embeddings"))
            .and(header("Authorization", "Bearer revoked-token"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "errors": [{"message": "Expired token"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/ml/v1/text/embeddings"))
            .and(header("Authorization", "Bearer iam-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{"embedding": [0.5]}],
                "input_token_count": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        let service = cloud_service(&server);
        let err = service.embed_text(embed_request()).await.unwrap_err();
        assert_eq!(err.to_string(), "401 Unauthorized: Expired token");

        let response = service.embed_text(embed_request()).await.unwrap();
        assert_eq!(response.results.unwrap()[0].embedding, vec![0.5_f32]);
    }

    #[tokio::test]
    async fn test_empty_error_body() {
        let server = MockServer::start().await;
        mount_iam(&server, 1).await;

        Mock::given(method("POST"))
            .and(path("/ml/v1/text/embeddings"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let service = cloud_service(&server);
        let err = service.embed_text(embed_request()).await.unwrap_err();
        assert_eq!(err.to_string(), "503 Service Unavailable");
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"errors":[{"code":"x","message":"Model not supported"}]}"#),
            "Model not supported"
        );
        assert_eq!(error_message("plain failure\n"), "plain failure");
    }
}
