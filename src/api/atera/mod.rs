pub mod agents;
pub mod types;

use crate::api::ApiError;
use crate::config::AteraConfig;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::{Client, Method, Response};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

/// Client for the Atera v3 REST API.
///
/// Holds the API key it sends as `X-API-KEY`. Cloning is cheap; the
/// underlying connection pool is shared.
#[derive(Clone, Debug)]
pub struct AteraClient {
    pub(crate) client: Client,
    pub(crate) config: AteraConfig,
    pub(crate) api_key: Option<SecretString>,
}

impl AteraClient {
    pub fn new(config: AteraConfig) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            client,
            config,
            api_key: None,
        })
    }

    pub fn set_api_key(&mut self, key: SecretString) {
        self.api_key = Some(key);
    }

    pub fn clear_api_key(&mut self) {
        self.api_key = None;
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// A copy of this client that authenticates with `key`, leaving `self` untouched.
    pub fn with_api_key(&self, key: SecretString) -> Self {
        Self {
            client: self.client.clone(),
            config: self.config.clone(),
            api_key: Some(key),
        }
    }

    /// Sends one request, retrying rate limits, server errors, timeouts and
    /// connection failures with exponential backoff.
    ///
    /// DELETE goes through the same policy. A retried delete whose first
    /// attempt actually succeeded upstream comes back as `NotFound`.
    pub(crate) async fn send(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<Response, ApiError> {
        let api_key = self.api_key.as_ref().ok_or(ApiError::CredentialMissing)?;
        let url = format!("{}/{}", self.config.api_url.trim_end_matches('/'), endpoint);

        let mut attempt: u32 = 0;
        loop {
            debug!(%method, %url, attempt, "sending request");

            let result = self
                .client
                .request(method.clone(), &url)
                .header("X-API-KEY", api_key.expose_secret())
                .header(ACCEPT, "application/json")
                .header(CACHE_CONTROL, "no-cache")
                .query(query)
                .send()
                .await;

            let error = match result {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    ApiError::from_status(status, &body)
                }
                Err(e) if e.is_timeout() => ApiError::Timeout {
                    timeout_secs: self.config.request_timeout.as_secs(),
                },
                Err(e) => ApiError::Transport(e),
            };

            if error.is_transient() && attempt < self.config.max_retries {
                let delay = self
                    .config
                    .retry_delay
                    .saturating_mul(2u32.saturating_pow(attempt));
                warn!(%method, %url, attempt, ?delay, error = %error, "transient failure, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            return Err(error);
        }
    }
}
