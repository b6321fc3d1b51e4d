//! Server-to-server channel to the provider's verification endpoint.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

use super::error::{OpenIdError, OpenIdResult};

/// Something that can submit a `check_authentication` request.
#[async_trait]
pub trait VerificationTransport: Send + Sync {
    /// POST `params` form-encoded to `endpoint` and return the response body.
    async fn check_authentication(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> OpenIdResult<String>;
}

/// reqwest-backed transport with a bounded request timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> OpenIdResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OpenIdError::Transport(format!("building HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl VerificationTransport for HttpTransport {
    #[instrument(skip(self, params))]
    async fn check_authentication(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> OpenIdResult<String> {
        let response = self
            .client
            .post(endpoint)
            .form(params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OpenIdError::Transport(format!("timed out contacting {endpoint}"))
                } else {
                    OpenIdError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        debug!(%status, "verification response received");
        if !status.is_success() {
            return Err(OpenIdError::Transport(format!(
                "provider answered with status {status}"
            )));
        }

        response
            .text()
            .await
            .map_err(|e| OpenIdError::Transport(format!("reading response body: {e}")))
    }
}
