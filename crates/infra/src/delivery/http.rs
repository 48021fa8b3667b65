//! HTTP delivery sink.
//!
//! POSTs encoded payloads to a push target or export destination with
//! per-destination auth header injection. Non-2xx responses count as
//! delivery failures so the caller's retry/reporting path engages.

use std::time::Duration;

use async_trait::async_trait;
use pharos_common::{CommonError, CommonResult};
use pharos_core::DeliverySink;
use pharos_domain::AuthConfig;
use tracing::trace;

/// Request timeout applied to every delivery.
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Delivers payloads over HTTP POST.
#[derive(Debug, Clone)]
pub struct HttpDeliverySink {
    name: String,
    url: String,
    auth: AuthConfig,
    client: reqwest::Client,
}

impl HttpDeliverySink {
    /// Create a sink posting to `url` with the given auth.
    pub fn new(name: impl Into<String>, url: impl Into<String>, auth: AuthConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DELIVERY_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { name: name.into(), url: url.into(), auth, client }
    }

    /// Sink name used in failure reports.
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl DeliverySink for HttpDeliverySink {
    async fn deliver(&self, payload: &str, content_type: &str) -> CommonResult<()> {
        let mut request = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(payload.to_string());

        request = match &self.auth {
            AuthConfig::None => request,
            AuthConfig::Bearer { token } => request.bearer_auth(token),
            AuthConfig::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
            AuthConfig::ApiKey { header, key } => request.header(header.as_str(), key.as_str()),
        };

        let response = request
            .send()
            .await
            .map_err(|e| CommonError::delivery(&self.name, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CommonError::delivery(
                &self.name,
                format!("unexpected status {status}"),
            ));
        }

        trace!(sink = %self.name, bytes = payload.len(), "Delivered payload");
        Ok(())
    }
}
