//! Remote cover download.
//!
//! Buffers the full response body in memory; the cover store writes it out.
//! No retries, no size cap, no content-type check.

use std::time::Duration;

use crate::domain::DomainError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct CoverFetcher {
    client: reqwest::Client,
}

impl CoverFetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("estante/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("failed to build HTTP client");

        Self { client }
    }

    /// Fetch the resource at `url`, failing on any network error or non-2xx
    /// status.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, DomainError> {
        tracing::debug!(url, "downloading cover image");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DomainError::Fetch(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DomainError::Fetch(format!(
                "server returned HTTP {}",
                status
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| DomainError::Fetch(format!("failed to read response body: {}", e)))?;

        tracing::debug!(url, size = bytes.len(), "cover image downloaded");

        Ok(bytes.to_vec())
    }
}

impl Default for CoverFetcher {
    fn default() -> Self {
        Self::new()
    }
}
