//! Response-body content validation.

use tracing::debug;

use crate::probe::DEFAULT_PROBE_TIMEOUT;

/// Checks fetched page bodies for required content markers.
///
/// Validation is strictly boolean: a fetch error of any kind (refused
/// connection, DNS failure, timeout, interrupted body read) counts as
/// "content not present". Content checks never terminate a run.
pub struct ContentValidator {
    client: reqwest::Client,
}

impl ContentValidator {
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// True iff `url` currently serves a body containing `expected`.
    pub async fn check(&self, url: &str, expected: &str) -> bool {
        match tokio::time::timeout(DEFAULT_PROBE_TIMEOUT, self.fetch(url)).await {
            Ok(Ok(body)) => body.contains(expected),
            Ok(Err(e)) => {
                debug!(url, error = %e, "content fetch failed");
                false
            }
            Err(_) => {
                debug!(url, "content fetch timed out");
                false
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<String, reqwest::Error> {
        self.client.get(url).send().await?.text().await
    }
}
