//! Single-shot HTTP endpoint probing.

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

/// Status recorded when no HTTP response arrived at all (connection
/// refused, DNS failure, timeout). Zero sits outside the valid HTTP range,
/// so it can never collide with a real response and "unreachable" folds
/// into the same comparison as "wrong status code".
pub const STATUS_UNREACHABLE: u16 = 0;

/// Per-probe timeout. This is the only time bound in a validation run.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Responses slower than this carry a slow-response note in their summary.
pub const SLOW_PROBE_SECS: f64 = 5.0;

/// Body prefix length kept on each result for diagnostics.
const SNIPPET_LEN: usize = 200;

/// Outcome of one HTTP probe.
///
/// Probing never returns an error: every failure mode ends up in
/// `actual_status` so downstream aggregation treats all probes uniformly.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub url: String,
    pub label: String,
    pub expected_status: u16,
    pub actual_status: u16,
    pub elapsed_secs: f64,
    /// Leading slice of the response body, empty when nothing was received.
    pub snippet: String,
    /// Size of the full response body in bytes.
    pub body_bytes: usize,
    /// True iff `actual_status == expected_status`.
    pub success: bool,
}

impl ProbeResult {
    /// True when any HTTP response arrived, regardless of its status.
    #[must_use]
    pub fn responded(&self) -> bool {
        self.actual_status != STATUS_UNREACHABLE
    }

    /// One-line summary for check details.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut summary = if self.responded() {
            format!(
                "HTTP {} (expected {}) in {:.2}s",
                self.actual_status, self.expected_status, self.elapsed_secs
            )
        } else {
            format!(
                "no response (expected {}) after {:.2}s",
                self.expected_status, self.elapsed_secs
            )
        };
        if self.responded() && self.elapsed_secs > SLOW_PROBE_SECS {
            summary.push_str(" - slow response");
        }
        summary
    }
}

/// Issues single GET probes with a hard per-request timeout.
///
/// Clones share the underlying connection pool, so one `Prober` can be
/// handed to every component that touches the HTTP boundary.
#[derive(Clone)]
pub struct Prober {
    client: reqwest::Client,
}

impl Prober {
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Probe `url` once, expecting `expected_status`.
    ///
    /// Single attempt, no retry. The timeout covers the whole fetch,
    /// including the body read.
    pub async fn probe(
        &self,
        url: &str,
        label: &str,
        expected_status: u16,
        timeout: Duration,
    ) -> ProbeResult {
        let start = Instant::now();
        let fetched = tokio::time::timeout(timeout, self.fetch(url)).await;
        let elapsed_secs = start.elapsed().as_secs_f64();

        let (actual_status, snippet, body_bytes) = match fetched {
            Ok(Ok((status, body))) => (status, truncate(&body), body.len()),
            Ok(Err(e)) => {
                debug!(url, error = %e, "probe failed");
                (STATUS_UNREACHABLE, String::new(), 0)
            }
            Err(_) => {
                debug!(url, timeout_secs = timeout.as_secs(), "probe timed out");
                (STATUS_UNREACHABLE, String::new(), 0)
            }
        };

        ProbeResult {
            url: url.to_string(),
            label: label.to_string(),
            expected_status,
            actual_status,
            elapsed_secs,
            snippet,
            body_bytes,
            success: actual_status == expected_status,
        }
    }

    async fn fetch(&self, url: &str) -> Result<(u16, String), reqwest::Error> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok((status, body))
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(SNIPPET_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(actual_status: u16, elapsed_secs: f64) -> ProbeResult {
        ProbeResult {
            url: "http://10.0.0.1/".to_string(),
            label: "Host App".to_string(),
            expected_status: 200,
            actual_status,
            elapsed_secs,
            snippet: String::new(),
            body_bytes: 0,
            success: actual_status == 200,
        }
    }

    #[test]
    fn test_matching_status_is_success() {
        let result = result(200, 0.1);
        assert!(result.success);
        assert!(result.responded());
        assert_eq!(result.summary(), "HTTP 200 (expected 200) in 0.10s");
    }

    #[test]
    fn test_unreachable_uses_sentinel_status() {
        let result = result(STATUS_UNREACHABLE, 10.0);
        assert!(!result.success);
        assert!(!result.responded());
        assert!(result.summary().starts_with("no response"));
    }

    #[test]
    fn test_wrong_status_and_unreachable_compare_identically() {
        // Both fail the same way: actual != expected.
        assert!(!result(500, 0.1).success);
        assert!(!result(STATUS_UNREACHABLE, 0.1).success);
    }

    #[test]
    fn test_slow_response_is_noted() {
        let result = result(200, 7.3);
        assert!(result.success);
        assert!(result.summary().ends_with("slow response"));
    }

    #[test]
    fn test_snippet_is_truncated() {
        let body = "x".repeat(1000);
        assert_eq!(truncate(&body).len(), 200);
        assert_eq!(truncate("short"), "short");
    }
}
