//! Concurrent availability testing of a single endpoint.

use futures::future::join_all;
use serde::Serialize;
use tracing::debug;

use crate::probe::{Prober, DEFAULT_PROBE_TIMEOUT};

/// Success-rate threshold (percent) a batch must reach to pass. The
/// boundary is inclusive: a batch at exactly this rate passes.
pub const PASS_RATE_PERCENT: u32 = 80;

/// Batch size used by the standard validation run.
pub const DEFAULT_SAMPLE_SIZE: usize = 5;

/// Status every load-test sample expects.
const SAMPLE_EXPECTED_STATUS: u16 = 200;

/// Aggregate of one load-test batch.
#[derive(Debug, Clone, Serialize)]
pub struct LoadTestResult {
    pub url: String,
    pub label: String,
    pub sample_size: usize,
    pub success_count: usize,
    /// Rounded success rate in percent.
    pub success_rate: u32,
    pub passed: bool,
}

impl LoadTestResult {
    /// One-line summary for check details.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{}/{} requests successful ({}%)",
            self.success_count, self.sample_size, self.success_rate
        )
    }
}

/// Fires batches of concurrent probes against one URL and grades the batch.
pub struct LoadTester {
    prober: Prober,
}

impl LoadTester {
    #[must_use]
    pub fn new(prober: Prober) -> Self {
        Self { prober }
    }

    /// Probe `url` with `sample_size` concurrent requests.
    ///
    /// Every sample is started up front and the batch joins on all of
    /// them, so a slow or failing sample never hides the rest. The rate is
    /// computed only once each sample has settled.
    pub async fn run(&self, url: &str, label: &str, sample_size: usize) -> LoadTestResult {
        let samples = (0..sample_size).map(|i| {
            let request_label = format!("{label} request {}", i + 1);
            async move {
                self.prober
                    .probe(url, &request_label, SAMPLE_EXPECTED_STATUS, DEFAULT_PROBE_TIMEOUT)
                    .await
            }
        });
        let results = join_all(samples).await;

        let success_count = results.iter().filter(|r| r.success).count();
        let success_rate = rate_percent(success_count, sample_size);
        let passed = success_rate >= PASS_RATE_PERCENT;
        debug!(url, success_count, sample_size, success_rate, "load test batch settled");

        LoadTestResult {
            url: url.to_string(),
            label: label.to_string(),
            sample_size,
            success_count,
            success_rate,
            passed,
        }
    }
}

/// Success rate in whole percent, rounded half-up.
fn rate_percent(success_count: usize, sample_size: usize) -> u32 {
    if sample_size == 0 {
        return 0;
    }
    let scaled = success_count * 100 + sample_size / 2;
    u32::try_from(scaled / sample_size).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_is_rounded() {
        assert_eq!(rate_percent(5, 5), 100);
        assert_eq!(rate_percent(4, 5), 80);
        assert_eq!(rate_percent(3, 5), 60);
        assert_eq!(rate_percent(0, 5), 0);
        assert_eq!(rate_percent(1, 3), 33);
        assert_eq!(rate_percent(2, 3), 67);
    }

    #[test]
    fn test_zero_sample_size_yields_zero_rate() {
        assert_eq!(rate_percent(0, 0), 0);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        // 4/5 lands exactly on the threshold and must pass.
        assert!(rate_percent(4, 5) >= PASS_RATE_PERCENT);
        assert!(rate_percent(3, 5) < PASS_RATE_PERCENT);
    }

    #[test]
    fn test_summary_reports_count_and_rate() {
        let result = LoadTestResult {
            url: "http://10.0.0.1/".to_string(),
            label: "Host App".to_string(),
            sample_size: 5,
            success_count: 4,
            success_rate: 80,
            passed: true,
        };
        assert_eq!(result.summary(), "4/5 requests successful (80%)");
    }
}
