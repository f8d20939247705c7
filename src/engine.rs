//! Validation run driver: stage ordering, accumulation, and the verdict.

use serde::Serialize;
use tracing::{info, warn};

use crate::cluster::ClusterClient;
use crate::content::ContentValidator;
use crate::loadtest::{LoadTester, DEFAULT_SAMPLE_SIZE};
use crate::probe::{Prober, DEFAULT_PROBE_TIMEOUT};
use crate::report::{CheckCategory, CheckOutcome, Reporter};
use crate::resources::{ResourceCollector, ResourceStatus};
use crate::targets::{self, join_url};

/// Exit code for a fully healthy run.
pub const EXIT_HEALTHY: i32 = 0;
/// Exit code when the cluster answered but at least one check failed.
pub const EXIT_UNHEALTHY: i32 = 1;
/// Exit code for the fatal path: control plane unreachable, run aborted
/// before any other check could execute.
pub const EXIT_FATAL: i32 = 2;

/// Assets may legitimately 404 right after a build (hashed bundle names
/// shift); anything else is a real failure.
const ASSET_MISSING_STATUS: u16 = 404;

/// Total response time above this gets a slow note in the performance
/// report.
const SLOW_TOTAL_SECS: f64 = 10.0;

/// Final judgment of one validation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthVerdict {
    pub overall_pass: bool,
    /// Identifiers of failed non-advisory checks, in completion order.
    pub failing_checks: Vec<String>,
    /// True when the run aborted at the connectivity gate. `overall_pass`
    /// carries no meaning in that case and the exit code is forced to the
    /// fatal value.
    pub fatal: bool,
}

impl HealthVerdict {
    /// Fold a run's outcomes into the verdict. The fold is commutative:
    /// reordering outcomes can reorder `failing_checks` but never change
    /// `overall_pass`.
    #[must_use]
    pub fn from_outcomes(outcomes: &[CheckOutcome]) -> Self {
        let failing_checks: Vec<String> = outcomes
            .iter()
            .filter(|o| !o.advisory && !o.passed)
            .map(CheckOutcome::id)
            .collect();
        Self {
            overall_pass: failing_checks.is_empty(),
            failing_checks,
            fatal: false,
        }
    }

    /// Verdict for a run that never got past the connectivity gate.
    #[must_use]
    pub fn aborted(failing_checks: Vec<String>) -> Self {
        Self {
            overall_pass: false,
            failing_checks,
            fatal: true,
        }
    }

    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.fatal {
            EXIT_FATAL
        } else if self.overall_pass {
            EXIT_HEALTHY
        } else {
            EXIT_UNHEALTHY
        }
    }
}

/// Everything a finished run produced.
#[derive(Debug)]
pub struct RunReport {
    pub verdict: HealthVerdict,
    pub outcomes: Vec<CheckOutcome>,
}

/// Drives the full validation sequence against one cluster and the
/// endpoints it exposes.
///
/// Stage order is fixed: connectivity gates everything, and after that
/// every stage runs to completion regardless of earlier results, each
/// appending outcomes to the run accumulator. Within a run the engine
/// only ever appends; nothing rewrites an outcome once recorded.
pub struct ValidationEngine<'a> {
    cluster: &'a dyn ClusterClient,
    prober: Prober,
    load_tester: LoadTester,
    content: ContentValidator,
    sample_size: usize,
}

impl<'a> ValidationEngine<'a> {
    #[must_use]
    pub fn new(cluster: &'a dyn ClusterClient, http: reqwest::Client) -> Self {
        Self {
            cluster,
            prober: Prober::new(http.clone()),
            load_tester: LoadTester::new(Prober::new(http.clone())),
            content: ContentValidator::new(http),
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }

    /// Override the load-test batch size.
    #[must_use]
    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    /// Run every stage in order and fold the verdict.
    pub async fn run(&self, reporter: &mut dyn Reporter) -> RunReport {
        let mut outcomes = Vec::new();

        // Connectivity gates the whole run: nothing else is queried or
        // probed until the control plane has answered once.
        reporter.section(CheckCategory::Connectivity.title());
        match self.cluster.check_connectivity().await {
            Ok(version) => {
                let outcome = CheckOutcome::pass(
                    CheckCategory::Connectivity,
                    "control plane",
                    format!("reachable, server {version}"),
                );
                Self::emit(reporter, &mut outcomes, outcome);
            }
            Err(e) => {
                warn!(error = %e, "control plane unreachable, aborting run");
                let outcome =
                    CheckOutcome::fail(CheckCategory::Connectivity, "control plane", e.to_string());
                Self::emit(reporter, &mut outcomes, outcome);
                let verdict =
                    HealthVerdict::aborted(outcomes.iter().map(CheckOutcome::id).collect());
                reporter.verdict(&verdict);
                return RunReport { verdict, outcomes };
            }
        }

        let external_address = self.resource_stages(reporter, &mut outcomes).await;

        match external_address {
            Some(address) => {
                let base_url = format!("http://{address}");
                info!(base_url = %base_url, "probing deployed endpoints");
                self.endpoint_stage(&base_url, reporter, &mut outcomes).await;
                self.asset_stage(&base_url, reporter, &mut outcomes).await;
                self.load_test_stage(&base_url, reporter, &mut outcomes).await;
                self.content_stage(&base_url, reporter, &mut outcomes).await;
                self.performance_stage(&base_url, reporter, &mut outcomes).await;
            }
            None => {
                // Without a reachable base URL there is nothing sane to
                // probe; the endpoint stages are skipped wholesale.
                reporter.section(CheckCategory::Endpoints.title());
                let outcome = CheckOutcome::fail(
                    CheckCategory::Endpoints,
                    "base URL",
                    "no externally assigned ingress address, endpoint stages skipped",
                );
                Self::emit(reporter, &mut outcomes, outcome);
            }
        }

        let verdict = HealthVerdict::from_outcomes(&outcomes);
        reporter.verdict(&verdict);
        info!(
            overall_pass = verdict.overall_pass,
            failing = verdict.failing_checks.len(),
            "validation run complete"
        );
        RunReport { verdict, outcomes }
    }

    /// Survey cluster resources, one category at a time. A failed query
    /// fails its category and the run moves on. Returns the external
    /// address discovered from the ingress, if any.
    async fn resource_stages(
        &self,
        reporter: &mut dyn Reporter,
        outcomes: &mut Vec<CheckOutcome>,
    ) -> Option<String> {
        let collector = ResourceCollector::new(self.cluster);

        reporter.section(CheckCategory::Deployments.title());
        match collector.collect_deployments().await {
            Ok(statuses) => {
                for status in statuses {
                    Self::emit(
                        reporter,
                        outcomes,
                        Self::resource_outcome(CheckCategory::Deployments, status),
                    );
                }
            }
            Err(e) => {
                warn!(error = %e, "deployment survey failed");
                let outcome =
                    CheckOutcome::fail(CheckCategory::Deployments, "query", e.to_string());
                Self::emit(reporter, outcomes, outcome);
            }
        }

        reporter.section(CheckCategory::Pods.title());
        match collector.collect_pods().await {
            Ok(statuses) => {
                for status in statuses {
                    Self::emit(
                        reporter,
                        outcomes,
                        Self::resource_outcome(CheckCategory::Pods, status),
                    );
                }
            }
            Err(e) => {
                warn!(error = %e, "pod survey failed");
                let outcome = CheckOutcome::fail(CheckCategory::Pods, "query", e.to_string());
                Self::emit(reporter, outcomes, outcome);
            }
        }

        // Services are informational, but an unanswerable query still
        // fails the run.
        reporter.section(CheckCategory::Services.title());
        match collector.collect_services().await {
            Ok(statuses) => {
                for status in statuses {
                    let outcome =
                        CheckOutcome::info(CheckCategory::Services, status.name, status.detail);
                    Self::emit(reporter, outcomes, outcome);
                }
            }
            Err(e) => {
                warn!(error = %e, "service survey failed");
                let outcome = CheckOutcome::fail(CheckCategory::Services, "query", e.to_string());
                Self::emit(reporter, outcomes, outcome);
            }
        }

        reporter.section(CheckCategory::Ingress.title());
        let external_address = match collector.collect_ingresses().await {
            Ok(report) => {
                if report.statuses.is_empty() {
                    let outcome = CheckOutcome::fail(
                        CheckCategory::Ingress,
                        "ingress",
                        "no ingress resources found",
                    );
                    Self::emit(reporter, outcomes, outcome);
                }
                for status in report.statuses {
                    Self::emit(
                        reporter,
                        outcomes,
                        Self::resource_outcome(CheckCategory::Ingress, status),
                    );
                }
                report.external_address
            }
            Err(e) => {
                warn!(error = %e, "ingress survey failed");
                let outcome = CheckOutcome::fail(CheckCategory::Ingress, "query", e.to_string());
                Self::emit(reporter, outcomes, outcome);
                None
            }
        };

        // Warning events are purely advisory, even when the query fails.
        reporter.section(CheckCategory::Events.title());
        match collector.collect_warning_events().await {
            Ok(lines) if lines.is_empty() => {
                let outcome = CheckOutcome::info(
                    CheckCategory::Events,
                    "warning events",
                    "none in the namespace",
                );
                Self::emit(reporter, outcomes, outcome);
            }
            Ok(lines) => {
                let outcome = CheckOutcome::warn(
                    CheckCategory::Events,
                    "warning events",
                    format!("{} recent warning events", lines.len()),
                )
                .with_diagnostics(lines);
                Self::emit(reporter, outcomes, outcome);
            }
            Err(e) => {
                let outcome = CheckOutcome::warn(
                    CheckCategory::Events,
                    "warning events",
                    format!("query failed: {e}"),
                );
                Self::emit(reporter, outcomes, outcome);
            }
        }

        external_address
    }

    async fn endpoint_stage(
        &self,
        base_url: &str,
        reporter: &mut dyn Reporter,
        outcomes: &mut Vec<CheckOutcome>,
    ) {
        reporter.section(CheckCategory::Endpoints.title());
        for target in targets::MAIN_ENDPOINTS {
            let url = join_url(base_url, target.path);
            let result = self
                .prober
                .probe(&url, target.label, target.expected_status, DEFAULT_PROBE_TIMEOUT)
                .await;
            let outcome = if result.success {
                CheckOutcome::pass(CheckCategory::Endpoints, target.label, result.summary())
            } else {
                CheckOutcome::fail(CheckCategory::Endpoints, target.label, result.summary())
            };
            Self::emit(reporter, outcomes, outcome);
        }
    }

    async fn asset_stage(
        &self,
        base_url: &str,
        reporter: &mut dyn Reporter,
        outcomes: &mut Vec<CheckOutcome>,
    ) {
        reporter.section(CheckCategory::Assets.title());
        for target in targets::STATIC_ASSETS {
            let url = join_url(base_url, target.path);
            let result = self
                .prober
                .probe(&url, target.label, target.expected_status, DEFAULT_PROBE_TIMEOUT)
                .await;
            let outcome = if result.success {
                CheckOutcome::pass(CheckCategory::Assets, target.label, result.summary())
            } else if result.actual_status == ASSET_MISSING_STATUS {
                CheckOutcome::warn(
                    CheckCategory::Assets,
                    target.label,
                    "not found (bundle may use a different name)",
                )
            } else {
                CheckOutcome::fail(CheckCategory::Assets, target.label, result.summary())
            };
            Self::emit(reporter, outcomes, outcome);
        }
    }

    async fn load_test_stage(
        &self,
        base_url: &str,
        reporter: &mut dyn Reporter,
        outcomes: &mut Vec<CheckOutcome>,
    ) {
        reporter.section(CheckCategory::LoadTest.title());
        for target in targets::LOAD_TEST_TARGETS {
            let url = join_url(base_url, target.path);
            let result = self.load_tester.run(&url, target.label, self.sample_size).await;
            let outcome = if result.passed {
                CheckOutcome::pass(CheckCategory::LoadTest, target.label, result.summary())
            } else {
                CheckOutcome::fail(CheckCategory::LoadTest, target.label, result.summary())
            };
            Self::emit(reporter, outcomes, outcome);
        }
    }

    async fn content_stage(
        &self,
        base_url: &str,
        reporter: &mut dyn Reporter,
        outcomes: &mut Vec<CheckOutcome>,
    ) {
        reporter.section(CheckCategory::Content.title());
        for target in targets::CONTENT_CHECKS {
            let url = join_url(base_url, target.path);
            let found = self.content.check(&url, target.expected).await;
            let outcome = if found {
                CheckOutcome::pass(
                    CheckCategory::Content,
                    target.label,
                    format!("body contains {:?}", target.expected),
                )
            } else {
                CheckOutcome::fail(
                    CheckCategory::Content,
                    target.label,
                    format!("body does not contain {:?}", target.expected),
                )
            };
            Self::emit(reporter, outcomes, outcome);
        }
    }

    /// Timings are informational; only a completely unreachable endpoint
    /// fails here.
    async fn performance_stage(
        &self,
        base_url: &str,
        reporter: &mut dyn Reporter,
        outcomes: &mut Vec<CheckOutcome>,
    ) {
        reporter.section(CheckCategory::Performance.title());
        for target in targets::PERFORMANCE_TARGETS {
            let url = join_url(base_url, target.path);
            let result = self
                .prober
                .probe(&url, target.label, 200, DEFAULT_PROBE_TIMEOUT)
                .await;
            let outcome = if result.responded() {
                let mut detail =
                    format!("{:.2}s total, {} bytes", result.elapsed_secs, result.body_bytes);
                if result.elapsed_secs > SLOW_TOTAL_SECS {
                    detail.push_str(" - slow");
                }
                CheckOutcome::pass(CheckCategory::Performance, target.label, detail)
            } else {
                CheckOutcome::fail(CheckCategory::Performance, target.label, result.summary())
            };
            Self::emit(reporter, outcomes, outcome);
        }
    }

    fn resource_outcome(category: CheckCategory, status: ResourceStatus) -> CheckOutcome {
        let outcome = if status.healthy {
            CheckOutcome::pass(category, status.name, status.detail)
        } else {
            CheckOutcome::fail(category, status.name, status.detail)
        };
        outcome.with_diagnostics(status.diagnostics)
    }

    fn emit(reporter: &mut dyn Reporter, outcomes: &mut Vec<CheckOutcome>, outcome: CheckOutcome) {
        reporter.outcome(&outcome);
        outcomes.push(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::StaticClusterClient;
    use crate::report::RecordingReporter;

    fn engine<'a>(cluster: &'a StaticClusterClient) -> ValidationEngine<'a> {
        ValidationEngine::new(cluster, reqwest::Client::new())
    }

    #[test]
    fn test_verdict_folding_ignores_advisory_outcomes() {
        let outcomes = vec![
            CheckOutcome::pass(CheckCategory::Pods, "a", "ok"),
            CheckOutcome::warn(CheckCategory::Assets, "b", "missing"),
            CheckOutcome::info(CheckCategory::Services, "c", "listed"),
        ];
        let verdict = HealthVerdict::from_outcomes(&outcomes);
        assert!(verdict.overall_pass);
        assert!(verdict.failing_checks.is_empty());
    }

    #[test]
    fn test_verdict_folding_collects_failures() {
        let outcomes = vec![
            CheckOutcome::pass(CheckCategory::Pods, "a", "ok"),
            CheckOutcome::fail(CheckCategory::Endpoints, "Console App", "HTTP 502"),
            CheckOutcome::fail(CheckCategory::Content, "Host App", "marker missing"),
        ];
        let verdict = HealthVerdict::from_outcomes(&outcomes);
        assert!(!verdict.overall_pass);
        assert_eq!(
            verdict.failing_checks,
            vec!["endpoints/Console App", "content/Host App"]
        );
    }

    #[test]
    fn test_verdict_folding_is_order_independent() {
        let mut outcomes = vec![
            CheckOutcome::fail(CheckCategory::Endpoints, "a", "bad"),
            CheckOutcome::pass(CheckCategory::Pods, "b", "ok"),
            CheckOutcome::fail(CheckCategory::LoadTest, "c", "3/5"),
        ];
        let forward = HealthVerdict::from_outcomes(&outcomes);
        outcomes.reverse();
        let backward = HealthVerdict::from_outcomes(&outcomes);

        assert_eq!(forward.overall_pass, backward.overall_pass);
        let mut lhs = forward.failing_checks.clone();
        let mut rhs = backward.failing_checks.clone();
        lhs.sort();
        rhs.sort();
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(HealthVerdict::from_outcomes(&[]).exit_code(), EXIT_HEALTHY);
        let failing =
            HealthVerdict::from_outcomes(&[CheckOutcome::fail(CheckCategory::Pods, "p", "bad")]);
        assert_eq!(failing.exit_code(), EXIT_UNHEALTHY);
        assert_eq!(
            HealthVerdict::aborted(vec!["connectivity/control plane".to_string()]).exit_code(),
            EXIT_FATAL
        );
    }

    #[tokio::test]
    async fn test_unreachable_cluster_aborts_before_any_query() {
        let cluster = StaticClusterClient::unreachable("connection refused");
        let mut reporter = RecordingReporter::default();
        let report = engine(&cluster).run(&mut reporter).await;

        assert!(report.verdict.fatal);
        assert!(!report.verdict.overall_pass);
        assert_eq!(report.verdict.exit_code(), EXIT_FATAL);
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].category, CheckCategory::Connectivity);
        // Nothing after the gate ran.
        assert_eq!(cluster.query_count(), 0);
        assert_eq!(reporter.verdicts.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_ingress_address_skips_endpoint_stages() {
        let cluster = StaticClusterClient::default();
        let mut reporter = RecordingReporter::default();
        let report = engine(&cluster).run(&mut reporter).await;

        assert!(!report.verdict.fatal);
        assert!(!report.verdict.overall_pass);
        // The base URL failure is recorded once, and no probe-backed
        // category ever produced an outcome.
        assert!(report
            .outcomes
            .iter()
            .any(|o| o.category == CheckCategory::Endpoints && o.target == "base URL"));
        assert!(!report.outcomes.iter().any(|o| matches!(
            o.category,
            CheckCategory::Assets | CheckCategory::LoadTest | CheckCategory::Content
        )));
    }

    #[tokio::test]
    async fn test_failed_category_does_not_stop_later_categories() {
        let cluster = StaticClusterClient::default()
            .with_failed_deployments("watch cache unavailable")
            .with_failed_events("events disabled");
        let mut reporter = RecordingReporter::default();
        let report = engine(&cluster).run(&mut reporter).await;

        let deployment_failure = report
            .outcomes
            .iter()
            .find(|o| o.category == CheckCategory::Deployments)
            .unwrap();
        assert!(!deployment_failure.passed);
        assert!(deployment_failure.detail.contains("watch cache unavailable"));
        // The events query failure stays advisory.
        let events = report
            .outcomes
            .iter()
            .find(|o| o.category == CheckCategory::Events)
            .unwrap();
        assert!(events.advisory);
        assert!(!report
            .verdict
            .failing_checks
            .iter()
            .any(|id| id.starts_with("events/")));
        // All five resource queries were still issued.
        assert_eq!(cluster.query_count(), 5);
    }
}
