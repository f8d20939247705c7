//! Check outcomes and the reporting boundary.
//!
//! Core components never print. Every result flows through a [`Reporter`]
//! as a structured [`CheckOutcome`], and the two built-in reporters render
//! the run either as the familiar colorized console output or as JSON
//! lines for automation.

use colored::Colorize;
use serde::Serialize;

use crate::engine::HealthVerdict;

/// Category a check outcome belongs to, in stage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckCategory {
    Connectivity,
    Deployments,
    Pods,
    Services,
    Ingress,
    Events,
    Endpoints,
    Assets,
    LoadTest,
    Content,
    Performance,
}

impl CheckCategory {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connectivity => "connectivity",
            Self::Deployments => "deployments",
            Self::Pods => "pods",
            Self::Services => "services",
            Self::Ingress => "ingress",
            Self::Events => "events",
            Self::Endpoints => "endpoints",
            Self::Assets => "assets",
            Self::LoadTest => "load-test",
            Self::Content => "content",
            Self::Performance => "performance",
        }
    }

    /// Section heading shown above the category's outcomes.
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Connectivity => "Cluster Connectivity",
            Self::Deployments => "Deployment Status",
            Self::Pods => "Pod Status",
            Self::Services => "Service Status",
            Self::Ingress => "Ingress Status",
            Self::Events => "Recent Warning Events",
            Self::Endpoints => "Main Endpoints",
            Self::Assets => "Static Assets",
            Self::LoadTest => "Load Tests",
            Self::Content => "Content Validation",
            Self::Performance => "Performance",
        }
    }
}

/// One check result flowing to the reporter and into the verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    pub category: CheckCategory,
    pub target: String,
    pub passed: bool,
    pub detail: String,
    /// Advisory outcomes are reported but never folded into the verdict.
    pub advisory: bool,
    /// Raw diagnostic lines attached for operator visibility.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<String>,
}

impl CheckOutcome {
    #[must_use]
    pub fn pass(
        category: CheckCategory,
        target: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            category,
            target: target.into(),
            passed: true,
            detail: detail.into(),
            advisory: false,
            diagnostics: Vec::new(),
        }
    }

    #[must_use]
    pub fn fail(
        category: CheckCategory,
        target: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            category,
            target: target.into(),
            passed: false,
            detail: detail.into(),
            advisory: false,
            diagnostics: Vec::new(),
        }
    }

    /// An advisory pass: shown for visibility, ignored by the verdict.
    #[must_use]
    pub fn info(
        category: CheckCategory,
        target: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            category,
            target: target.into(),
            passed: true,
            detail: detail.into(),
            advisory: true,
            diagnostics: Vec::new(),
        }
    }

    /// An advisory failure: rendered as a warning, ignored by the verdict.
    #[must_use]
    pub fn warn(
        category: CheckCategory,
        target: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            category,
            target: target.into(),
            passed: false,
            detail: detail.into(),
            advisory: true,
            diagnostics: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Vec<String>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Identifier used in the verdict's failing-check list.
    #[must_use]
    pub fn id(&self) -> String {
        format!("{}/{}", self.category.as_str(), self.target)
    }
}

/// Sink for a validation run.
///
/// The engine pushes each outcome the moment it completes, then the final
/// verdict. Implementations own all rendering; nothing else in the crate
/// writes to stdout.
pub trait Reporter: Send {
    /// Called once per stage, before its outcomes.
    fn section(&mut self, title: &str);

    fn outcome(&mut self, outcome: &CheckOutcome);

    /// Called exactly once, after the last outcome.
    fn verdict(&mut self, verdict: &HealthVerdict);
}

/// Renders the run as colorized console output.
#[derive(Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn section(&mut self, title: &str) {
        println!("\n{}", format!("=== {title} ===").blue().bold());
    }

    fn outcome(&mut self, outcome: &CheckOutcome) {
        let line = format!("{}: {}", outcome.target, outcome.detail);
        if outcome.advisory && !outcome.passed {
            println!("{}", format!("⚠️  {line}").yellow());
        } else if outcome.passed {
            println!("{}", format!("✅ {line}").green());
        } else {
            println!("{}", format!("❌ {line}").red());
        }
        for diagnostic in &outcome.diagnostics {
            println!("{}", format!("   {diagnostic}").yellow());
        }
    }

    fn verdict(&mut self, verdict: &HealthVerdict) {
        println!("\n{}", "=".repeat(50).blue());
        if verdict.fatal {
            println!("{}", "❌ Validation aborted: cluster unreachable".red().bold());
        } else if verdict.overall_pass {
            println!("{}", "🎉 Overall health check: PASSED".green().bold());
        } else {
            println!("{}", "❌ Overall health check: FAILED".red().bold());
            for id in &verdict.failing_checks {
                println!("{}", format!("   - {id}").red());
            }
        }
    }
}

/// Emits one JSON record per outcome plus a final verdict record, for
/// piping into automation.
#[derive(Default)]
pub struct JsonReporter;

impl Reporter for JsonReporter {
    fn section(&mut self, _title: &str) {}

    fn outcome(&mut self, outcome: &CheckOutcome) {
        let record = serde_json::json!({
            "type": "check",
            "category": outcome.category.as_str(),
            "target": outcome.target,
            "passed": outcome.passed,
            "advisory": outcome.advisory,
            "detail": outcome.detail,
            "diagnostics": outcome.diagnostics,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        println!("{record}");
    }

    fn verdict(&mut self, verdict: &HealthVerdict) {
        let record = serde_json::json!({
            "type": "verdict",
            "overall_pass": verdict.overall_pass,
            "fatal": verdict.fatal,
            "failing_checks": verdict.failing_checks,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        println!("{record}");
    }
}

/// Reporter that only accumulates, for tests and embedding.
#[derive(Default)]
pub struct RecordingReporter {
    pub sections: Vec<String>,
    pub outcomes: Vec<CheckOutcome>,
    pub verdicts: Vec<HealthVerdict>,
}

impl Reporter for RecordingReporter {
    fn section(&mut self, title: &str) {
        self.sections.push(title.to_string());
    }

    fn outcome(&mut self, outcome: &CheckOutcome) {
        self.outcomes.push(outcome.clone());
    }

    fn verdict(&mut self, verdict: &HealthVerdict) {
        self.verdicts.push(verdict.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_id_combines_category_and_target() {
        let outcome = CheckOutcome::fail(CheckCategory::Endpoints, "Console App", "HTTP 502");
        assert_eq!(outcome.id(), "endpoints/Console App");
    }

    #[test]
    fn test_constructors_set_advisory_flag() {
        assert!(!CheckOutcome::pass(CheckCategory::Pods, "p", "ok").advisory);
        assert!(!CheckOutcome::fail(CheckCategory::Pods, "p", "bad").advisory);
        assert!(CheckOutcome::info(CheckCategory::Services, "s", "listed").advisory);
        let warning = CheckOutcome::warn(CheckCategory::Assets, "a", "missing");
        assert!(warning.advisory);
        assert!(!warning.passed);
    }

    #[test]
    fn test_category_identifiers_are_stable() {
        assert_eq!(CheckCategory::LoadTest.as_str(), "load-test");
        assert_eq!(CheckCategory::Connectivity.as_str(), "connectivity");
        assert_eq!(CheckCategory::LoadTest.title(), "Load Tests");
    }
}
