//! Post-deploy health validation for the MFE stack.
//!
//! After a deploy, `checkup` answers one question: is the thing actually
//! up? A single run checks the control plane for resource health
//! (deployments, pods, services, ingress, warning events), discovers the
//! externally assigned ingress address, probes the live endpoints, runs a
//! small concurrent load test, verifies page content, and folds all of it
//! into one pass/fail verdict and exit code.
//!
//! # Architecture
//!
//! - [`cluster::ClusterClient`] is the read-only control-plane boundary,
//!   with a kube-backed production implementation and an in-memory one
//!   for tests.
//! - [`resources::ResourceCollector`] turns typed cluster objects into
//!   per-resource health judgments.
//! - [`probe::Prober`], [`loadtest::LoadTester`], and
//!   [`content::ContentValidator`] cover the HTTP side. None of them ever
//!   return an error: bad outcomes are ordinary values, so one dead
//!   endpoint can never take down the run that is reporting on it.
//! - [`engine::ValidationEngine`] drives the stages in order and folds
//!   the [`engine::HealthVerdict`]; every result flows through a
//!   [`report::Reporter`], which owns all output.

pub mod cluster;
pub mod content;
pub mod engine;
pub mod loadtest;
pub mod probe;
pub mod report;
pub mod resources;
pub mod targets;

pub use cluster::{ClusterClient, ClusterError, KubeClusterClient, StaticClusterClient};
pub use engine::{HealthVerdict, RunReport, ValidationEngine};
pub use report::{CheckCategory, CheckOutcome, ConsoleReporter, JsonReporter, Reporter};
