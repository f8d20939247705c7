//! Health judgments for cluster resources.
//!
//! Each resource kind has its own notion of healthy: deployments count
//! replicas, pods look at phase plus the Ready condition, services are
//! enumerated for visibility, and ingress needs an externally assigned
//! address. All judgments are pure functions over the typed objects the
//! control plane returned, so every rule is unit-testable without a
//! cluster.

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Event, Pod, Service};
use k8s_openapi::api::networking::v1::Ingress;
use serde::Serialize;

use crate::cluster::{ClusterClient, ClusterError};

/// Pod phase required for health.
const PHASE_RUNNING: &str = "Running";

/// Pod condition type consulted for readiness.
const CONDITION_READY: &str = "Ready";

/// Resource kinds the collector reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Deployment,
    Pod,
    Service,
    Ingress,
}

impl ResourceKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deployment => "deployment",
            Self::Pod => "pod",
            Self::Service => "service",
            Self::Ingress => "ingress",
        }
    }
}

/// Health judgment for one cluster resource.
///
/// The shape is unified across kinds so reporting stays uniform; count
/// fields are only populated for deployments, phase and readiness only
/// for pods.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceStatus {
    pub kind: ResourceKind,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ready: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ready_condition: Option<bool>,
    pub healthy: bool,
    pub detail: String,
    /// Raw diagnostic lines (container states and the like) attached for
    /// operator visibility; never interpreted.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<String>,
}

/// Ingress survey: per-ingress judgments plus the first externally
/// assigned address, which the endpoint stages probe against.
#[derive(Debug, Clone)]
pub struct IngressReport {
    pub statuses: Vec<ResourceStatus>,
    pub external_address: Option<String>,
}

/// Collects per-resource health through a [`ClusterClient`].
pub struct ResourceCollector<'a> {
    cluster: &'a dyn ClusterClient,
}

impl<'a> ResourceCollector<'a> {
    #[must_use]
    pub fn new(cluster: &'a dyn ClusterClient) -> Self {
        Self { cluster }
    }

    pub async fn collect_deployments(&self) -> Result<Vec<ResourceStatus>, ClusterError> {
        let items = self.cluster.list_deployments().await?;
        Ok(items.iter().map(deployment_status).collect())
    }

    pub async fn collect_pods(&self) -> Result<Vec<ResourceStatus>, ClusterError> {
        let items = self.cluster.list_pods().await?;
        Ok(items.iter().map(pod_status).collect())
    }

    pub async fn collect_services(&self) -> Result<Vec<ResourceStatus>, ClusterError> {
        let items = self.cluster.list_services().await?;
        Ok(items.iter().map(service_status).collect())
    }

    pub async fn collect_ingresses(&self) -> Result<IngressReport, ClusterError> {
        let items = self.cluster.list_ingresses().await?;
        let statuses = items.iter().map(ingress_status).collect();
        let external_address = items.iter().find_map(ingress_address);
        Ok(IngressReport {
            statuses,
            external_address,
        })
    }

    /// Warning events formatted for display, oldest first.
    pub async fn collect_warning_events(&self) -> Result<Vec<String>, ClusterError> {
        let mut events = self.cluster.list_warning_events().await?;
        events.sort_by_key(|e| e.metadata.creation_timestamp.as_ref().map(|t| t.0));
        Ok(events.iter().map(format_event).collect())
    }
}

/// A deployment is healthy iff ready and available replicas both equal
/// the desired count. Missing counts are treated as zero, so a brand-new
/// deployment with no status yet reads 0/0 and passes only when nothing
/// is desired either.
fn deployment_status(deployment: &Deployment) -> ResourceStatus {
    let name = object_name(deployment.metadata.name.as_deref());
    let desired = deployment
        .spec
        .as_ref()
        .and_then(|s| s.replicas)
        .unwrap_or(0);
    let status = deployment.status.as_ref();
    let ready = status.and_then(|s| s.ready_replicas).unwrap_or(0);
    let available = status.and_then(|s| s.available_replicas).unwrap_or(0);
    let healthy = ready == desired && available == desired;

    let detail = if ready == available {
        format!("{ready}/{desired} replicas ready")
    } else {
        format!("{ready}/{desired} replicas ready, {available}/{desired} available")
    };

    ResourceStatus {
        kind: ResourceKind::Deployment,
        name,
        desired: Some(desired),
        ready: Some(ready),
        available: Some(available),
        phase: None,
        ready_condition: None,
        healthy,
        detail,
        diagnostics: Vec::new(),
    }
}

/// A pod is healthy iff its phase is `Running` and its `Ready` condition
/// is `True`. Succeeded or Pending pods are unhealthy here on purpose: a
/// serving workload is expected to be running. For unhealthy pods the raw
/// container states come along as diagnostics.
fn pod_status(pod: &Pod) -> ResourceStatus {
    let name = object_name(pod.metadata.name.as_deref());
    let status = pod.status.as_ref();
    let phase = status
        .and_then(|s| s.phase.clone())
        .unwrap_or_else(|| "Unknown".to_string());
    let ready = status
        .and_then(|s| s.conditions.as_ref())
        .and_then(|conditions| conditions.iter().find(|c| c.type_ == CONDITION_READY))
        .is_some_and(|c| c.status == "True");
    let healthy = phase == PHASE_RUNNING && ready;

    let detail = if healthy {
        format!("{phase} and {CONDITION_READY}")
    } else if ready {
        format!("{phase} (Ready)")
    } else {
        format!("{phase} (Not Ready)")
    };

    let mut diagnostics = Vec::new();
    if !healthy {
        if let Some(containers) = status.and_then(|s| s.container_statuses.as_ref()) {
            for container in containers.iter().filter(|c| !c.ready) {
                diagnostics.push(format!(
                    "container {}: {}",
                    container.name,
                    container_state(container)
                ));
            }
        }
    }

    ResourceStatus {
        kind: ResourceKind::Pod,
        name,
        desired: None,
        ready: None,
        available: None,
        phase: Some(phase),
        ready_condition: Some(ready),
        healthy,
        detail,
        diagnostics,
    }
}

fn container_state(container: &k8s_openapi::api::core::v1::ContainerStatus) -> String {
    container
        .state
        .as_ref()
        .and_then(|state| serde_json::to_string(state).ok())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Services are enumerated for visibility and always healthy; a missing
/// service shows up indirectly when the endpoints it should back stop
/// answering.
fn service_status(service: &Service) -> ResourceStatus {
    let name = object_name(service.metadata.name.as_deref());
    let spec = service.spec.as_ref();
    let type_ = spec
        .and_then(|s| s.type_.clone())
        .unwrap_or_else(|| "ClusterIP".to_string());
    let ports = spec
        .and_then(|s| s.ports.as_ref())
        .map(|ports| {
            ports
                .iter()
                .map(|p| p.port.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();

    let detail = if ports.is_empty() {
        format!("({type_})")
    } else {
        format!("({type_}): ports {ports}")
    };

    ResourceStatus {
        kind: ResourceKind::Service,
        name,
        desired: None,
        ready: None,
        available: None,
        phase: None,
        ready_condition: None,
        healthy: true,
        detail,
        diagnostics: Vec::new(),
    }
}

/// An ingress is healthy iff its load balancer carries at least one
/// externally assigned address.
fn ingress_status(ingress: &Ingress) -> ResourceStatus {
    let name = object_name(ingress.metadata.name.as_deref());
    let address = ingress_address(ingress);
    let healthy = address.is_some();
    let detail = match &address {
        Some(address) => format!("external address {address}"),
        None => "no external address assigned".to_string(),
    };

    ResourceStatus {
        kind: ResourceKind::Ingress,
        name,
        desired: None,
        ready: None,
        available: None,
        phase: None,
        ready_condition: None,
        healthy,
        detail,
        diagnostics: Vec::new(),
    }
}

/// First externally assigned address on the ingress load balancer, IP
/// preferred over hostname.
#[must_use]
pub fn ingress_address(ingress: &Ingress) -> Option<String> {
    ingress
        .status
        .as_ref()?
        .load_balancer
        .as_ref()?
        .ingress
        .as_ref()?
        .iter()
        .find_map(|entry| entry.ip.clone().or_else(|| entry.hostname.clone()))
}

fn format_event(event: &Event) -> String {
    let kind = event.involved_object.kind.as_deref().unwrap_or("Object");
    let name = event.involved_object.name.as_deref().unwrap_or("unknown");
    let reason = event.reason.as_deref().unwrap_or("Unknown");
    let message = event.message.as_deref().unwrap_or("").trim();
    let count = event
        .count
        .filter(|c| *c > 1)
        .map(|c| format!(" x{c}"))
        .unwrap_or_default();
    format!("{kind}/{name}: {reason}{count} - {message}")
}

fn object_name(name: Option<&str>) -> String {
    name.unwrap_or("unknown").to_string()
}
