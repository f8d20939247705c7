//! Read-only access to the cluster control plane.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Event, Pod, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::ListParams;
use kube::{Api, Client};
use thiserror::Error;
use tracing::debug;

/// Errors surfaced by control-plane queries.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// The API server cannot be reached at all. This is the one fatal
    /// error: a run aborts when connectivity fails.
    #[error("cluster unreachable: {0}")]
    Unreachable(String),

    /// A single resource-kind query failed. Non-fatal: the category is
    /// reported as failed and the run continues.
    #[error("{kind} query failed: {message}")]
    Query { kind: &'static str, message: String },
}

/// Read-only queries against one namespace of a cluster.
///
/// The production implementation ([`KubeClusterClient`]) talks to a live
/// API server; [`StaticClusterClient`] serves canned lists for tests.
/// Nothing behind this interface ever mutates cluster state.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Verify the API server answers at all. Returns the server version.
    async fn check_connectivity(&self) -> Result<String, ClusterError>;

    async fn list_deployments(&self) -> Result<Vec<Deployment>, ClusterError>;

    async fn list_pods(&self) -> Result<Vec<Pod>, ClusterError>;

    async fn list_services(&self) -> Result<Vec<Service>, ClusterError>;

    async fn list_ingresses(&self) -> Result<Vec<Ingress>, ClusterError>;

    /// Warning-severity events in the namespace, unfiltered free text.
    async fn list_warning_events(&self) -> Result<Vec<Event>, ClusterError>;
}

/// `ClusterClient` backed by the ambient kubeconfig.
pub struct KubeClusterClient {
    client: Client,
    namespace: String,
}

impl KubeClusterClient {
    /// Build a client from the environment (`KUBECONFIG`, in-cluster
    /// config, or the default context). `namespace` falls back to the
    /// context default when not given.
    pub async fn try_default(namespace: Option<String>) -> Result<Self, ClusterError> {
        let client = Client::try_default()
            .await
            .map_err(|e| ClusterError::Unreachable(e.to_string()))?;
        let namespace = namespace.unwrap_or_else(|| client.default_namespace().to_string());
        debug!(namespace = %namespace, "cluster client ready");
        Ok(Self { client, namespace })
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn check_connectivity(&self) -> Result<String, ClusterError> {
        let info = self
            .client
            .apiserver_version()
            .await
            .map_err(|e| ClusterError::Unreachable(e.to_string()))?;
        Ok(format!("v{}.{}", info.major, info.minor))
    }

    async fn list_deployments(&self) -> Result<Vec<Deployment>, ClusterError> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), &self.namespace);
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|e| query_error("deployments", &e))?;
        Ok(list.items)
    }

    async fn list_pods(&self) -> Result<Vec<Pod>, ClusterError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), &self.namespace);
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|e| query_error("pods", &e))?;
        Ok(list.items)
    }

    async fn list_services(&self) -> Result<Vec<Service>, ClusterError> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), &self.namespace);
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|e| query_error("services", &e))?;
        Ok(list.items)
    }

    async fn list_ingresses(&self) -> Result<Vec<Ingress>, ClusterError> {
        let api: Api<Ingress> = Api::namespaced(self.client.clone(), &self.namespace);
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|e| query_error("ingress", &e))?;
        Ok(list.items)
    }

    async fn list_warning_events(&self) -> Result<Vec<Event>, ClusterError> {
        let api: Api<Event> = Api::namespaced(self.client.clone(), &self.namespace);
        let params = ListParams::default().fields("type=Warning");
        let list = api
            .list(&params)
            .await
            .map_err(|e| query_error("events", &e))?;
        Ok(list.items)
    }
}

fn query_error(kind: &'static str, err: &kube::Error) -> ClusterError {
    ClusterError::Query {
        kind,
        message: err.to_string(),
    }
}

/// One canned query result: either items or an injected failure.
enum CannedQuery<T> {
    Items(Vec<T>),
    Fail(String),
}

impl<T> Default for CannedQuery<T> {
    fn default() -> Self {
        Self::Items(Vec::new())
    }
}

impl<T: Clone> CannedQuery<T> {
    fn resolve(&self, kind: &'static str) -> Result<Vec<T>, ClusterError> {
        match self {
            Self::Items(items) => Ok(items.clone()),
            Self::Fail(message) => Err(ClusterError::Query {
                kind,
                message: message.clone(),
            }),
        }
    }
}

/// In-memory `ClusterClient` serving fixed resource lists.
///
/// Used by the test suites to exercise collection and verdict folding
/// without a live cluster. Individual categories can be failed to model a
/// partially broken control plane, and `query_count` exposes how many
/// resource queries were issued (connectivity aside), which lets tests
/// assert that an aborted run queried nothing.
pub struct StaticClusterClient {
    unreachable: Option<String>,
    server_version: String,
    deployments: CannedQuery<Deployment>,
    pods: CannedQuery<Pod>,
    services: CannedQuery<Service>,
    ingresses: CannedQuery<Ingress>,
    events: CannedQuery<Event>,
    queries: AtomicUsize,
}

impl Default for StaticClusterClient {
    fn default() -> Self {
        Self {
            unreachable: None,
            server_version: "v1.31".to_string(),
            deployments: CannedQuery::default(),
            pods: CannedQuery::default(),
            services: CannedQuery::default(),
            ingresses: CannedQuery::default(),
            events: CannedQuery::default(),
            queries: AtomicUsize::new(0),
        }
    }
}

impl StaticClusterClient {
    /// A client whose connectivity probe fails with `message`.
    #[must_use]
    pub fn unreachable(message: &str) -> Self {
        Self {
            unreachable: Some(message.to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_deployments(mut self, items: Vec<Deployment>) -> Self {
        self.deployments = CannedQuery::Items(items);
        self
    }

    #[must_use]
    pub fn with_pods(mut self, items: Vec<Pod>) -> Self {
        self.pods = CannedQuery::Items(items);
        self
    }

    #[must_use]
    pub fn with_services(mut self, items: Vec<Service>) -> Self {
        self.services = CannedQuery::Items(items);
        self
    }

    #[must_use]
    pub fn with_ingresses(mut self, items: Vec<Ingress>) -> Self {
        self.ingresses = CannedQuery::Items(items);
        self
    }

    #[must_use]
    pub fn with_events(mut self, items: Vec<Event>) -> Self {
        self.events = CannedQuery::Items(items);
        self
    }

    #[must_use]
    pub fn with_failed_deployments(mut self, message: &str) -> Self {
        self.deployments = CannedQuery::Fail(message.to_string());
        self
    }

    #[must_use]
    pub fn with_failed_pods(mut self, message: &str) -> Self {
        self.pods = CannedQuery::Fail(message.to_string());
        self
    }

    #[must_use]
    pub fn with_failed_services(mut self, message: &str) -> Self {
        self.services = CannedQuery::Fail(message.to_string());
        self
    }

    #[must_use]
    pub fn with_failed_ingresses(mut self, message: &str) -> Self {
        self.ingresses = CannedQuery::Fail(message.to_string());
        self
    }

    #[must_use]
    pub fn with_failed_events(mut self, message: &str) -> Self {
        self.events = CannedQuery::Fail(message.to_string());
        self
    }

    /// Number of resource queries issued so far (connectivity excluded).
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn record_query(&self) {
        self.queries.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ClusterClient for StaticClusterClient {
    async fn check_connectivity(&self) -> Result<String, ClusterError> {
        match &self.unreachable {
            Some(message) => Err(ClusterError::Unreachable(message.clone())),
            None => Ok(self.server_version.clone()),
        }
    }

    async fn list_deployments(&self) -> Result<Vec<Deployment>, ClusterError> {
        self.record_query();
        self.deployments.resolve("deployments")
    }

    async fn list_pods(&self) -> Result<Vec<Pod>, ClusterError> {
        self.record_query();
        self.pods.resolve("pods")
    }

    async fn list_services(&self) -> Result<Vec<Service>, ClusterError> {
        self.record_query();
        self.services.resolve("services")
    }

    async fn list_ingresses(&self) -> Result<Vec<Ingress>, ClusterError> {
        self.record_query();
        self.ingresses.resolve("ingress")
    }

    async fn list_warning_events(&self) -> Result<Vec<Event>, ClusterError> {
        self.record_query();
        self.events.resolve("events")
    }
}
