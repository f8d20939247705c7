//! Integration tests for the HTTP components.
//!
//! These run the prober, load tester, and content validator against a
//! local mock of the deployed MFE: a host page at the root and the
//! console module under `/console/`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;

use checkup::content::ContentValidator;
use checkup::loadtest::{LoadTester, DEFAULT_SAMPLE_SIZE};
use checkup::probe::{Prober, STATUS_UNREACHABLE};

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

const HOST_PAGE: &str =
    "<!doctype html><html><head><title>Vite + React</title></head><body><div id=\"root\"></div></body></html>";

// =============================================================================
// Mock MFE Server
// =============================================================================

/// Shared state for the mock server.
#[derive(Default)]
struct MockState {
    /// Requests seen by the flaky routes.
    flaky_hits: AtomicUsize,
}

async fn host_page() -> impl IntoResponse {
    axum::response::Html(HOST_PAGE)
}

async fn plain_page() -> impl IntoResponse {
    "maintenance page"
}

async fn teapot() -> impl IntoResponse {
    (StatusCode::IM_A_TEAPOT, "short and stout")
}

/// Fails exactly one request out of every five.
async fn fail_one_in_five(State(state): State<Arc<MockState>>) -> impl IntoResponse {
    let n = state.flaky_hits.fetch_add(1, Ordering::SeqCst);
    if n % 5 == 0 {
        (StatusCode::INTERNAL_SERVER_ERROR, "overloaded")
    } else {
        (StatusCode::OK, "ok")
    }
}

/// Fails exactly two requests out of every five.
async fn fail_two_in_five(State(state): State<Arc<MockState>>) -> impl IntoResponse {
    let n = state.flaky_hits.fetch_add(1, Ordering::SeqCst);
    if n % 5 < 2 {
        (StatusCode::INTERNAL_SERVER_ERROR, "overloaded")
    } else {
        (StatusCode::OK, "ok")
    }
}

/// Start the mock MFE on a random port.
async fn start_mock_mfe() -> (SocketAddr, Arc<MockState>) {
    let state = Arc::new(MockState::default());

    let app = Router::new()
        .route("/", get(host_page))
        .route("/console/", get(host_page))
        .route("/plain", get(plain_page))
        .route("/teapot", get(teapot))
        .route("/flaky-light", get(fail_one_in_five))
        .route("/flaky-heavy", get(fail_two_in_five))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Wait for server to be ready
    tokio::time::sleep(Duration::from_millis(100)).await;

    (addr, state)
}

fn prober() -> Prober {
    Prober::new(reqwest::Client::new())
}

// =============================================================================
// Prober
// =============================================================================

#[tokio::test]
async fn test_probe_reports_matching_status_as_success() {
    let (addr, _state) = start_mock_mfe().await;
    let result = prober()
        .probe(&format!("http://{addr}/"), "Host App", 200, PROBE_TIMEOUT)
        .await;

    assert!(result.success);
    assert_eq!(result.actual_status, 200);
    assert!(result.snippet.contains("Vite + React"));
    assert!(result.body_bytes > 0);
}

#[tokio::test]
async fn test_probe_reports_status_mismatch_as_failure() {
    let (addr, _state) = start_mock_mfe().await;
    let result = prober()
        .probe(&format!("http://{addr}/teapot"), "Teapot", 200, PROBE_TIMEOUT)
        .await;

    assert!(!result.success);
    assert_eq!(result.actual_status, 418);
    assert!(result.responded());
}

#[tokio::test]
async fn test_probe_maps_connection_failure_to_sentinel() {
    // Nothing listens on the discard port, so the connection is refused.
    let result = prober()
        .probe(
            "http://127.0.0.1:9/",
            "Host App",
            200,
            Duration::from_secs(2),
        )
        .await;

    assert!(!result.success);
    assert!(!result.responded());
    assert_eq!(result.actual_status, STATUS_UNREACHABLE);
    assert!(result.snippet.is_empty());
}

// =============================================================================
// Load Tester
// =============================================================================

#[tokio::test]
async fn test_load_test_full_batch_passes() {
    let (addr, state) = start_mock_mfe().await;
    let tester = LoadTester::new(prober());
    let result = tester
        .run(&format!("http://{addr}/"), "Host App", DEFAULT_SAMPLE_SIZE)
        .await;

    assert!(result.passed);
    assert_eq!(result.success_count, 5);
    assert_eq!(result.success_rate, 100);
    // The flaky counter was never touched.
    assert_eq!(state.flaky_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_load_test_at_threshold_passes() {
    let (addr, state) = start_mock_mfe().await;
    let tester = LoadTester::new(prober());
    // One failure out of five lands exactly on the 80% boundary.
    let result = tester
        .run(&format!("http://{addr}/flaky-light"), "Host App", DEFAULT_SAMPLE_SIZE)
        .await;

    assert_eq!(result.success_count, 4);
    assert_eq!(result.success_rate, 80);
    assert!(result.passed);
    // Every sample settled and reached the server.
    assert_eq!(state.flaky_hits.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn test_load_test_below_threshold_fails() {
    let (addr, _state) = start_mock_mfe().await;
    let tester = LoadTester::new(prober());
    let result = tester
        .run(&format!("http://{addr}/flaky-heavy"), "Host App", DEFAULT_SAMPLE_SIZE)
        .await;

    assert_eq!(result.success_count, 3);
    assert_eq!(result.success_rate, 60);
    assert!(!result.passed);
}

#[tokio::test]
async fn test_load_test_against_dead_endpoint_counts_every_sample() {
    let tester = LoadTester::new(prober());
    let result = tester.run("http://127.0.0.1:9/", "Host App", 3).await;

    assert_eq!(result.sample_size, 3);
    assert_eq!(result.success_count, 0);
    assert_eq!(result.success_rate, 0);
    assert!(!result.passed);
}

// =============================================================================
// Content Validator
// =============================================================================

#[tokio::test]
async fn test_content_marker_found() {
    let (addr, _state) = start_mock_mfe().await;
    let validator = ContentValidator::new(reqwest::Client::new());
    assert!(validator.check(&format!("http://{addr}/"), "Vite + React").await);
}

#[tokio::test]
async fn test_content_marker_missing() {
    let (addr, _state) = start_mock_mfe().await;
    let validator = ContentValidator::new(reqwest::Client::new());
    assert!(!validator.check(&format!("http://{addr}/plain"), "Vite + React").await);
}

#[tokio::test]
async fn test_content_fetch_error_reads_as_absent() {
    let validator = ContentValidator::new(reqwest::Client::new());
    assert!(!validator.check("http://127.0.0.1:9/", "Vite + React").await);
}
