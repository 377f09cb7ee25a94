// system-tests/tests/http_lifecycle.rs
// ============================================================================
// Suite: HTTP Lifecycle
// Description: Binds a real CrossBridgeService on a loopback port and drives
//              it with a real HTTP client, the only suite here that needs a
//              bound socket rather than in-process crate composition. Gated
//              behind the `live-http` feature so the default `cargo test`
//              run stays fast and free of port binding.
// ============================================================================

use std::time::Duration;

use crossbridge_config::CrossBridgeConfig;
use crossbridge_service::CrossBridgeService;

const TEST_PORT: u16 = 18_923;

async fn wait_for_ready(base_url: &str) {
    let client = reqwest::Client::new();
    for _ in 0..50 {
        if let Ok(response) = client.get(format!("{base_url}/health")).send().await {
            if response.status().is_success() || response.status().as_u16() == 503 {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("service never became reachable on {base_url}");
}

#[tokio::test]
async fn posting_an_event_over_real_http_is_accepted_and_counted() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = CrossBridgeConfig::default();
    config.observer.api.host = "127.0.0.1".to_string();
    config.observer.api.port = TEST_PORT;

    let service = CrossBridgeService::from_config(&config, dir.path()).expect("from_config");
    let serve_handle = tokio::spawn(service.serve(1));

    let base_url = format!("http://127.0.0.1:{TEST_PORT}");
    wait_for_ready(&base_url).await;

    let client = reqwest::Client::new();
    let body = serde_json::json!({
        "event_type": "test_end",
        "framework": "pytest",
        "test_id": "tests/test_http_roundtrip.py::test_x",
        "status": "passed",
    });
    let response = client.post(format!("{base_url}/events")).json(&body).send().await.expect("post /events");
    assert_eq!(response.status().as_u16(), 202);

    let stats_response = client.get(format!("{base_url}/stats")).send().await.expect("get /stats");
    assert!(stats_response.status().is_success());
    let stats: serde_json::Value = stats_response.json().await.expect("decode stats");
    assert!(stats["accepted"].as_u64().unwrap_or(0) >= 1);

    serve_handle.abort();
}

#[tokio::test]
async fn malformed_json_over_real_http_is_rejected_with_400() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = CrossBridgeConfig::default();
    config.observer.api.host = "127.0.0.1".to_string();
    config.observer.api.port = TEST_PORT + 1;

    let service = CrossBridgeService::from_config(&config, dir.path()).expect("from_config");
    let serve_handle = tokio::spawn(service.serve(1));

    let base_url = format!("http://127.0.0.1:{}", TEST_PORT + 1);
    wait_for_ready(&base_url).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{base_url}/events"))
        .header("content-type", "application/json")
        .body("not json")
        .send()
        .await
        .expect("post /events");
    assert_eq!(response.status().as_u16(), 400);

    serve_handle.abort();
}
