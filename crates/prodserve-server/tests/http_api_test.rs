//! HTTP API Integration Tests
//!
//! End-to-end tests for the HTTP surface, run against a real server bound to
//! an ephemeral port.
//!
//! Test Scenarios:
//! 1. Discovery document shape
//! 2. Synchronous invocation (small and large output modes)
//! 3. Asynchronous invocation lifecycle (create, poll, cancel)
//! 4. Error Handling (missing parameters, unknown routes, bad arguments)

use prodserve_common::{TypeSpec, Value, WireType};
use prodserve_server::{Callable, FunctionDescriptor, FunctionHost, HttpServer};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

// ============================================================================
// Test Helpers
// ============================================================================

/// Builds a host with the demo math archive used across these tests.
async fn demo_host() -> Arc<FunctionHost> {
    let host = FunctionHost::new();

    let add_one = FunctionDescriptor::new("addOne")
        .param("x", TypeSpec::Scalar(WireType::Int32))
        .returns(TypeSpec::Scalar(WireType::Int32))
        .help("Adds one to x.");
    let add_one_fn: Callable = Arc::new(|args| match args {
        [Value::Int32(x)] => Ok(vec![Value::Int32(x + 1)]),
        _ => Err("expected one int32".to_string()),
    });
    host.register_function("math", add_one, add_one_fn).await;

    let slow_fail = FunctionDescriptor::new("slowFail")
        .param("ms", TypeSpec::Scalar(WireType::Double))
        .returns(TypeSpec::Scalar(WireType::Double));
    let slow_fail_fn: Callable = Arc::new(|args| match args {
        [Value::Double(ms)] => {
            std::thread::sleep(Duration::from_millis(*ms as u64));
            Err("always fails".to_string())
        }
        _ => Err("expected one double".to_string()),
    });
    host.register_function("math", slow_fail, slow_fail_fn).await;

    Arc::new(host)
}

/// Starts a server on an ephemeral port and returns its address.
async fn start_server(host: Arc<FunctionHost>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(host);
    tokio::spawn(async move {
        let _ = server.serve(listener).await;
    });
    addr
}

/// Polls a collection until the job reaches a terminal state.
async fn poll_until_terminal(
    client: &reqwest::Client,
    addr: SocketAddr,
    collection: &str,
    id: &str,
) -> serde_json::Value {
    for _ in 0..200 {
        let body: serde_json::Value = client
            .get(format!(
                "http://{}/{}?since=0&ids={}",
                addr, collection, id
            ))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let job = &body["data"][0];
        let state = job["state"].as_str().unwrap();
        if state == "READY" || state == "ERROR" || state == "CANCELLED" {
            return job.clone();
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("job {id} never reached a terminal state");
}

/// Extracts the collection id from a job's `up` navigation link.
fn collection_of(job: &serde_json::Value) -> String {
    let up = job["up"].as_str().unwrap();
    up.trim_start_matches("/~")
        .trim_end_matches("/requests")
        .to_string()
}

// ============================================================================
// Discovery
// ============================================================================

#[tokio::test]
async fn test_discovery_document() {
    let addr = start_server(demo_host().await).await;
    let client = reqwest::Client::new();

    let body: serde_json::Value = client
        .get(format!("http://{}/api/discovery", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["discoverySchemaVersion"], json!("1.0.0"));
    let math = &body["archives"]["math"];
    assert_eq!(math["archiveSchemaVersion"], json!("1.0.0"));
    assert!(math["archiveUuid"].as_str().unwrap().starts_with("math_"));

    let signature = &math["functions"]["addOne"]["signatures"][0];
    assert_eq!(signature["help"], json!("Adds one to x."));
    assert_eq!(signature["inputs"][0]["name"], json!("x"));
    assert_eq!(signature["inputs"][0]["mwtype"], json!("int32"));
    assert_eq!(signature["inputs"][0]["mwsize"], json!([1, 1]));
    assert_eq!(signature["outputs"][0]["name"], json!("out1"));
}

// ============================================================================
// Synchronous invocation
// ============================================================================

#[tokio::test]
async fn test_sync_invoke_small_mode() {
    let addr = start_server(demo_host().await).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{}/math/addOne", addr))
        .json(&json!({"rhs": [41]}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, json!({"lhs": [[42]]}));
}

#[tokio::test]
async fn test_sync_invoke_large_mode() {
    let addr = start_server(demo_host().await).await;
    let client = reqwest::Client::new();

    let body: serde_json::Value = client
        .post(format!("http://{}/math/addOne", addr))
        .json(&json!({
            "rhs": [41],
            "outputFormat": {"mode": "large", "nanInfFormat": "string"}
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(
        body["lhs"][0],
        json!({"mwtype": "int32", "mwsize": [1, 1], "mwdata": [42]})
    );
}

#[tokio::test]
async fn test_sync_invoke_unknown_function_is_404() {
    let addr = start_server(demo_host().await).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{}/math/missing", addr))
        .json(&json!({"rhs": []}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("missing"));
}

#[tokio::test]
async fn test_sync_invoke_bad_argument_is_400() {
    let addr = start_server(demo_host().await).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{}/math/addOne", addr))
        .json(&json!({"rhs": [{"bad": true}]}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}

// ============================================================================
// Asynchronous invocation
// ============================================================================

#[tokio::test]
async fn test_async_invoke_lifecycle() {
    let addr = start_server(demo_host().await).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!(
            "http://{}/math/addOne?mode=async&client=cli1",
            addr
        ))
        .json(&json!({"rhs": [41]}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 201);
    let created: serde_json::Value = response.json().await.unwrap();
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["client"], json!("cli1"));
    assert_eq!(
        created["self"],
        json!(format!(
            "/~{}/requests/{}",
            collection_of(&created),
            id
        ))
    );
    let created_seq = created["lastModifiedSeq"].as_u64().unwrap();

    let done = poll_until_terminal(&client, addr, &collection_of(&created), &id).await;
    assert_eq!(done["state"], json!("READY"));
    assert!(done["lastModifiedSeq"].as_u64().unwrap() > created_seq);
}

#[tokio::test]
async fn test_async_invoke_failure_ends_in_error_state() {
    let addr = start_server(demo_host().await).await;
    let client = reqwest::Client::new();

    let created: serde_json::Value = client
        .post(format!("http://{}/math/slowFail?mode=async", addr))
        .json(&json!({"rhs": [1]}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let id = created["id"].as_str().unwrap().to_string();
    let done = poll_until_terminal(&client, addr, &collection_of(&created), &id).await;
    assert_eq!(done["state"], json!("ERROR"));
}

#[tokio::test]
async fn test_poll_by_client_filter() {
    let addr = start_server(demo_host().await).await;
    let client = reqwest::Client::new();

    let created: serde_json::Value = client
        .post(format!(
            "http://{}/math/addOne?mode=async&client=poller",
            addr
        ))
        .json(&json!({"rhs": [1]}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let body: serde_json::Value = client
        .get(format!(
            "http://{}/{}?since=0&clients=poller,other",
            addr,
            collection_of(&created)
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert!(body["createdSeq"].as_u64().is_some());
    assert_eq!(body["data"][0]["id"], created["id"]);
}

#[tokio::test]
async fn test_cancel_flow() {
    let addr = start_server(demo_host().await).await;
    let client = reqwest::Client::new();

    let created: serde_json::Value = client
        .post(format!("http://{}/math/slowFail?mode=async", addr))
        .json(&json!({"rhs": [200]}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let self_link = created["self"].as_str().unwrap();
    let response = client
        .post(format!("http://{}{}/cancel", addr, self_link))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let cancelled: serde_json::Value = response.json().await.unwrap();
    assert_eq!(cancelled["state"], json!("CANCELLED"));
    assert!(
        cancelled["lastModifiedSeq"].as_u64().unwrap()
            > created["lastModifiedSeq"].as_u64().unwrap()
    );
}

#[tokio::test]
async fn test_cancel_unknown_job_is_404() {
    let addr = start_server(demo_host().await).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{}/~coll/requests/nope/cancel", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
}

// ============================================================================
// Error Handling
// ============================================================================

#[tokio::test]
async fn test_poll_missing_since_is_400() {
    let addr = start_server(demo_host().await).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("http://{}/somecoll?ids=a", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("since"));
}

#[tokio::test]
async fn test_poll_missing_filters_is_400() {
    let addr = start_server(demo_host().await).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("http://{}/somecoll?since=0", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_poll_unknown_collection_is_404() {
    let addr = start_server(demo_host().await).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("http://{}/somecoll?since=0&ids=a", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let addr = start_server(demo_host().await).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("http://{}/a/b/c/d", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
}
