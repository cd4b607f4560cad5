//! Mapping API tests.

use std::fs;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tcp_router::lifecycle::Shutdown;
use tower::ServiceExt;

mod common;

use common::{Fixture, BASE_CONFIG, INITIAL_LIVE_CONFIG};

fn post_mappings(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v0/external_ports")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_map_external_port() {
    let fixture = Fixture::new();
    let (server, updater) = fixture.server();

    let body = json!([{
        "external_port": 2222,
        "backends": [{"ip": "10.1.1.12", "port": 60000}, {"ip": "10.1.1.13", "port": 60000}]
    }]);
    let response = server
        .router()
        .oneshot(post_mappings(body.to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(json_body(response).await, json!({"changed": true}));

    assert_eq!(updater.snapshot().len(), 1);
    let live = fixture.live_content();
    assert!(live.starts_with(BASE_CONFIG));
    assert!(live.contains("listen listen_cfg_2222\n  mode tcp\n  bind :2222\n"));
    assert!(live.contains("  server server_10.1.1.12_60000 10.1.1.12:60000\n"));
    assert!(live.contains("  server server_10.1.1.13_60000 10.1.1.13:60000\n"));
}

#[tokio::test]
async fn test_repeated_mapping_reports_unchanged() {
    let fixture = Fixture::new();
    let (server, _) = fixture.server();
    let body = json!([{"external_port": 80, "backends": [{"ip": "10.0.0.1", "port": 8080}]}]).to_string();

    let first = server.router().oneshot(post_mappings(body.clone())).await.unwrap();
    assert_eq!(json_body(first).await, json!({"changed": true}));

    let second = server.router().oneshot(post_mappings(body)).await.unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(json_body(second).await, json!({"changed": false}));
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let fixture = Fixture::new();
    let (server, _) = fixture.server();

    let response = server
        .router()
        .oneshot(post_mappings("{not json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(fixture.live_content(), INITIAL_LIVE_CONFIG);
}

#[tokio::test]
async fn test_invalid_requests_are_rejected() {
    let fixture = Fixture::new();
    let (server, updater) = fixture.server();

    for body in [
        json!([{"external_port": 0, "backends": [{"ip": "10.0.0.1", "port": 8080}]}]),
        json!([{"external_port": 80, "backends": []}]),
        json!([{"external_port": 80, "backends": [{"ip": "", "port": 8080}]}]),
        json!([{"external_port": 80, "backends": [{"ip": "10.0.0.1", "port": 0}]}]),
        json!([{"external_port": 80, "backends": [{"ip": "10.0.0.1 ", "port": 8080}]}]),
        json!([{"external_port": 80, "backends": [{"ip": "10.0.0.1\n", "port": 8080}]}]),
        json!([{"external_port": 80, "backends": [{"ip": "10.0.0.1#x", "port": 8080}]}]),
    ] {
        let response = server
            .router()
            .oneshot(post_mappings(body.to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {}", body);
        assert!(json_body(response).await["error"].is_string());
    }

    assert!(updater.snapshot().is_empty());
    assert_eq!(fixture.live_content(), INITIAL_LIVE_CONFIG);
}

#[tokio::test]
async fn test_sync_failure_is_server_error() {
    let fixture = Fixture::new();
    let (server, updater) = fixture.server();
    // Base template vanishes after startup: the render step cannot read it.
    fs::remove_file(&fixture.base).unwrap();

    let body = json!([{"external_port": 80, "backends": [{"ip": "10.0.0.1", "port": 8080}]}]);
    let response = server
        .router()
        .oneshot(post_mappings(body.to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(updater.snapshot().is_empty());
    assert_eq!(fixture.live_content(), INITIAL_LIVE_CONFIG);
}

#[tokio::test]
async fn test_list_and_status() {
    let fixture = Fixture::new();
    let (server, _) = fixture.server();

    let body = json!([
        {"external_port": 9000, "backends": [{"ip": "10.0.0.2", "port": 1}]},
        {"external_port": 80, "backends": [{"ip": "10.0.0.9", "port": 2}, {"ip": "10.0.0.1", "port": 2}]}
    ]);
    server.router().oneshot(post_mappings(body.to_string())).await.unwrap();

    let list = server
        .router()
        .oneshot(Request::get("/v0/external_ports").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(list.status(), StatusCode::OK);
    assert_eq!(
        json_body(list).await,
        json!([
            {"external_port": 80, "backends": [{"ip": "10.0.0.1", "port": 2}, {"ip": "10.0.0.9", "port": 2}]},
            {"external_port": 9000, "backends": [{"ip": "10.0.0.2", "port": 1}]}
        ])
    );

    let status = server
        .router()
        .oneshot(Request::get("/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = json_body(status).await;
    assert_eq!(status["status"], "operational");
    assert_eq!(status["external_ports"], 2);
}

#[tokio::test]
async fn test_served_over_tcp_with_graceful_shutdown() {
    let fixture = Fixture::new();
    let (server, _) = fixture.server();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let res = client
        .post(format!("http://{}/v0/external_ports", addr))
        .json(&json!([{"external_port": 3306, "backends": [{"ip": "10.0.0.7", "port": 3306}]}]))
        .send()
        .await
        .expect("router unreachable");
    assert_eq!(res.status(), 200);
    assert!(fixture.live_content().contains("bind :3306\n"));

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server did not stop")
        .unwrap()
        .unwrap();
}
