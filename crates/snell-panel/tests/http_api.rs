//! # HTTP API Tests
//!
//! Drive the full router (auth, CORS, tracing, body limit) against an
//! in-memory SQLite store and a static geo locator.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use snell_panel::adapters::{SequentialNodeIds, SqliteEntryStore, StaticLocator};
use snell_panel::{build_router, GeoInfo, HttpSettings, PanelService};

const TOKEN: &str = "test-token";

fn geo(country: &str, isp: &str, asn: u32) -> GeoInfo {
    GeoInfo {
        country_code: country.into(),
        isp: isp.into(),
        asn,
        ..Default::default()
    }
}

fn app() -> Router {
    let store = SqliteEntryStore::open_in_memory().unwrap();
    let locator = StaticLocator::new()
        .with_answer("1.1.1.1", geo("AU", "Cloudflare", 13335))
        .with_answer("8.8.8.8", geo("US", "Google", 15169))
        .with_answer("jp.example.com", geo("JP", "IIJ", 2497));
    let service = PanelService::new(
        Arc::new(store),
        Arc::new(locator),
        Arc::new(SequentialNodeIds::new()),
    );
    let settings = HttpSettings {
        api_token: TOKEN.to_string(),
        body_limit: 1024,
        ..HttpSettings::default()
    };
    build_router(Arc::new(service), settings)
}

fn authed(path: &str) -> String {
    let sep = if path.contains('?') { '&' } else { '?' };
    format!("{path}{sep}token={TOKEN}")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn with_json(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn send_json(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, req).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn create(app: &Router, body: Value) -> Value {
    let (status, json) = send_json(app, with_json(Method::POST, &authed("/entry"), body)).await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {json}");
    json["data"].clone()
}

#[tokio::test]
async fn test_welcome_is_public() {
    let app = app();
    let (status, json) = send_json(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "success");
    assert!(json["message"]
        .as_str()
        .unwrap()
        .starts_with("Welcome to Snell Panel"));
}

#[tokio::test]
async fn test_health_is_public() {
    let app = app();
    let (status, json) = send_json(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = app();
    let requests = vec![
        get("/entries"),
        get("/subscribe?token=wrong"),
        delete("/entry/1.1.1.1"),
        delete("/entry/node/node-1"),
        with_json(Method::POST, "/entry", json!({"ip": "1.1.1.1", "port": 443, "psk": "k"})),
        with_json(Method::PUT, "/modify/node-1", json!({"node_name": "x"})),
    ];

    for req in requests {
        let (status, json) = send_json(&app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json, json!({"status": "error", "message": "Unauthorized"}));
    }
}

#[tokio::test]
async fn test_rejected_insert_stores_nothing() {
    let app = app();
    let req = with_json(
        Method::POST,
        "/entry?token=nope",
        json!({"ip": "1.1.1.1", "port": 443, "psk": "k"}),
    );
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, json) = send_json(&app, get(&authed("/entries"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["status"], "warning");
}

#[tokio::test]
async fn test_insert_returns_created_entry() {
    let app = app();
    let entry = create(
        &app,
        json!({"ip": "jp.example.com", "port": 8443, "psk": "secret", "node_name": "Tokyo"}),
    )
    .await;

    assert_eq!(entry["id"], 1);
    assert_eq!(entry["ip"], "jp.example.com");
    assert_eq!(entry["port"], 8443);
    assert_eq!(entry["country_code"], "JP");
    assert_eq!(entry["isp"], "IIJ");
    assert_eq!(entry["asn"], 2497);
    assert_eq!(entry["node_id"], "node-1");
    assert_eq!(entry["node_name"], "Tokyo");
    assert_eq!(entry["version"], 4);
}

#[tokio::test]
async fn test_insert_validation_errors() {
    let app = app();

    let (status, json) = send_json(
        &app,
        with_json(Method::POST, &authed("/entry"), json!({"ip": "", "port": 443, "psk": "k"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], "error");

    let (status, _) = send(
        &app,
        with_json(Method::POST, &authed("/entry"), json!({"ip": "1.1.1.1", "psk": "k"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let malformed = Request::builder()
        .method(Method::POST)
        .uri(authed("/entry"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, json) = send_json(&app, malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], "error");
}

#[tokio::test]
async fn test_insert_geo_failure_is_bad_gateway() {
    let app = app();
    let (status, json) = send_json(
        &app,
        with_json(
            Method::POST,
            &authed("/entry"),
            json!({"ip": "unknown.example.net", "port": 443, "psk": "k"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(json["message"]
        .as_str()
        .unwrap()
        .starts_with("Failed to get IP info"));

    let (status, _) = send(&app, get(&authed("/entries"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_entries() {
    let app = app();

    let (status, json) = send_json(&app, get(&authed("/entries"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json, json!({"status": "warning", "message": "No entries found"}));

    create(&app, json!({"ip": "1.1.1.1", "port": 443, "psk": "a"})).await;
    create(&app, json!({"ip": "8.8.8.8", "port": 444, "psk": "b"})).await;

    let (status, json) = send_json(&app, get(&authed("/entries"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Entries retrieved successfully");
    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["ip"], "1.1.1.1");
    assert_eq!(data[1]["ip"], "8.8.8.8");
}

#[tokio::test]
async fn test_subscribe_renders_text() {
    let app = app();

    let (status, json) = send_json(&app, get(&authed("/subscribe"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["message"], "No entries found for subscription");

    create(
        &app,
        json!({"ip": "jp.example.com", "port": 443, "psk": "secret", "node_name": "Tokyo"}),
    )
    .await;
    create(&app, json!({"ip": "1.1.1.1", "port": 8443, "psk": "k2", "version": 3})).await;

    let response = app.clone().oneshot(get(&authed("/subscribe"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/plain"));

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert_eq!(
        text,
        "🇯🇵 Tokyo = snell, jp.example.com, 443, psk = secret, version = 4\n\
         🇦🇺 AU AS13335 Cloudflare node-2 = snell, 1.1.1.1, 8443, psk = k2, version = 3"
    );
}

#[tokio::test]
async fn test_modify_node() {
    let app = app();
    let entry = create(&app, json!({"ip": "1.1.1.1", "port": 443, "psk": "k"})).await;
    let node_id = entry["node_id"].as_str().unwrap().to_string();

    let (status, json) = send_json(
        &app,
        with_json(Method::PUT, &authed(&format!("/modify/{node_id}")), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "No fields to update");

    let (status, json) = send_json(
        &app,
        with_json(Method::PUT, &authed("/modify/missing"), json!({"node_name": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["message"], "Node ID not found");

    let (status, json) = send_json(
        &app,
        with_json(
            Method::PUT,
            &authed(&format!("/modify/{node_id}")),
            json!({"node_name": "Sydney", "ip": "8.8.8.8"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Node updated successfully");

    let (_, json) = send_json(&app, get(&authed("/entries"))).await;
    let stored = &json["data"][0];
    assert_eq!(stored["node_name"], "Sydney");
    assert_eq!(stored["ip"], "8.8.8.8");
    assert_eq!(stored["country_code"], "US");
    assert_eq!(stored["asn"], 15169);
    assert_eq!(stored["node_id"], node_id.as_str());
    assert_eq!(stored["psk"], "k");
}

#[tokio::test]
async fn test_modify_with_unresolvable_ip_leaves_entry() {
    let app = app();
    let entry = create(&app, json!({"ip": "1.1.1.1", "port": 443, "psk": "k"})).await;
    let node_id = entry["node_id"].as_str().unwrap();

    let (status, _) = send(
        &app,
        with_json(
            Method::PUT,
            &authed(&format!("/modify/{node_id}")),
            json!({"ip": "nowhere.invalid"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (_, json) = send_json(&app, get(&authed("/entries"))).await;
    assert_eq!(json["data"][0]["ip"], "1.1.1.1");
    assert_eq!(json["data"][0]["country_code"], "AU");
}

#[tokio::test]
async fn test_delete_by_ip() {
    let app = app();
    create(&app, json!({"ip": "1.1.1.1", "port": 443, "psk": "a"})).await;
    create(&app, json!({"ip": "1.1.1.1", "port": 444, "psk": "b"})).await;
    create(&app, json!({"ip": "8.8.8.8", "port": 443, "psk": "c"})).await;

    let (status, json) = send_json(&app, delete(&authed("/entry/1.1.1.1"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Entry deleted successfully");
    assert_eq!(json["data"]["deleted"], 2);

    let (status, json) = send_json(&app, delete(&authed("/entry/1.1.1.1"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["message"], "Entry not found");

    let (_, json) = send_json(&app, get(&authed("/entries"))).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_by_node_id() {
    let app = app();
    create(&app, json!({"ip": "1.1.1.1", "port": 443, "psk": "a"})).await;
    create(&app, json!({"ip": "1.1.1.1", "port": 444, "psk": "b"})).await;

    let (status, _) = send(&app, delete(&authed("/entry/node/node-1"))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send_json(&app, delete(&authed("/entry/node/node-1"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["status"], "error");

    let (_, json) = send_json(&app, get(&authed("/entries"))).await;
    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["node_id"], "node-2");
}

#[tokio::test]
async fn test_unknown_path() {
    let app = app();
    let (status, json) = send_json(&app, get("/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json, json!({"status": "error", "message": "Path not found"}));
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let app = app();
    let psk = "x".repeat(4096);
    let body = json!({"ip": "1.1.1.1", "port": 443, "psk": psk}).to_string();
    let req = Request::builder()
        .method(Method::POST)
        .uri(authed("/entry"))
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap();

    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = app();
    let req = Request::builder()
        .method(Method::OPTIONS)
        .uri("/entries")
        .header(header::ORIGIN, "https://dashboard.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "DELETE")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[tokio::test]
async fn test_wrong_method_on_known_path() {
    let app = app();
    let requests = vec![
        get(&authed("/modify/node-1")),
        get("/entry"),
        get(&authed("/entry")),
        delete("/entries"),
        with_json(Method::POST, "/", json!({})),
        delete("/health"),
    ];

    for req in requests {
        let uri = req.uri().to_string();
        let (status, json) = send_json(&app, req).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(json, json!({"status": "error", "message": "Path not found"}));
    }
}

#[tokio::test]
async fn test_version_out_of_range_is_rejected() {
    let app = app();
    let (status, json) = send_json(
        &app,
        with_json(
            Method::POST,
            &authed("/entry"),
            json!({"ip": "1.1.1.1", "port": 443, "psk": "k", "version": 9}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "version must be between 1 and 5");

    let entry = create(&app, json!({"ip": "1.1.1.1", "port": 443, "psk": "k"})).await;
    let node_id = entry["node_id"].as_str().unwrap();
    let (status, _) = send(
        &app,
        with_json(
            Method::PUT,
            &authed(&format!("/modify/{node_id}")),
            json!({"version": 0}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_line_breaks_cannot_add_subscription_lines() {
    let app = app();
    let (status, json) = send_json(
        &app,
        with_json(
            Method::POST,
            &authed("/entry"),
            json!({"ip": "1.1.1.1", "port": 443, "psk": "k\nEvil = snell, 6.6.6.6, 1, psk = x"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "psk must not contain control characters");

    create(&app, json!({"ip": "1.1.1.1", "port": 443, "psk": "k"})).await;
    let (status, _) = send(
        &app,
        with_json(
            Method::PUT,
            &authed("/modify/node-1"),
            json!({"node_name": "Sydney\nEvil = snell, 6.6.6.6, 1, psk = x"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(&app, get(&authed("/subscribe"))).await;
    assert_eq!(String::from_utf8(body).unwrap().lines().count(), 1);
}
