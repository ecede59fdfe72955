//! End-to-end tests for route resolution, forwarding and the key gate.

use std::net::SocketAddr;

use reqwest::StatusCode;
use serde_json::Value;

use edge_gateway::config::{GatewayConfig, RouteConfig};

mod common;

fn gateway_config(routes: Vec<RouteConfig>) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.routes = routes;
    config
}

fn target(addr: SocketAddr) -> String {
    format!("http://{addr}")
}

#[tokio::test]
async fn test_forwards_full_path_method_and_headers() {
    let backend = common::start_echo_backend().await;
    let gateway = common::start_gateway(gateway_config(vec![RouteConfig::new(
        "catalog",
        "/api/products",
        &target(backend),
    )]))
    .await;

    let res = common::client()
        .get(gateway.url("/api/products/42?expand=stock"))
        .header("X-Trace-Tag", "abc")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get("x-request-id").is_some());

    let echoed: Value = res.json().await.unwrap();
    assert_eq!(echoed["method"], "GET");
    assert_eq!(echoed["path"], "/api/products/42");
    assert_eq!(echoed["query"], "expand=stock");
    assert_eq!(echoed["headers"]["x-trace-tag"], "abc");
    assert!(echoed["headers"]["x-request-id"].is_string());
}

#[tokio::test]
async fn test_body_is_forwarded_for_mutations_on_unprotected_routes() {
    let backend = common::start_echo_backend().await;
    let gateway = common::start_gateway(gateway_config(vec![RouteConfig::new(
        "orders",
        "/api/orders",
        &target(backend),
    )]))
    .await;

    let res = common::client()
        .post(gateway.url("/api/orders"))
        .body(r#"{"item":7}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let echoed: Value = res.json().await.unwrap();
    assert_eq!(echoed["method"], "POST");
    assert_eq!(echoed["path"], "/api/orders");
    assert_eq!(echoed["body"], r#"{"item":7}"#);
}

#[tokio::test]
async fn test_first_declared_route_wins() {
    let products = common::start_echo_backend().await;
    let fallback = common::start_echo_backend().await;
    let gateway = common::start_gateway(gateway_config(vec![
        RouteConfig::new("catalog", "/api/products", &format!("http://{products}/catalog")),
        RouteConfig::new("api", "/api", &target(fallback)),
    ]))
    .await;
    let client = common::client();

    let echoed: Value = client
        .get(gateway.url("/api/products/1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(echoed["path"], "/catalog/api/products/1");

    let echoed: Value = client
        .get(gateway.url("/api/orders/1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(echoed["path"], "/api/orders/1");
}

#[tokio::test]
async fn test_strip_prefix_forwards_remainder() {
    let backend = common::start_echo_backend().await;
    let mut route = RouteConfig::new("customers", "/api/customers", &target(backend));
    route.strip_prefix = true;
    let gateway = common::start_gateway(gateway_config(vec![route])).await;

    let echoed: Value = common::client()
        .get(gateway.url("/api/customers/3"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(echoed["path"], "/3");
}

#[tokio::test]
async fn test_unmatched_paths_are_404() {
    let backend = common::start_echo_backend().await;
    let gateway = common::start_gateway(gateway_config(vec![RouteConfig::new(
        "catalog",
        "/api/products",
        &target(backend),
    )]))
    .await;
    let client = common::client();

    for path in ["/api/orders/1", "/api/productsX", "/"] {
        let res = client.get(gateway.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "path {path}");
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["code"], "ROUTE_NOT_FOUND");
    }
}

#[tokio::test]
async fn test_unreachable_backend_is_502() {
    let dead = common::unused_addr().await;
    let gateway = common::start_gateway(gateway_config(vec![RouteConfig::new(
        "orders",
        "/api/orders",
        &target(dead),
    )]))
    .await;

    let res = common::client().get(gateway.url("/api/orders/1")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "BACKEND_UNAVAILABLE");
}

#[tokio::test]
async fn test_silent_backend_is_504() {
    let silent = common::start_silent_backend().await;
    let mut config = gateway_config(vec![RouteConfig::new("orders", "/api/orders", &target(silent))]);
    config.timeouts.upstream_secs = 1;
    let gateway = common::start_gateway(config).await;

    let res = common::client().get(gateway.url("/api/orders/1")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn test_backend_status_headers_and_body_relayed() {
    let backend = common::start_teapot_backend().await;
    let gateway = common::start_gateway(gateway_config(vec![RouteConfig::new(
        "orders",
        "/api/orders",
        &target(backend),
    )]))
    .await;

    let res = common::client().get(gateway.url("/api/orders/1")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(res.headers()["x-backend"], "yes");
    assert_eq!(res.text().await.unwrap(), "teapot");
}

#[tokio::test]
async fn test_stalled_response_body_is_cut_off() {
    let backend = common::start_stalled_body_backend().await;
    let mut config = gateway_config(vec![RouteConfig::new("orders", "/api/orders", &target(backend))]);
    config.timeouts.upstream_secs = 1;
    config.timeouts.request_secs = 5;
    let gateway = common::start_gateway(config).await;

    let res = common::client().get(gateway.url("/api/orders/1")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.bytes().await.is_err());
}

#[tokio::test]
async fn test_key_gate_on_protected_prefix() {
    let backend = common::start_echo_backend().await;
    let gateway = common::start_gateway(gateway_config(vec![RouteConfig::new(
        "catalog",
        "/api/products",
        &target(backend),
    )]))
    .await;
    let client = common::client();

    // Reads pass without a key.
    let res = client.get(gateway.url("/api/products")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.post(gateway.url("/api/products")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "API_KEY_MISSING");
    assert_eq!(body["requiredHeader"], "X-API-KEY");
    assert!(body["timestamp"].is_string());

    let res = client
        .put(gateway.url("/api/products/42"))
        .header("X-API-KEY", "wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "API_KEY_INVALID");

    let res = client
        .delete(gateway.url("/api/products/42"))
        .header("X-API-KEY", "demo-secret-key")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let echoed: Value = res.json().await.unwrap();
    assert_eq!(echoed["method"], "DELETE");
    assert_eq!(echoed["headers"]["x-api-key"], "demo-secret-key");
}

#[tokio::test]
async fn test_key_gate_disabled() {
    let backend = common::start_echo_backend().await;
    let mut config = gateway_config(vec![RouteConfig::new("catalog", "/api/products", &target(backend))]);
    config.api_key.enabled = false;
    let gateway = common::start_gateway(config).await;

    let res = common::client().post(gateway.url("/api/products")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_health_is_served_locally() {
    let backend = common::start_echo_backend().await;
    let gateway = common::start_gateway(gateway_config(vec![RouteConfig::new(
        "catalog",
        "/api/products",
        &target(backend),
    )]))
    .await;

    let res = common::client().get(gateway.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "UP");
    assert!(body["services"]["catalog"].is_string());
}
