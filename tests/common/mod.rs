//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{body::Bytes, extract::Request, http::StatusCode, response::IntoResponse, Json, Router};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use edge_gateway::accounts::{AccountsServer, CustomerStore, InMemoryCustomerStore};
use edge_gateway::auth::TokenService;
use edge_gateway::config::GatewayConfig;
use edge_gateway::http::HttpServer;
use edge_gateway::lifecycle::Shutdown;

/// A running server. Dropping it stops the server.
pub struct Running {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

impl Running {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for Running {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

async fn bind() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// Start a backend that answers every request with what it received:
/// `{method, path, query, headers, body}`.
pub async fn start_echo_backend() -> SocketAddr {
    async fn echo(request: Request) -> Json<Value> {
        let (parts, body) = request.into_parts();
        let body: Bytes = axum::body::to_bytes(body, 1024 * 1024).await.unwrap_or_default();
        let headers: BTreeMap<String, String> = parts
            .headers
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), value.to_str().unwrap_or("").to_string()))
            .collect();

        Json(json!({
            "method": parts.method.as_str(),
            "path": parts.uri.path(),
            "query": parts.uri.query(),
            "headers": headers,
            "body": String::from_utf8_lossy(&body),
        }))
    }

    let (listener, addr) = bind().await;
    let app = Router::new().fallback(echo);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Start a backend that accepts connections and never answers.
pub async fn start_silent_backend() -> SocketAddr {
    let (listener, addr) = bind().await;
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}

/// Start a backend that answers every request with 418, an `x-backend` header
/// and the body `teapot`.
pub async fn start_teapot_backend() -> SocketAddr {
    async fn teapot() -> impl IntoResponse {
        (StatusCode::IM_A_TEAPOT, [("x-backend", "yes")], "teapot")
    }

    let (listener, addr) = bind().await;
    let app = Router::new().fallback(teapot);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Start a backend that sends response headers and part of the body, then stalls.
pub async fn start_stalled_body_backend() -> SocketAddr {
    let (listener, addr) = bind().await;
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\npartial")
                .await;
            held.push(socket);
        }
    });
    addr
}

/// An address nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let (listener, addr) = bind().await;
    drop(listener);
    addr
}

pub async fn start_gateway(config: GatewayConfig) -> Running {
    let (listener, addr) = bind().await;
    let server = HttpServer::new(config).unwrap();
    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    tokio::spawn(async move {
        server.run(listener, receiver).await.unwrap();
    });
    Running { addr, shutdown }
}

pub async fn start_accounts(config: &GatewayConfig, tokens: Arc<TokenService>) -> Running {
    let (listener, addr) = bind().await;
    let store: Arc<dyn CustomerStore> = Arc::new(InMemoryCustomerStore::with_demo_accounts());
    let server = AccountsServer::with_tokens(config, tokens, store);
    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    tokio::spawn(async move {
        server.run(listener, receiver).await.unwrap();
    });
    Running { addr, shutdown }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}
