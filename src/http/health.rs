//! Gateway health endpoint.

use std::collections::BTreeMap;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::http::server::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub service: String,
    pub version: String,
    /// Route name → backend base address.
    pub services: BTreeMap<String, String>,
}

pub async fn get_health(State(state): State<AppState>) -> Json<HealthReport> {
    let services = state
        .routes
        .routes()
        .iter()
        .map(|r| (r.name().to_string(), r.target().to_string()))
        .collect();

    Json(HealthReport {
        status: "UP".to_string(),
        service: "API Gateway".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        services,
    })
}
