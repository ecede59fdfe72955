//! Accounts service HTTP surface.
//!
//! # Routes (under `/api/customers`)
//! ```text
//! POST /login     credentials → token
//! POST /register  account → token
//! POST /validate  {token, subject} → {valid, subject}
//! GET  /          all accounts
//! GET  /{id}      one account
//! POST /{id}      update, requires a bearer token owned by the payload subject
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{OriginalUri, Path, State},
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::accounts::store::{Account, AccountPayload, CustomerStore, InMemoryCustomerStore, StoreError};
use crate::auth::{authorization_header, OwnershipMode, ResourceOwnerGuard, TokenService};
use crate::config::GatewayConfig;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::lifecycle::signals::shutdown_requested;

/// Shared handler state.
#[derive(Clone)]
pub struct AccountsState {
    pub tokens: Arc<TokenService>,
    pub guard: Arc<ResourceOwnerGuard>,
    pub store: Arc<dyn CustomerStore>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    pub subject_id: u64,
    pub subject: String,
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default, alias = "username")]
    pub subject: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

/// 400 body for blank required fields.
#[derive(Debug, Serialize, Deserialize)]
pub struct ValidationErrorBody {
    pub timestamp: DateTime<Utc>,
    pub status: u16,
    pub error: String,
    pub message: String,
    pub path: String,
    pub errors: Vec<String>,
}

impl ValidationErrorBody {
    fn new(path: &Uri, errors: Vec<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            status: StatusCode::BAD_REQUEST.as_u16(),
            error: "Bad Request".to_string(),
            message: "Validation failed for one or more fields".to_string(),
            path: path.path().to_string(),
            errors,
        }
    }
}

impl IntoResponse for ValidationErrorBody {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(self)).into_response()
    }
}

fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

/// Names of `fields` whose value is absent or blank.
fn blank_fields(uri: &Uri, fields: &[(&str, Option<&str>)]) -> Result<(), ValidationErrorBody> {
    let errors: Vec<String> = fields
        .iter()
        .filter(|(_, value)| value.map_or(true, |v| v.trim().is_empty()))
        .map(|(name, _)| format!("{name}: must not be blank"))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        tracing::debug!(path = %uri.path(), ?errors, "Validation failed");
        Err(ValidationErrorBody::new(uri, errors))
    }
}

fn issue_for(state: &AccountsState, account: &Account) -> Response {
    match state.tokens.issue(&account.username, account.id) {
        Ok(token) => Json(TokenResponse {
            token,
            subject_id: account.id,
            subject: account.username.clone(),
        })
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Token issuance failed");
            error_body(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn login(State(state): State<AccountsState>, OriginalUri(uri): OriginalUri, Json(body): Json<LoginRequest>) -> Response {
    if let Err(invalid) = blank_fields(
        &uri,
        &[("username", Some(body.username.as_str())), ("password", Some(body.password.as_str()))],
    ) {
        return invalid.into_response();
    }

    tracing::debug!(username = %body.username, "Login attempt");

    match state.store.authenticate(&body.username, &body.password) {
        Some(account) => {
            state.store.record_login(account.id, state.tokens.now());
            issue_for(&state, &account)
        }
        None => {
            tracing::info!(username = %body.username, "Login failed");
            error_body(StatusCode::UNAUTHORIZED, "Invalid credentials")
        }
    }
}

async fn register(State(state): State<AccountsState>, OriginalUri(uri): OriginalUri, Json(body): Json<AccountPayload>) -> Response {
    if let Err(invalid) = blank_fields(
        &uri,
        &[("username", body.username.as_deref()), ("password", body.password.as_deref())],
    ) {
        return invalid.into_response();
    }

    match state.store.register(body) {
        Ok(account) => issue_for(&state, &account),
        Err(e) => error_body(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

async fn validate(State(state): State<AccountsState>, OriginalUri(uri): OriginalUri, Json(body): Json<ValidateRequest>) -> Response {
    if let Err(invalid) = blank_fields(
        &uri,
        &[("token", Some(body.token.as_str())), ("username", Some(body.subject.as_str()))],
    ) {
        return invalid.into_response();
    }

    let valid = state.tokens.validate(&body.token, &body.subject);
    Json(ValidateResponse {
        valid,
        subject: valid.then_some(body.subject),
    })
    .into_response()
}

async fn list_accounts(State(state): State<AccountsState>) -> Json<Vec<Account>> {
    Json(state.store.list())
}

async fn get_account(State(state): State<AccountsState>, Path(id): Path<u64>) -> Response {
    match state.store.find_by_id(id) {
        Some(account) => Json(account).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn update_account(
    State(state): State<AccountsState>,
    Path(id): Path<u64>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Json(body): Json<AccountPayload>,
) -> Response {
    if let Err(invalid) = blank_fields(&uri, &[("username", body.username.as_deref())]) {
        return invalid.into_response();
    }
    let requested = body.username.as_deref().unwrap_or_default();

    let authorized = match state.guard.authorize_update(authorization_header(&headers), requested, id) {
        Ok(authorized) => authorized,
        Err(e) => return e.into_response(),
    };

    match state.store.update(id, body) {
        Ok(account) => {
            tracing::info!(id, subject = %authorized.subject, "Account updated");
            Json(account).into_response()
        }
        Err(StoreError::NotFound(_)) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => error_body(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

/// HTTP server for the accounts service.
pub struct AccountsServer {
    router: Router,
    state: AccountsState,
}

impl AccountsServer {
    /// Build the service with the in-memory store.
    pub fn new(config: &GatewayConfig) -> Self {
        let store: Arc<dyn CustomerStore> = if config.accounts.seed_demo_accounts {
            Arc::new(InMemoryCustomerStore::with_demo_accounts())
        } else {
            Arc::new(InMemoryCustomerStore::new())
        };
        Self::with_tokens(config, Arc::new(TokenService::new(&config.tokens)), store)
    }

    /// Build the service around an existing token service and store.
    pub fn with_tokens(config: &GatewayConfig, tokens: Arc<TokenService>, store: Arc<dyn CustomerStore>) -> Self {
        let mode = if config.tokens.bind_subject_id {
            OwnershipMode::SubjectAndId
        } else {
            OwnershipMode::Subject
        };
        let state = AccountsState {
            guard: Arc::new(ResourceOwnerGuard::new(tokens.clone(), mode)),
            tokens,
            store,
        };

        tracing::info!(
            key_source = ?state.tokens.key_source(),
            ownership = ?mode,
            accounts = state.store.list().len(),
            "Accounts service initialized"
        );

        let router = Self::build_router(config, state.clone());
        Self { router, state }
    }

    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AccountsState) -> Router {
        let customers = Router::new()
            .route("/", get(list_accounts))
            .route("/login", post(login))
            .route("/register", post(register))
            .route("/validate", post(validate))
            .route("/{id}", get(get_account).post(update_account));

        Router::new()
            .nest("/api/customers", customers)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AccountsState {
        &self.state
    }

    /// Run the service until a shutdown signal or `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Accounts service starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_requested(shutdown))
            .await?;

        tracing::info!("Accounts service stopped");
        Ok(())
    }
}
