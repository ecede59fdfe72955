//! Authorization for token-protected updates.
//!
//! The guard binds the bearer token's subject to the subject named in the
//! update payload. By default it does not look at the target resource id at
//! all; [`OwnershipMode::SubjectAndId`] additionally requires the token's
//! subject id to equal the target id.

use std::sync::Arc;

use axum::{
    http::{header::AUTHORIZATION, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::auth::token::TokenService;
use crate::http::response::ApiError;
use crate::observability::metrics;

pub const BEARER_PREFIX: &str = "Bearer ";

/// How strictly an update is bound to the caller's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OwnershipMode {
    /// Token subject must equal the payload subject.
    #[default]
    Subject,
    /// As `Subject`, and the token's subject id must equal the target id.
    SubjectAndId,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Missing or invalid Authorization header")]
    TokenMissing,

    #[error("Invalid or malformed token")]
    TokenInvalid,

    #[error("Invalid or expired token")]
    TokenExpired,

    #[error("Token does not allow updating this user")]
    SubjectMismatch,

    #[error("Token does not allow updating this resource")]
    ResourceMismatch,
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::TokenMissing | AuthError::TokenInvalid | AuthError::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::SubjectMismatch | AuthError::ResourceMismatch => StatusCode::FORBIDDEN,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AuthError::TokenMissing => "TOKEN_MISSING",
            AuthError::TokenInvalid => "TOKEN_INVALID",
            AuthError::TokenExpired => "TOKEN_EXPIRED",
            AuthError::SubjectMismatch => "SUBJECT_MISMATCH",
            AuthError::ResourceMismatch => "RESOURCE_MISMATCH",
        }
    }

    fn details(&self) -> &'static str {
        match self {
            AuthError::TokenMissing | AuthError::TokenInvalid | AuthError::TokenExpired => {
                "Provide a valid token as 'Authorization: Bearer <token>'. Log in again to obtain a new token."
            }
            AuthError::SubjectMismatch | AuthError::ResourceMismatch => {
                "A token may only be used to update its own account."
            }
        }
    }

    pub fn to_api_error(&self) -> ApiError {
        ApiError::new(self.code(), self.to_string(), "Authorization", self.details())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.to_api_error().with_status(self.status())
    }
}

/// A caller cleared to perform the update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorized {
    pub subject: String,
    pub subject_id: u64,
}

#[derive(Debug, Clone)]
pub struct ResourceOwnerGuard {
    tokens: Arc<TokenService>,
    mode: OwnershipMode,
}

impl ResourceOwnerGuard {
    pub fn new(tokens: Arc<TokenService>, mode: OwnershipMode) -> Self {
        Self { tokens, mode }
    }

    pub fn mode(&self) -> OwnershipMode {
        self.mode
    }

    /// Authorize an update of `target_id` whose payload names `requested_subject`.
    pub fn authorize_update(
        &self,
        authorization: Option<&str>,
        requested_subject: &str,
        target_id: u64,
    ) -> Result<Authorized, AuthError> {
        let result = self.check(authorization, requested_subject, target_id);
        if let Err(err) = &result {
            tracing::warn!(
                target_id,
                requested_subject = %requested_subject,
                code = err.code(),
                "Update rejected"
            );
            metrics::record_rejection(err.code());
        }
        result
    }

    fn check(
        &self,
        authorization: Option<&str>,
        requested_subject: &str,
        target_id: u64,
    ) -> Result<Authorized, AuthError> {
        let token = authorization
            .and_then(|h| h.strip_prefix(BEARER_PREFIX))
            .ok_or(AuthError::TokenMissing)?;

        let claims = self.tokens.parse(token).map_err(|_| AuthError::TokenInvalid)?;

        if !self.tokens.validate(token, &claims.subject) {
            return Err(AuthError::TokenExpired);
        }

        if claims.subject != requested_subject {
            return Err(AuthError::SubjectMismatch);
        }

        if self.mode == OwnershipMode::SubjectAndId && claims.subject_id != target_id {
            return Err(AuthError::ResourceMismatch);
        }

        Ok(Authorized {
            subject: claims.subject,
            subject_id: claims.subject_id,
        })
    }
}

/// Read the raw `Authorization` header, if it is valid UTF-8.
pub fn authorization_header(headers: &axum::http::HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
}
