//! Signed bearer tokens.
//!
//! Tokens are HS256 JWTs carrying the subject, its numeric id and the
//! issue/expiry times. Nothing is stored server-side: a token is valid while
//! its signature verifies and the clock is before its expiry.
//!
//! # Key derivation
//! - secret of at least [`MIN_KEY_LEN`] bytes: used as-is
//! - shorter secret: SHA-256 of the secret
//! - no secret: random key for the lifetime of the process

use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, warn};

use crate::auth::clock::{Clock, SystemClock};
use crate::config::TokenConfig;
use crate::observability::metrics;

/// Minimum HS256 key length in bytes.
pub const MIN_KEY_LEN: usize = 32;

/// Longest accepted token lifetime: 100 years.
pub const MAX_LIFETIME_SECS: u64 = 100 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Bad signature, malformed structure or undecodable claims.
    #[error("invalid token")]
    Invalid,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Claims carried by a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub subject: String,
    pub subject_id: u64,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl TokenClaims {
    /// Expiry is strict: a token is dead at `expires_at` itself.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// JWT payload.
#[derive(Debug, Serialize, Deserialize)]
struct WireClaims {
    sub: String,
    #[serde(rename = "customerId")]
    customer_id: u64,
    #[serde(default)]
    username: String,
    iat: i64,
    exp: i64,
}

/// Where the signing key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Configured,
    Derived,
    Ephemeral,
}

fn derive_key(secret: Option<&str>) -> (Vec<u8>, KeySource) {
    match secret.filter(|s| !s.is_empty()) {
        None => {
            warn!("Token secret is not configured; generating a temporary key");
            let mut key = vec![0u8; MIN_KEY_LEN];
            rand::thread_rng().fill_bytes(&mut key);
            (key, KeySource::Ephemeral)
        }
        Some(secret) if secret.len() < MIN_KEY_LEN => {
            warn!("Token secret is too short; derived a 256-bit key from it");
            (Sha256::digest(secret.as_bytes()).to_vec(), KeySource::Derived)
        }
        Some(secret) => (secret.as_bytes().to_vec(), KeySource::Configured),
    }
}

/// Issues, parses and validates tokens.
///
/// The key is derived once at construction and never changes afterwards, so
/// build the service before serving any request.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    key_source: KeySource,
    lifetime_secs: i64,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("key_source", &self.key_source)
            .field("lifetime_secs", &self.lifetime_secs)
            .field("clock", &self.clock)
            .field("encoding_key", &"[REDACTED]")
            .field("decoding_key", &"[REDACTED]")
            .finish()
    }
}

impl TokenService {
    pub fn new(config: &TokenConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &TokenConfig, clock: Arc<dyn Clock>) -> Self {
        let (key, key_source) = derive_key(config.secret.as_deref());

        // Expiry is checked against our own clock, not by the decoder.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(&key),
            decoding_key: DecodingKey::from_secret(&key),
            validation,
            key_source,
            lifetime_secs: i64::try_from(config.lifetime_secs).unwrap_or(i64::MAX),
            clock,
        }
    }

    pub fn key_source(&self) -> KeySource {
        self.key_source
    }

    pub fn lifetime_secs(&self) -> i64 {
        self.lifetime_secs
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Sign a new token for `subject`.
    pub fn issue(&self, subject: &str, subject_id: u64) -> Result<String, TokenError> {
        let iat = self.clock.now().timestamp();
        let exp = iat
            .checked_add(self.lifetime_secs)
            .filter(|exp| DateTime::from_timestamp(*exp, 0).is_some())
            .ok_or_else(|| TokenError::Signing(format!("expiry out of range for lifetime {}s", self.lifetime_secs)))?;
        let claims = WireClaims {
            sub: subject.to_string(),
            customer_id: subject_id,
            username: subject.to_string(),
            iat,
            exp,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        metrics::record_token_issued();
        debug!(subject = %subject, subject_id, "Issued token");
        Ok(token)
    }

    /// Verify the signature and decode the claims. Expiry is not checked.
    pub fn parse(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let data = decode::<WireClaims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            debug!(error = %e, "Token rejected");
            TokenError::Invalid
        })?;
        let wire = data.claims;

        Ok(TokenClaims {
            subject: wire.sub,
            subject_id: wire.customer_id,
            issued_at: DateTime::from_timestamp(wire.iat, 0).ok_or(TokenError::Invalid)?,
            expires_at: DateTime::from_timestamp(wire.exp, 0).ok_or(TokenError::Invalid)?,
        })
    }

    /// True iff the token verifies, names `expected_subject` and has not expired.
    pub fn validate(&self, token: &str, expected_subject: &str) -> bool {
        match self.parse(token) {
            Ok(claims) => claims.subject == expected_subject && !claims.is_expired_at(self.clock.now()),
            Err(_) => false,
        }
    }

    pub fn extract_subject(&self, token: &str) -> Result<String, TokenError> {
        self.parse(token).map(|claims| claims.subject)
    }
}
