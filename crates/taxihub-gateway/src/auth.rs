//! Credential checks: bearer token first, shared API key second

use crate::GatewayError;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;

/// Header carrying the shared secret
pub const API_KEY_HEADER: &str = "x-api-key";

const MISSING_BEARER: &str = "missing or invalid authorization header";
const INVALID_TOKEN: &str = "invalid or expired token";
const INVALID_API_KEY: &str = "invalid or missing API key";

/// JWT claims structure
///
/// Every claim is optional; `exp` is only enforced when present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Expiration time
    #[serde(
        default,
        deserialize_with = "numeric_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub exp: Option<i64>,
    /// Issued at
    #[serde(
        default,
        deserialize_with = "numeric_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub iat: Option<i64>,
    /// Name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// JWT NumericDate: any JSON number of seconds, fractions truncated
fn numeric_date<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(number) = Option::<serde_json::Number>::deserialize(deserializer)? else {
        return Ok(None);
    };
    number
        .as_i64()
        .or_else(|| {
            number
                .as_f64()
                .filter(|secs| secs.is_finite())
                .map(|secs| secs.trunc() as i64)
        })
        .map(Some)
        .ok_or_else(|| de::Error::custom(format!("invalid numeric date {}", number)))
}

impl Claims {
    /// Expiry as a timestamp, if the token carries one
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    let (scheme, token) = auth_header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

fn token_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.leeway = 0;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    validation
}

/// The two-factor gate applied to protected routes.
///
/// Built once from configuration and shared by all requests.
#[derive(Clone)]
pub struct CredentialGate {
    key: DecodingKey,
    validation: Validation,
    api_key: String,
}

impl fmt::Debug for CredentialGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialGate").finish_non_exhaustive()
    }
}

impl CredentialGate {
    pub fn new(jwt_secret: &str, api_key: impl Into<String>) -> Self {
        Self {
            key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            validation: token_validation(),
            api_key: api_key.into(),
        }
    }

    /// Run both checks in order, stopping at the first failure
    pub fn check(&self, headers: &HeaderMap) -> Result<Claims, GatewayError> {
        let claims = self.verify_token(headers)?;
        self.verify_api_key(headers)?;
        Ok(claims)
    }

    /// Bearer token check
    pub fn verify_token(&self, headers: &HeaderMap) -> Result<Claims, GatewayError> {
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(extract_bearer_token)
            .ok_or_else(|| GatewayError::unauthorized(MISSING_BEARER))?;

        self.validate_token(token)
    }

    /// Validate a JWT token and extract claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, GatewayError> {
        decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Token validation failed: {}", e);
                GatewayError::unauthorized(INVALID_TOKEN)
            })
    }

    /// Shared-secret check.
    ///
    /// Plain string equality; this does not try to hide timing differences.
    pub fn verify_api_key(&self, headers: &HeaderMap) -> Result<(), GatewayError> {
        match headers.get(API_KEY_HEADER).and_then(|h| h.to_str().ok()) {
            Some(presented) if !presented.is_empty() && presented == self.api_key => Ok(()),
            _ => Err(GatewayError::unauthorized(INVALID_API_KEY)),
        }
    }
}
