use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::{ApiError, AppState};
use crate::error::{MatchPoolError, Result};

/// Secrets and knobs for the façade's two auth mechanisms.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub api_key: String,
    pub jwt_secret: String,
    pub access_ttl_min: i64,
}

/// Claims carried by an issued access token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub roles: Vec<String>,
    pub iat: i64,
    pub exp: i64,
}

/// Issue an HS256 bearer token for a player.
pub fn create_access_token(config: &AuthConfig, sub: &str) -> Result<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: sub.to_string(),
        roles: vec!["player".to_string()],
        iat: now.timestamp(),
        exp: (now + Duration::minutes(config.access_ttl_min)).timestamp(),
    };
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|err| MatchPoolError::Auth(err.to_string()))
}

/// Validate a bearer token and return its claims.
pub fn decode_access_token(config: &AuthConfig, token: &str) -> Result<Claims> {
    jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|err| MatchPoolError::Auth(err.to_string()))
}

/// Extractor guarding mutating endpoints: the `x-api-key` header must match
/// the configured key.
pub struct ApiKey;

#[async_trait]
impl FromRequestParts<AppState> for ApiKey {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let provided = parts
            .headers
            .get("x-api-key")
            .and_then(|value| value.to_str().ok());

        if provided == Some(state.auth.api_key.as_str()) {
            Ok(ApiKey)
        } else {
            Err(ApiError::unauthorized("invalid api key"))
        }
    }
}
