//! Bearer token guard.
//!
//! Tokens are HS256 JWTs issued by the account service. The only claim the
//! server relies on is the user id (`id`, or `sub` as a fallback); `exp` is
//! required and enforced.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use circles_types::UserId;

use crate::error::ApiError;
use crate::state::AppState;

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(alias = "sub")]
    pub id: String,
    pub exp: u64,
}

/// The authenticated caller, stored in request extensions by the guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser(pub UserId);

/// Key material and validation rules for incoming tokens.
#[derive(Clone)]
pub struct JwtConfig {
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtConfig {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            decoding: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Verify `token` and return the caller it names.
    pub fn verify(&self, token: &str) -> Result<AuthUser, ApiError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "rejected bearer token");
            ApiError::Unauthorized("Unauthorized".into())
        })?;
        let id = UserId::parse(&data.claims.id)
            .map_err(|_| ApiError::Unauthorized("Unauthorized".into()))?;
        Ok(AuthUser(id))
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// `Ok(None)` when the header is absent.
fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, ApiError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| ApiError::Unauthorized("Unauthorized".into()))?;
    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => {
            let token = token.trim();
            if token.is_empty() {
                Err(ApiError::Unauthorized("Unauthorized".into()))
            } else {
                Ok(Some(token))
            }
        }
        _ => Err(ApiError::Unauthorized("Unauthorized".into())),
    }
}

/// Reject the request with 401 unless it carries a valid bearer token.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers())?
        .ok_or_else(|| ApiError::Unauthorized("Unauthorized".into()))?;
    let user = state.jwt.verify(token)?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Attach the caller when a token is present; anonymous requests pass.
///
/// A token that is present but invalid is still a 401.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = match bearer_token(req.headers())? {
        Some(token) => Some(state.jwt.verify(token)?),
        None => None,
    };
    if let Some(user) = user {
        req.extensions_mut().insert(user);
    }
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use jsonwebtoken::{encode, get_current_timestamp, EncodingKey, Header};

    const SECRET: &[u8] = b"unit-test-secret";

    fn token(id: &str, exp: u64) -> String {
        encode(
            &Header::default(),
            &Claims {
                id: id.into(),
                exp,
            },
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_names_the_user() {
        let config = JwtConfig::from_secret(SECRET);
        let user = config
            .verify(&token("u-1", get_current_timestamp() + 600))
            .unwrap();
        assert_eq!(user, AuthUser(UserId::new("u-1")));
    }

    #[test]
    fn expired_or_foreign_tokens_are_rejected() {
        let config = JwtConfig::from_secret(SECRET);
        assert!(config.verify(&token("u-1", 1_000)).is_err());

        let other = JwtConfig::from_secret(b"someone-else");
        assert!(other
            .verify(&token("u-1", get_current_timestamp() + 600))
            .is_err());
        assert!(config.verify("not-a-jwt").is_err());
    }

    #[test]
    fn blank_subject_is_rejected() {
        let config = JwtConfig::from_secret(SECRET);
        assert!(config
            .verify(&token("  ", get_current_timestamp() + 600))
            .is_err());
    }

    #[test]
    fn bearer_header_parsing() {
        let mut headers = HeaderMap::new();
        assert!(matches!(bearer_token(&headers), Ok(None)));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers).unwrap(), Some("abc.def"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(bearer_token(&headers).is_err());

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer"));
        assert!(bearer_token(&headers).is_err());
    }
}
