use axum::extract::State;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub exp: i64,    // expiration (unix timestamp)
}

/// Validate an HS256 bearer token and return the authenticated user id.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Uuid, AppError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|_| AppError::Unauthorized)?;
    Uuid::parse_str(&data.claims.sub).map_err(|_| AppError::Unauthorized)
}

/// Mint a token for a user; used by tests and local tooling.
pub fn issue_jwt(user_id: Uuid, secret: &str, ttl_secs: i64) -> Result<String, AppError> {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: chrono::Utc::now().timestamp() + ttl_secs,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Config(format!("sign jwt: {e}")))
}

/// Extract the bearer token, verify it, and thread the identity into
/// request extensions. There is no ambient current-user global; every
/// handler receives the identity through the `User` extractor.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: axum::extract::Request,
    next: axum::middleware::Next,
) -> Result<axum::response::Response, AppError> {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthorized)?;

    let user_id = verify_jwt(token, &state.config.jwt_secret)?;
    req.extensions_mut().insert(user_id);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_round_trips() {
        let user = Uuid::new_v4();
        let token = issue_jwt(user, "secret", 60).unwrap();
        assert_eq!(verify_jwt(&token, "secret").unwrap(), user);
    }

    #[test]
    fn wrong_secret_is_unauthenticated() {
        let token = issue_jwt(Uuid::new_v4(), "secret", 60).unwrap();
        assert!(matches!(
            verify_jwt(&token, "other"),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn expired_token_is_unauthenticated() {
        let token = issue_jwt(Uuid::new_v4(), "secret", -120).unwrap();
        assert!(matches!(
            verify_jwt(&token, "secret"),
            Err(AppError::Unauthorized)
        ));
    }
}
