// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{config::Config, error::AppError};

pub const MISSING_HEADER: &str = "Missing or malformed authorization header";
pub const TOKEN_EXPIRED: &str = "Token expired";
pub const INVALID_TOKEN: &str = "Invalid token";

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - Stores the User ID (as string).
    pub sub: String,
    pub username: String,
    /// Issued-at as Unix timestamp.
    pub iat: usize,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

impl Claims {
    /// The verified caller's user id.
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::AuthError(INVALID_TOKEN.to_string()))
    }
}

fn now_secs() -> Result<usize, AppError> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs() as usize)
}

/// Signs a new JWT for the user, valid for `expiration_seconds`.
pub fn sign_jwt(
    id: Uuid,
    username: &str,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    let now = now_secs()?;

    let claims = Claims {
        sub: id.to_string(),
        username: username.to_owned(),
        iat: now,
        exp: now + expiration_seconds as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies and decodes a JWT string.
///
/// Expired tokens and otherwise invalid tokens map to distinct messages so
/// clients can tell "log in again" from "bad credential".
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::AuthError(TOKEN_EXPIRED.to_string()),
        _ => AppError::AuthError(INVALID_TOKEN.to_string()),
    })?;

    Ok(token_data.claims)
}

/// Axum Middleware: Authentication.
///
/// Intercepts requests, validates the 'Authorization: Bearer <token>' header.
/// If valid, injects `Claims` into the request extensions for handlers to use.
/// If invalid, returns 401 Unauthorized.
pub async fn auth_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::AuthError(MISSING_HEADER.to_string()))?;

    let claims = verify_jwt(token, &config.jwt_secret)?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret";

    fn message(err: AppError) -> String {
        match err {
            AppError::AuthError(msg) => msg,
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn issued_token_decodes_to_the_same_user() {
        let id = Uuid::new_v4();
        let token = sign_jwt(id, "alice", SECRET, 3600).unwrap();

        let claims = verify_jwt(&token, SECRET).unwrap();
        assert_eq!(claims.user_id().unwrap(), id);
        assert_eq!(claims.username, "alice");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let token = sign_jwt(Uuid::new_v4(), "alice", SECRET, 3600).unwrap();
        let err = verify_jwt(&token, "another-secret").unwrap_err();
        assert_eq!(message(err), INVALID_TOKEN);
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let past = now_secs().unwrap() - 3600;
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            username: "alice".into(),
            iat: past - 60,
            exp: past,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        let err = verify_jwt(&token, SECRET).unwrap_err();
        assert_eq!(message(err), TOKEN_EXPIRED);
    }

    #[test]
    fn garbage_is_invalid() {
        let err = verify_jwt("not.a.jwt", SECRET).unwrap_err();
        assert_eq!(message(err), INVALID_TOKEN);
    }

    #[test]
    fn non_uuid_subject_is_rejected() {
        let claims = Claims {
            sub: "42".into(),
            username: "alice".into(),
            iat: 0,
            exp: 0,
        };
        assert!(claims.user_id().is_err());
    }
}
