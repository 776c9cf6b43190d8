// src/handlers/auth.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{CreateUserRequest, LoginRequest, NewUser, normalize_email},
    repositories::{DynRepository, EMAIL_TAKEN, USERNAME_TAKEN},
    utils::{
        extract::AppJson,
        hash::{hash_password, verify_password},
        jwt::sign_jwt,
    },
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Registers a new user.
///
/// Checks email then username for duplicates, hashes the password using
/// Argon2 and stores the account. Returns 201 Created with a message.
pub async fn register(
    State(repo): State<DynRepository>,
    AppJson(payload): AppJson<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let payload = payload.normalized();
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if repo.find_user_by_email(&payload.email).await?.is_some() {
        return Err(AppError::BadRequest(EMAIL_TAKEN.to_string()));
    }
    if repo.find_user_by_username(&payload.username).await?.is_some() {
        return Err(AppError::BadRequest(USERNAME_TAKEN.to_string()));
    }

    let hashed_password = hash_password(&payload.password)?;

    let user = repo
        .insert_user(NewUser {
            username: payload.username,
            email: payload.email,
            password: hashed_password,
        })
        .await?;

    tracing::info!("Registered user {} ({})", user.username, user.id);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User registered successfully" })),
    ))
}

/// Authenticates a user and returns a JWT token.
///
/// Unknown email and wrong password are indistinguishable to the caller.
pub async fn login(
    State(repo): State<DynRepository>,
    State(config): State<Config>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.validate().is_err() {
        return Err(AppError::AuthError(INVALID_CREDENTIALS.to_string()));
    }

    let user = repo
        .find_user_by_email(&normalize_email(&payload.email))
        .await?
        .ok_or_else(|| AppError::AuthError(INVALID_CREDENTIALS.to_string()))?;

    if !verify_password(&payload.password, &user.password)? {
        tracing::debug!("Rejected login for user {}", user.id);
        return Err(AppError::AuthError(INVALID_CREDENTIALS.to_string()));
    }

    let token = sign_jwt(
        user.id,
        &user.username,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer"
    })))
}
