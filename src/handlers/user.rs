// src/handlers/user.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    error::AppError,
    models::user::{
        ChangePasswordRequest, FriendRequest, UpdateProfileRequest, User, UserStats,
        normalize_email, validate_email, validate_username,
    },
    repositories::{DynRepository, EMAIL_TAKEN, ProfileChanges, USERNAME_TAKEN},
    utils::{
        extract::AppJson,
        hash::{hash_password, verify_password},
        jwt::Claims,
    },
};

fn user_not_found() -> AppError {
    AppError::NotFound("User not found".to_string())
}

fn validation_message(err: ValidationError) -> AppError {
    let message = err
        .message
        .map(|m| m.to_string())
        .unwrap_or_else(|| err.code.to_string());
    AppError::BadRequest(message)
}

/// Loads the authenticated caller's record.
async fn current_user(repo: &DynRepository, claims: &Claims) -> Result<User, AppError> {
    repo.find_user_by_id(claims.user_id()?)
        .await?
        .ok_or_else(user_not_found)
}

/// Get current user's profile (without the password hash).
pub async fn get_me(
    State(repo): State<DynRepository>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(current_user(&repo, &claims).await?))
}

/// Update username and/or email of the current user.
pub async fn update_me(
    State(repo): State<DynRepository>,
    Extension(claims): Extension<Claims>,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let username = payload.username.map(|u| u.trim().to_string());
    let email = payload.email.as_deref().map(normalize_email);

    if let Some(username) = &username {
        validate_username(username).map_err(validation_message)?;
        if let Some(owner) = repo.find_user_by_username(username).await? {
            if owner.id != user_id {
                return Err(AppError::BadRequest(USERNAME_TAKEN.to_string()));
            }
        }
    }
    if let Some(email) = &email {
        validate_email(email).map_err(validation_message)?;
        if let Some(owner) = repo.find_user_by_email(email).await? {
            if owner.id != user_id {
                return Err(AppError::BadRequest(EMAIL_TAKEN.to_string()));
            }
        }
    }

    let user = repo
        .update_profile(user_id, ProfileChanges { username, email })
        .await?
        .ok_or_else(user_not_found)?;

    Ok(Json(user))
}

/// Replace the password after checking the current one.
pub async fn change_password(
    State(repo): State<DynRepository>,
    Extension(claims): Extension<Claims>,
    AppJson(payload): AppJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user = current_user(&repo, &claims).await?;
    if !verify_password(&payload.current_password, &user.password)? {
        return Err(AppError::BadRequest(
            "Current password is incorrect".to_string(),
        ));
    }

    let hashed_password = hash_password(&payload.new_password)?;
    if !repo.update_password(user.id, &hashed_password).await? {
        return Err(user_not_found());
    }

    tracing::info!("Password changed for user {}", user.id);
    Ok(Json(json!({ "message": "Password updated successfully" })))
}

/// Delete the current user's account.
pub async fn delete_me(
    State(repo): State<DynRepository>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    if !repo.delete_user(user_id).await? {
        return Err(user_not_found());
    }

    tracing::info!("Deleted user {}", user_id);
    Ok(Json(json!({ "message": "Account deleted successfully" })))
}

/// Public game stats of any user.
pub async fn get_stats(
    State(repo): State<DynRepository>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = Uuid::parse_str(&user_id)
        .map_err(|_| AppError::BadRequest("Invalid user ID".to_string()))?;

    let user = repo
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(user_not_found)?;

    Ok(Json(UserStats::from(&user)))
}

pub async fn add_friend(
    State(repo): State<DynRepository>,
    Extension(claims): Extension<Claims>,
    AppJson(payload): AppJson<FriendRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let friend = repo
        .find_user_by_username(payload.username.trim())
        .await?
        .ok_or_else(|| AppError::NotFound("Friend not found".to_string()))?;

    let user = current_user(&repo, &claims).await?;
    if friend.id == user.id {
        return Err(AppError::BadRequest(
            "You cannot add yourself as a friend".to_string(),
        ));
    }
    if user.is_friend(friend.id) {
        return Err(AppError::BadRequest(
            "Already friends with this user".to_string(),
        ));
    }

    let user = repo
        .add_friend(user.id, friend.id)
        .await?
        .ok_or_else(user_not_found)?;

    Ok(Json(json!({
        "message": "Friend added successfully",
        "user": user
    })))
}

pub async fn remove_friend(
    State(repo): State<DynRepository>,
    Extension(claims): Extension<Claims>,
    AppJson(payload): AppJson<FriendRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let friend = repo
        .find_user_by_username(payload.username.trim())
        .await?
        .ok_or_else(|| AppError::NotFound("Friend not found".to_string()))?;

    let user = current_user(&repo, &claims).await?;
    if !user.is_friend(friend.id) {
        return Err(AppError::BadRequest(
            "Not friends with this user".to_string(),
        ));
    }

    let user = repo
        .remove_friend(user.id, friend.id)
        .await?
        .ok_or_else(user_not_found)?;

    Ok(Json(json!({
        "message": "Friend removed successfully",
        "user": user
    })))
}

/// Friends of the current user. Ids that no longer resolve are skipped.
pub async fn list_friends(
    State(repo): State<DynRepository>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = current_user(&repo, &claims).await?;
    let friends = repo.find_users_by_ids(&user.friends).await?;

    Ok(Json(json!({ "friends": friends })))
}
