// src/handlers/leaderboard.rs

use axum::{
    Extension, Json,
    extract::State,
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    error::AppError,
    models::leaderboard::{LeaderboardParams, LeaderboardQuery},
    repositories::DynRepository,
    utils::{extract::AppQuery, jwt::Claims},
};

/// Ranked page over every user.
pub async fn global(
    State(repo): State<DynRepository>,
    AppQuery(params): AppQuery<LeaderboardParams>,
) -> Result<impl IntoResponse, AppError> {
    let query = LeaderboardQuery::try_from(params)?;
    let leaderboard = repo.leaderboard(&query, None).await?;

    Ok(Json(json!({ "leaderboard": leaderboard })))
}

/// Ranked page over the caller and the caller's friends.
pub async fn friends(
    State(repo): State<DynRepository>,
    Extension(claims): Extension<Claims>,
    AppQuery(params): AppQuery<LeaderboardParams>,
) -> Result<impl IntoResponse, AppError> {
    let query = LeaderboardQuery::try_from(params)?;

    let user = repo
        .find_user_by_id(claims.user_id()?)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let mut ids = Vec::with_capacity(user.friends.len() + 1);
    ids.push(user.id);
    ids.extend(user.friends.iter().copied());

    let leaderboard = repo.leaderboard(&query, Some(&ids)).await?;

    Ok(Json(json!({ "leaderboard": leaderboard })))
}
