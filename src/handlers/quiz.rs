// src/handlers/quiz.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::State,
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    error::AppError,
    models::{
        question::{QuestionQuery, QuizResponse},
        score::{ScoreResponse, SubmitScoreRequest},
        user::UserStats,
    },
    repositories::DynRepository,
    services::{
        stats::{accuracy_percentage, stats_update, validate_submission},
        trivia::TriviaService,
    },
    utils::{
        extract::{AppJson, AppQuery},
        jwt::Claims,
    },
};

/// Ten multiple-choice questions for the caller.
///
/// Never fails because of the upstream trivia provider: the service falls
/// back to cached or local questions.
pub async fn get_questions(
    State(trivia): State<Arc<TriviaService>>,
    Extension(claims): Extension<Claims>,
    AppQuery(query): AppQuery<QuestionQuery>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let batch = trivia.questions(&user_id.to_string(), query).await;

    tracing::debug!(
        "Serving {} questions to {} from {:?}",
        batch.questions.len(),
        user_id,
        batch.source
    );

    Ok(Json(QuizResponse {
        questions: batch.questions,
    }))
}

/// Records a finished quiz and updates the caller's mana and mage meter.
///
/// The user update and the score insert are independent writes.
pub async fn submit_score(
    State(repo): State<DynRepository>,
    State(trivia): State<Arc<TriviaService>>,
    Extension(claims): Extension<Claims>,
    AppJson(payload): AppJson<SubmitScoreRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let submission = validate_submission(user_id, payload)?;
    let update = stats_update(submission.correct_answers, submission.question_count);

    let user = repo
        .apply_quiz_result(user_id, update.mana_gain, update.mage_meter)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let score = repo.insert_score(submission).await?;
    trivia.forget(&user_id.to_string()).await;

    tracing::info!(
        "User {} scored {}/{} ({})",
        user.username,
        score.correct_answers,
        score.question_count,
        score.category
    );

    let percentage = accuracy_percentage(score.correct_answers, score.question_count);
    let stats = UserStats::from(&user);
    let score = ScoreResponse { score, percentage };

    Ok(Json(json!({
        "message": "Score submitted successfully",
        "user": stats,
        "score": score,
    })))
}
