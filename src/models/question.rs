// src/models/question.rs

use serde::{Deserialize, Serialize};

use crate::models::score::Difficulty;

/// A multiple-choice trivia question as served to clients.
///
/// Field names follow the upstream trivia API so the payload can be passed
/// through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriviaQuestion {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub difficulty: String,
    pub question: String,
    pub correct_answer: String,
    pub incorrect_answers: Vec<String>,
}

/// Optional hints accepted by `GET /quiz`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
pub struct QuestionQuery {
    /// Upstream numeric category id.
    pub category: Option<u32>,
    pub difficulty: Option<Difficulty>,
}

/// Response body of `GET /quiz`.
#[derive(Debug, Serialize)]
pub struct QuizResponse {
    pub questions: Vec<TriviaQuestion>,
}
