// src/models/score.rs

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use uuid::Uuid;

/// Represents the 'scores' table: one row per submitted quiz attempt.
/// Rows are append-only.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    pub id: Uuid,

    /// Owning user.
    #[serde(rename = "user")]
    pub user_id: Uuid,

    pub category: String,

    /// One of `easy`, `medium`, `hard`.
    pub difficulty: String,

    pub question_count: i32,
    pub correct_answers: i32,

    /// Optional per-question breakdown, stored as a JSON array.
    pub questions: Json<Vec<ScoreQuestion>>,

    pub created_at: DateTime<Utc>,
}

/// A single answered question inside a submitted quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreQuestion {
    pub question_text: String,
    pub correct_answer: String,
    pub user_answer: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(()),
        }
    }
}

/// A validated quiz result, ready to be persisted.
#[derive(Debug, Clone)]
pub struct NewScore {
    pub user_id: Uuid,
    pub category: String,
    pub difficulty: Difficulty,
    pub question_count: i32,
    pub correct_answers: i32,
    pub questions: Vec<ScoreQuestion>,
}

/// DTO for `POST /quiz/submit`.
///
/// Every field is optional at the wire level so that a missing field is
/// reported as invalid quiz data rather than a body rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitScoreRequest {
    pub category: Option<String>,
    pub difficulty: Option<String>,
    pub question_count: Option<i64>,
    pub correct_answers: Option<i64>,
    #[serde(default)]
    pub questions: Vec<ScoreQuestion>,
}

/// Submitted score echoed back with its accuracy.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResponse {
    #[serde(flatten)]
    pub score: Score,
    pub percentage: i32,
}
