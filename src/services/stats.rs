// src/services/stats.rs

//! Translates a submitted quiz into mana/meter updates.

use uuid::Uuid;

use crate::{
    error::AppError,
    models::score::{Difficulty, NewScore, SubmitScoreRequest},
};

pub const INVALID_QUIZ_DATA: &str = "Invalid quiz data";

const MAX_CATEGORY_LEN: usize = 100;
/// Largest count the score table can hold.
const MAX_QUESTION_COUNT: i64 = i32::MAX as i64;

/// Effect of one quiz on the submitting user's stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsUpdate {
    /// Added to the user's mana.
    pub mana_gain: i64,
    /// Replaces the user's mage meter.
    pub mage_meter: i32,
}

/// Accuracy as a whole percentage, rounded half up and clamped to 0..=100.
///
/// `question_count` must be positive.
pub fn accuracy_percentage(correct_answers: i32, question_count: i32) -> i32 {
    let correct = i64::from(correct_answers.max(0));
    let count = i64::from(question_count.max(1));
    // round(100 * c / n) in integers.
    let rounded = (200 * correct + count) / (2 * count);
    rounded.clamp(0, 100) as i32
}

pub fn stats_update(correct_answers: i32, question_count: i32) -> StatsUpdate {
    StatsUpdate {
        mana_gain: i64::from(correct_answers),
        mage_meter: accuracy_percentage(correct_answers, question_count),
    }
}

/// Validates a submission. Any missing or out-of-range field is rejected
/// with the same message.
pub fn validate_submission(user_id: Uuid, req: SubmitScoreRequest) -> Result<NewScore, AppError> {
    let invalid = || AppError::BadRequest(INVALID_QUIZ_DATA.to_string());

    let category = req
        .category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty() && c.chars().count() <= MAX_CATEGORY_LEN)
        .ok_or_else(invalid)?;

    let difficulty = req
        .difficulty
        .as_deref()
        .and_then(|d| d.parse::<Difficulty>().ok())
        .ok_or_else(invalid)?;

    let question_count = req
        .question_count
        .filter(|n| (1..=MAX_QUESTION_COUNT).contains(n))
        .ok_or_else(invalid)?;

    let correct_answers = req
        .correct_answers
        .filter(|c| (0..=question_count).contains(c))
        .ok_or_else(invalid)?;

    Ok(NewScore {
        user_id,
        category,
        difficulty,
        question_count: question_count as i32,
        correct_answers: correct_answers as i32,
        questions: req.questions,
    })
}
