// src/models/leaderboard.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// One ranked row: a user joined with the number of quizzes they submitted.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub username: String,
    pub mana: i64,
    pub mage_meter: i32,
    pub total_quizzes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Mana,
    MageMeter,
}

impl SortField {
    pub const VALID: [&'static str; 2] = ["mana", "mageMeter"];

    /// Column used by the SQL store.
    pub fn column(self) -> &'static str {
        match self {
            SortField::Mana => "u.mana",
            SortField::MageMeter => "u.mage_meter",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub const VALID: [&'static str; 2] = ["asc", "desc"];

    pub fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Raw query string of the leaderboard endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardParams {
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Validated leaderboard request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaderboardQuery {
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    pub page: i64,
    pub limit: i64,
}

impl LeaderboardQuery {
    /// Rows to skip. Pages past the end saturate instead of overflowing.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl TryFrom<LeaderboardParams> for LeaderboardQuery {
    type Error = AppError;

    fn try_from(params: LeaderboardParams) -> Result<Self, Self::Error> {
        let sort_by = match params.sort_by.as_deref().unwrap_or("mana") {
            "mana" => SortField::Mana,
            "mageMeter" => SortField::MageMeter,
            _ => {
                return Err(AppError::BadRequest(format!(
                    "Invalid sortBy field. Valid options: {}",
                    SortField::VALID.join(", ")
                )));
            }
        };

        let sort_order = match params.sort_order.as_deref().unwrap_or("desc") {
            "asc" => SortOrder::Asc,
            "desc" => SortOrder::Desc,
            _ => {
                return Err(AppError::BadRequest(format!(
                    "Invalid sortOrder. Valid options: {}",
                    SortOrder::VALID.join(", ")
                )));
            }
        };

        let page = params.page.unwrap_or(1);
        if page < 1 {
            return Err(AppError::BadRequest("page must be at least 1".to_string()));
        }

        let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(AppError::BadRequest(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        Ok(Self {
            sort_by,
            sort_order,
            page,
            limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_mana_descending_first_page() {
        let query = LeaderboardQuery::try_from(LeaderboardParams::default()).unwrap();
        assert_eq!(query.sort_by, SortField::Mana);
        assert_eq!(query.sort_order, SortOrder::Desc);
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, DEFAULT_PAGE_SIZE);
        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn unknown_sort_field_lists_allowed_values() {
        let params = LeaderboardParams {
            sort_by: Some("score".into()),
            ..Default::default()
        };
        match LeaderboardQuery::try_from(params) {
            Err(AppError::BadRequest(msg)) => {
                assert_eq!(msg, "Invalid sortBy field. Valid options: mana, mageMeter")
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn unknown_sort_order_lists_allowed_values() {
        let params = LeaderboardParams {
            sort_order: Some("up".into()),
            ..Default::default()
        };
        match LeaderboardQuery::try_from(params) {
            Err(AppError::BadRequest(msg)) => {
                assert_eq!(msg, "Invalid sortOrder. Valid options: asc, desc")
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn page_and_limit_are_bounded() {
        let zero_page = LeaderboardParams {
            page: Some(0),
            ..Default::default()
        };
        assert!(LeaderboardQuery::try_from(zero_page).is_err());

        let huge_limit = LeaderboardParams {
            limit: Some(MAX_PAGE_SIZE + 1),
            ..Default::default()
        };
        assert!(LeaderboardQuery::try_from(huge_limit).is_err());

        let third_page = LeaderboardParams {
            page: Some(3),
            limit: Some(5),
            ..Default::default()
        };
        assert_eq!(LeaderboardQuery::try_from(third_page).unwrap().offset(), 10);
    }

    #[test]
    fn far_pages_saturate_the_offset() {
        let last_page = LeaderboardParams {
            page: Some(i64::MAX),
            limit: Some(10),
            ..Default::default()
        };
        let query = LeaderboardQuery::try_from(last_page).unwrap();
        assert_eq!(query.offset(), i64::MAX);
    }
}
