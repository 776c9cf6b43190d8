// src/repositories/mod.rs

//! Data access for users and scores.
//!
//! Every lookup returns `Option` and callers decide what "absent" means for
//! them (usually a 404).

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        leaderboard::{LeaderboardEntry, LeaderboardQuery},
        score::{NewScore, Score},
        user::{NewUser, User},
    },
};

pub use memory::MemoryRepository;
pub use postgres::PgRepository;

pub type DynRepository = Arc<dyn Repository>;

/// Profile fields to overwrite; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub username: Option<String>,
    pub email: Option<String>,
}

#[async_trait]
pub trait Repository: Send + Sync {
    /// Inserts a user. Duplicate username/email yields `AppError::BadRequest`.
    async fn insert_user(&self, user: NewUser) -> Result<User, AppError>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    /// Users for the given ids, ordered by username. Unknown ids are skipped.
    async fn find_users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, AppError>;

    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Option<User>, AppError>;

    /// Stores a new password hash. Returns false when the user is absent.
    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool, AppError>;

    /// Adds `mana_gain` to the user's mana and replaces the meter.
    async fn apply_quiz_result(
        &self,
        id: Uuid,
        mana_gain: i64,
        mage_meter: i32,
    ) -> Result<Option<User>, AppError>;

    /// Deletes the user and strips its id from every friend set.
    /// Returns false when the user is absent.
    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError>;

    /// Appends `friend_id` to the user's friend set unless already present.
    async fn add_friend(&self, id: Uuid, friend_id: Uuid) -> Result<Option<User>, AppError>;

    async fn remove_friend(&self, id: Uuid, friend_id: Uuid) -> Result<Option<User>, AppError>;

    async fn insert_score(&self, score: NewScore) -> Result<Score, AppError>;

    /// Ranked page of users joined with their quiz counts. `only` restricts
    /// the candidate set to the given ids.
    async fn leaderboard(
        &self,
        query: &LeaderboardQuery,
        only: Option<&[Uuid]>,
    ) -> Result<Vec<LeaderboardEntry>, AppError>;
}

pub const EMAIL_TAKEN: &str = "Email already in use";
pub const USERNAME_TAKEN: &str = "Username already in use";
