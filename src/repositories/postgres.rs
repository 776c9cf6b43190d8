// src/repositories/postgres.rs

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{PgPool, postgres::PgPoolOptions, types::Json};
use uuid::Uuid;

use super::{EMAIL_TAKEN, ProfileChanges, Repository, USERNAME_TAKEN};
use crate::{
    error::AppError,
    models::{
        leaderboard::{LeaderboardEntry, LeaderboardQuery},
        score::{NewScore, Score},
        user::{NewUser, User},
    },
};

const USER_COLUMNS: &str =
    "id, username, email, password, mana, mage_meter, friends, created_at, updated_at";

const SCORE_COLUMNS: &str =
    "id, user_id, category, difficulty, question_count, correct_answers, questions, created_at";

const CONNECT_ATTEMPTS: u32 = 5;

#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects with retry, then applies the embedded migrations.
    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let mut retry_count = 0;
        let pool = loop {
            match PgPoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Duration::from_secs(3))
                .connect(database_url)
                .await
            {
                Ok(pool) => break pool,
                Err(e) => {
                    retry_count += 1;
                    if retry_count >= CONNECT_ATTEMPTS {
                        return Err(AppError::InternalServerError(format!(
                            "Failed to connect to database after {} attempts: {}",
                            CONNECT_ATTEMPTS, e
                        )));
                    }
                    tracing::warn!(
                        "Database not ready, retrying in 2s... (Attempt {})",
                        retry_count
                    );
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        };
        tracing::info!("Database connected...");

        tracing::info!("Running migrations...");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        tracing::info!("Migrations applied successfully.");

        Ok(Self::new(pool))
    }
}

/// Maps unique-constraint violations on `users` to the duplicate messages.
fn map_unique_violation(err: sqlx::Error) -> AppError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.is_unique_violation() {
            return match db_err.constraint() {
                Some("users_email_key") => AppError::BadRequest(EMAIL_TAKEN.to_string()),
                Some("users_username_key") => AppError::BadRequest(USERNAME_TAKEN.to_string()),
                _ => AppError::BadRequest(db_err.message().to_string()),
            };
        }
    }
    tracing::error!("User write failed: {:?}", err);
    AppError::from(err)
}

#[async_trait]
impl Repository for PgRepository {
    async fn insert_user(&self, user: NewUser) -> Result<User, AppError> {
        let sql = format!(
            "INSERT INTO users (id, username, email, password) VALUES ($1, $2, $3, $4) RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password)
            .fetch_one(&self.pool)
            .await
            .map_err(map_unique_violation)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {} FROM users WHERE id = ANY($1) ORDER BY username",
            USER_COLUMNS
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Option<User>, AppError> {
        let sql = format!(
            r#"
            UPDATE users
            SET username = COALESCE($2, username),
                email = COALESCE($3, email),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(changes.username)
            .bind(changes.email)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_unique_violation)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool, AppError> {
        let result =
            sqlx::query("UPDATE users SET password = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn apply_quiz_result(
        &self,
        id: Uuid,
        mana_gain: i64,
        mage_meter: i32,
    ) -> Result<Option<User>, AppError> {
        let sql = format!(
            r#"
            UPDATE users
            SET mana = mana + $2, mage_meter = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(mana_gain)
            .bind(mage_meter)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError> {
        let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Ok(false);
        }

        // Not transactional: a crash here leaves dangling ids, which friend
        // reads skip anyway.
        sqlx::query(
            "UPDATE users SET friends = array_remove(friends, $1), updated_at = NOW() WHERE $1 = ANY(friends)",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(true)
    }

    async fn add_friend(&self, id: Uuid, friend_id: Uuid) -> Result<Option<User>, AppError> {
        let sql = format!(
            r#"
            UPDATE users
            SET friends = CASE WHEN $2 = ANY(friends) THEN friends ELSE array_append(friends, $2) END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(friend_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn remove_friend(&self, id: Uuid, friend_id: Uuid) -> Result<Option<User>, AppError> {
        let sql = format!(
            r#"
            UPDATE users
            SET friends = array_remove(friends, $2), updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(friend_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_score(&self, score: NewScore) -> Result<Score, AppError> {
        let sql = format!(
            r#"
            INSERT INTO scores (id, user_id, category, difficulty, question_count, correct_answers, questions)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            SCORE_COLUMNS
        );
        sqlx::query_as::<_, Score>(&sql)
            .bind(Uuid::new_v4())
            .bind(score.user_id)
            .bind(&score.category)
            .bind(score.difficulty.as_str())
            .bind(score.question_count)
            .bind(score.correct_answers)
            .bind(Json(&score.questions))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to insert score: {:?}", e);
                AppError::from(e)
            })
    }

    async fn leaderboard(
        &self,
        query: &LeaderboardQuery,
        only: Option<&[Uuid]>,
    ) -> Result<Vec<LeaderboardEntry>, AppError> {
        // Sort column and direction come from closed enums, never from input.
        let sql = format!(
            r#"
            SELECT
                u.username,
                u.mana,
                u.mage_meter,
                COUNT(s.id) AS total_quizzes
            FROM users u
            LEFT JOIN scores s ON s.user_id = u.id
            WHERE ($1::UUID[] IS NULL OR u.id = ANY($1))
            GROUP BY u.id
            ORDER BY {} {}, u.username ASC
            LIMIT $2 OFFSET $3
            "#,
            query.sort_by.column(),
            query.sort_order.keyword()
        );

        Ok(sqlx::query_as::<_, LeaderboardEntry>(&sql)
            .bind(only.map(<[Uuid]>::to_vec))
            .bind(query.limit)
            .bind(query.offset())
            .fetch_all(&self.pool)
            .await?)
    }
}
