// src/repositories/memory.rs

use std::{cmp::Ordering, collections::HashMap};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{EMAIL_TAKEN, ProfileChanges, Repository, USERNAME_TAKEN};
use crate::{
    error::AppError,
    models::{
        leaderboard::{LeaderboardEntry, LeaderboardQuery, SortField, SortOrder},
        score::{NewScore, Score},
        user::{NewUser, User},
    },
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    scores: Vec<Score>,
}

impl Tables {
    /// Enforces the username/email uniqueness the SQL schema guarantees.
    fn check_unique(
        &self,
        except: Option<Uuid>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<(), AppError> {
        let others = self.users.values().filter(|u| Some(u.id) != except);
        for user in others {
            if email == Some(user.email.as_str()) {
                return Err(AppError::BadRequest(EMAIL_TAKEN.to_string()));
            }
            if username == Some(user.username.as_str()) {
                return Err(AppError::BadRequest(USERNAME_TAKEN.to_string()));
            }
        }
        Ok(())
    }
}

/// Process-local store with the same semantics as `PgRepository`.
/// Selected by a `memory://` database URL and used by the test suites.
#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn compare_entries(
    a: &LeaderboardEntry,
    b: &LeaderboardEntry,
    query: &LeaderboardQuery,
) -> Ordering {
    let primary = match query.sort_by {
        SortField::Mana => a.mana.cmp(&b.mana),
        SortField::MageMeter => a.mage_meter.cmp(&b.mage_meter),
    };
    let primary = match query.sort_order {
        SortOrder::Asc => primary,
        SortOrder::Desc => primary.reverse(),
    };
    primary.then_with(|| a.username.cmp(&b.username))
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn insert_user(&self, user: NewUser) -> Result<User, AppError> {
        let mut tables = self.tables.write().await;
        tables.check_unique(None, Some(&user.username), Some(&user.email))?;

        let now = Utc::now();
        let record = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            password: user.password,
            mana: 0,
            mage_meter: 0,
            friends: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, AppError> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = ids
            .iter()
            .filter_map(|id| tables.users.get(id).cloned())
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        users.dedup_by_key(|u| u.id);
        Ok(users)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Option<User>, AppError> {
        let mut tables = self.tables.write().await;
        tables.check_unique(Some(id), changes.username.as_deref(), changes.email.as_deref())?;

        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(username) = changes.username {
            user.username = username;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&id) {
            Some(user) => {
                user.password = password_hash.to_string();
                user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn apply_quiz_result(
        &self,
        id: Uuid,
        mana_gain: i64,
        mage_meter: i32,
    ) -> Result<Option<User>, AppError> {
        let mut tables = self.tables.write().await;
        Ok(tables.users.get_mut(&id).map(|user| {
            user.mana += mana_gain;
            user.mage_meter = mage_meter;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        let now = Utc::now();
        for user in tables.users.values_mut() {
            if user.is_friend(id) {
                user.friends.retain(|friend| *friend != id);
                user.updated_at = now;
            }
        }
        Ok(true)
    }

    async fn add_friend(&self, id: Uuid, friend_id: Uuid) -> Result<Option<User>, AppError> {
        let mut tables = self.tables.write().await;
        Ok(tables.users.get_mut(&id).map(|user| {
            if !user.is_friend(friend_id) {
                user.friends.push(friend_id);
                user.updated_at = Utc::now();
            }
            user.clone()
        }))
    }

    async fn remove_friend(&self, id: Uuid, friend_id: Uuid) -> Result<Option<User>, AppError> {
        let mut tables = self.tables.write().await;
        Ok(tables.users.get_mut(&id).map(|user| {
            user.friends.retain(|friend| *friend != friend_id);
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn insert_score(&self, score: NewScore) -> Result<Score, AppError> {
        let record = Score {
            id: Uuid::new_v4(),
            user_id: score.user_id,
            category: score.category,
            difficulty: score.difficulty.as_str().to_string(),
            question_count: score.question_count,
            correct_answers: score.correct_answers,
            questions: Json(score.questions),
            created_at: Utc::now(),
        };
        self.tables.write().await.scores.push(record.clone());
        Ok(record)
    }

    async fn leaderboard(
        &self,
        query: &LeaderboardQuery,
        only: Option<&[Uuid]>,
    ) -> Result<Vec<LeaderboardEntry>, AppError> {
        let tables = self.tables.read().await;

        let mut quiz_counts: HashMap<Uuid, i64> = HashMap::new();
        for score in &tables.scores {
            *quiz_counts.entry(score.user_id).or_default() += 1;
        }

        let mut entries: Vec<LeaderboardEntry> = tables
            .users
            .values()
            .filter(|user| only.is_none_or(|ids| ids.contains(&user.id)))
            .map(|user| LeaderboardEntry {
                username: user.username.clone(),
                mana: user.mana,
                mage_meter: user.mage_meter,
                total_quizzes: quiz_counts.get(&user.id).copied().unwrap_or(0),
            })
            .collect();

        entries.sort_by(|a, b| compare_entries(a, b, query));

        Ok(entries
            .into_iter()
            .skip(usize::try_from(query.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(query.limit).unwrap_or(0))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::score::Difficulty;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.to_string(),
            email: format!("{}@example.com", name),
            password: "hash".to_string(),
        }
    }

    fn query(sort_by: SortField, sort_order: SortOrder, page: i64, limit: i64) -> LeaderboardQuery {
        LeaderboardQuery {
            sort_by,
            sort_order,
            page,
            limit,
        }
    }

    #[tokio::test]
    async fn duplicate_email_and_username_are_rejected() {
        let repo = MemoryRepository::new();
        repo.insert_user(new_user("alice")).await.unwrap();

        let mut same_email = new_user("bob");
        same_email.email = "alice@example.com".into();
        match repo.insert_user(same_email).await {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, EMAIL_TAKEN),
            other => panic!("unexpected: {:?}", other),
        }

        let mut same_name = new_user("alice");
        same_name.email = "other@example.com".into();
        match repo.insert_user(same_name).await {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, USERNAME_TAKEN),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn leaderboard_sorts_paginates_and_counts_quizzes() {
        let repo = MemoryRepository::new();
        let alice = repo.insert_user(new_user("alice")).await.unwrap();
        let bob = repo.insert_user(new_user("bob")).await.unwrap();
        let carol = repo.insert_user(new_user("carol")).await.unwrap();

        repo.apply_quiz_result(alice.id, 30, 90).await.unwrap();
        repo.apply_quiz_result(bob.id, 50, 40).await.unwrap();
        repo.apply_quiz_result(carol.id, 10, 60).await.unwrap();

        for _ in 0..3 {
            repo.insert_score(NewScore {
                user_id: bob.id,
                category: "General".into(),
                difficulty: Difficulty::Easy,
                question_count: 10,
                correct_answers: 5,
                questions: Vec::new(),
            })
            .await
            .unwrap();
        }

        let by_mana = repo
            .leaderboard(&query(SortField::Mana, SortOrder::Desc, 1, 10), None)
            .await
            .unwrap();
        let names: Vec<_> = by_mana.iter().map(|e| e.username.as_str()).collect();
        assert_eq!(names, ["bob", "alice", "carol"]);
        assert_eq!(by_mana[0].total_quizzes, 3);
        assert_eq!(by_mana[1].total_quizzes, 0);

        let by_meter_asc = repo
            .leaderboard(&query(SortField::MageMeter, SortOrder::Asc, 1, 10), None)
            .await
            .unwrap();
        let names: Vec<_> = by_meter_asc.iter().map(|e| e.username.as_str()).collect();
        assert_eq!(names, ["bob", "carol", "alice"]);

        let second_page = repo
            .leaderboard(&query(SortField::Mana, SortOrder::Desc, 2, 2), None)
            .await
            .unwrap();
        assert_eq!(second_page.len(), 1);
        assert_eq!(second_page[0].username, "carol");
    }

    #[tokio::test]
    async fn leaderboard_respects_restriction() {
        let repo = MemoryRepository::new();
        let alice = repo.insert_user(new_user("alice")).await.unwrap();
        let bob = repo.insert_user(new_user("bob")).await.unwrap();
        let carol = repo.insert_user(new_user("carol")).await.unwrap();
        repo.apply_quiz_result(carol.id, 100, 100).await.unwrap();

        let only = [alice.id, bob.id];
        let rows = repo
            .leaderboard(&query(SortField::Mana, SortOrder::Desc, 1, 10), Some(&only))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|e| e.username != "carol"));
    }

    #[tokio::test]
    async fn ties_break_by_username() {
        let repo = MemoryRepository::new();
        repo.insert_user(new_user("zed")).await.unwrap();
        repo.insert_user(new_user("amy")).await.unwrap();

        let rows = repo
            .leaderboard(&query(SortField::Mana, SortOrder::Desc, 1, 10), None)
            .await
            .unwrap();
        assert_eq!(rows[0].username, "amy");
        assert_eq!(rows[1].username, "zed");
    }

    #[tokio::test]
    async fn deleting_a_user_strips_it_from_friend_sets() {
        let repo = MemoryRepository::new();
        let alice = repo.insert_user(new_user("alice")).await.unwrap();
        let bob = repo.insert_user(new_user("bob")).await.unwrap();

        repo.add_friend(alice.id, bob.id).await.unwrap();
        assert!(repo.delete_user(bob.id).await.unwrap());

        let alice = repo.find_user_by_id(alice.id).await.unwrap().unwrap();
        assert!(alice.friends.is_empty());
        assert!(!repo.delete_user(bob.id).await.unwrap());
    }

    #[tokio::test]
    async fn add_friend_never_duplicates() {
        let repo = MemoryRepository::new();
        let alice = repo.insert_user(new_user("alice")).await.unwrap();
        let bob = repo.insert_user(new_user("bob")).await.unwrap();

        repo.add_friend(alice.id, bob.id).await.unwrap();
        let alice = repo.add_friend(alice.id, bob.id).await.unwrap().unwrap();
        assert_eq!(alice.friends, vec![bob.id]);
    }
}
