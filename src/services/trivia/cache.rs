// src/services/trivia/cache.rs

use std::{collections::HashMap, fmt, time::Duration};

use tokio::{sync::RwLock, time::Instant};

use crate::models::{
    question::{QuestionQuery, TriviaQuestion},
    score::Difficulty,
};

/// Cache slot: one caller asking for one category/difficulty combination.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub partition: String,
    pub category: Option<u32>,
    pub difficulty: Option<Difficulty>,
}

impl CacheKey {
    pub fn new(partition: &str, query: &QuestionQuery) -> Self {
        Self {
            partition: partition.to_string(),
            category: query.category,
            difficulty: query.difficulty,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.partition)?;
        match self.category {
            Some(category) => write!(f, "{}:", category)?,
            None => f.write_str("default:")?,
        }
        match self.difficulty {
            Some(difficulty) => write!(f, "{}", difficulty),
            None => f.write_str("any"),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    questions: Vec<TriviaQuestion>,
    fetched_at: Instant,
}

/// Most recent batch per key. An entry is fresh while younger than `ttl`;
/// stale entries are kept as a degraded answer until replaced.
#[derive(Debug)]
pub struct QuestionCache {
    ttl: Duration,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl QuestionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// The batch for `key` if it is still fresh at `now`.
    pub async fn fresh(&self, key: &CacheKey, now: Instant) -> Option<Vec<TriviaQuestion>> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| {
                !entry.questions.is_empty()
                    && now.saturating_duration_since(entry.fetched_at) < self.ttl
            })
            .map(|entry| entry.questions.clone())
    }

    /// The batch for `key` regardless of age.
    pub async fn any(&self, key: &CacheKey) -> Option<Vec<TriviaQuestion>> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| !entry.questions.is_empty())
            .map(|entry| entry.questions.clone())
    }

    pub async fn store(&self, key: CacheKey, questions: Vec<TriviaQuestion>, now: Instant) {
        self.entries.write().await.insert(
            key,
            CacheEntry {
                questions,
                fetched_at: now,
            },
        );
    }

    /// Drops every entry belonging to `partition`.
    pub async fn forget_partition(&self, partition: &str) {
        self.entries
            .write()
            .await
            .retain(|key, _| key.partition != partition);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(text: &str) -> TriviaQuestion {
        TriviaQuestion {
            category: "General Knowledge".into(),
            difficulty: "easy".into(),
            question: text.into(),
            correct_answer: "yes".into(),
            incorrect_answers: vec!["no".into(), "maybe".into(), "never".into()],
        }
    }

    fn key(partition: &str) -> CacheKey {
        CacheKey::new(partition, &QuestionQuery::default())
    }

    #[test]
    fn key_renders_defaults() {
        assert_eq!(key("u1").to_string(), "u1:default:any");
        let specific = CacheKey::new(
            "u1",
            &QuestionQuery {
                category: Some(9),
                difficulty: Some(Difficulty::Hard),
            },
        );
        assert_eq!(specific.to_string(), "u1:9:hard");
    }

    #[tokio::test]
    async fn entries_expire_after_ttl_but_remain_as_stale() {
        let cache = QuestionCache::new(Duration::from_secs(1800));
        let start = Instant::now();
        cache.store(key("u1"), vec![question("q1")], start).await;

        assert!(cache.fresh(&key("u1"), start + Duration::from_secs(1799)).await.is_some());
        assert!(cache.fresh(&key("u1"), start + Duration::from_secs(1800)).await.is_none());
        assert_eq!(cache.any(&key("u1")).await.unwrap()[0].question, "q1");
    }

    #[tokio::test]
    async fn empty_batches_never_count() {
        let cache = QuestionCache::new(Duration::from_secs(60));
        let now = Instant::now();
        cache.store(key("u1"), Vec::new(), now).await;
        assert!(cache.fresh(&key("u1"), now).await.is_none());
        assert!(cache.any(&key("u1")).await.is_none());
    }

    #[tokio::test]
    async fn forgetting_a_partition_keeps_others() {
        let cache = QuestionCache::new(Duration::from_secs(60));
        let now = Instant::now();
        cache.store(key("u1"), vec![question("a")], now).await;
        cache.store(key("u2"), vec![question("b")], now).await;

        cache.forget_partition("u1").await;
        assert!(cache.any(&key("u1")).await.is_none());
        assert!(cache.any(&key("u2")).await.is_some());
    }
}
