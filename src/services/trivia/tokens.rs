// src/services/trivia/tokens.rs

use std::{collections::HashMap, time::Duration};

use tokio::{sync::Mutex, time::Instant};

/// Upstream session token held for one partition.
#[derive(Debug, Clone)]
pub struct SessionToken {
    pub token: String,
    pub expires_at: Instant,
    /// Start of the most recent (or reserved) upstream request.
    pub last_request: Option<Instant>,
}

impl SessionToken {
    pub fn is_valid(&self, now: Instant) -> bool {
        !self.token.is_empty() && now < self.expires_at
    }
}

/// Session tokens per partition, plus request pacing.
#[derive(Debug)]
pub struct TokenTable {
    ttl: Duration,
    min_interval: Duration,
    tokens: Mutex<HashMap<String, SessionToken>>,
}

impl TokenTable {
    pub fn new(ttl: Duration, min_interval: Duration) -> Self {
        Self {
            ttl,
            min_interval,
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// The partition's token if it is still usable at `now`.
    pub async fn current(&self, partition: &str, now: Instant) -> Option<String> {
        let tokens = self.tokens.lock().await;
        tokens
            .get(partition)
            .filter(|t| t.is_valid(now))
            .map(|t| t.token.clone())
    }

    /// Installs a token, keeping the partition's pacing history.
    pub async fn store(&self, partition: &str, token: String, now: Instant) {
        let mut tokens = self.tokens.lock().await;
        let expires_at = now + self.ttl;
        tokens
            .entry(partition.to_string())
            .and_modify(|t| {
                t.token = token.clone();
                t.expires_at = expires_at;
            })
            .or_insert(SessionToken {
                token,
                expires_at,
                last_request: None,
            });
    }

    /// Reserves the next request slot for `partition` and returns how long
    /// the caller must wait before using it. Using a token extends its life.
    pub async fn reserve_slot(&self, partition: &str, now: Instant) -> Duration {
        let mut tokens = self.tokens.lock().await;
        let Some(entry) = tokens.get_mut(partition) else {
            return Duration::ZERO;
        };

        let slot = match entry.last_request {
            Some(last) => (last + self.min_interval).max(now),
            None => now,
        };
        entry.last_request = Some(slot);
        entry.expires_at = slot + self.ttl;
        slot.saturating_duration_since(now)
    }
}
