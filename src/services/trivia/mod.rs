// src/services/trivia/mod.rs

//! Trivia question acquisition.
//!
//! `TriviaService` answers every request with a batch of questions and never
//! fails: upstream problems degrade to a cached batch or to the local
//! fallback bank. Process-wide state (cache, session tokens, failure
//! counter) lives inside the service, which is built once at startup and
//! shared through the application state.

pub mod backoff;
pub mod cache;
pub mod fallback;
pub mod provider;
pub mod tokens;

use std::{sync::Arc, time::Duration};

use tokio::{sync::Mutex, time::Instant};

use crate::models::question::{QuestionQuery, TriviaQuestion};

use self::{
    backoff::Backoff,
    cache::{CacheKey, QuestionCache},
    provider::{FetchOutcome, ProviderError, ResponseCode, TriviaProvider},
    tokens::TokenTable,
};

/// Questions per quiz.
pub const BATCH_SIZE: usize = 10;

/// Timing knobs of the pipeline.
#[derive(Debug, Clone)]
pub struct TriviaSettings {
    pub cache_ttl: Duration,
    pub min_request_interval: Duration,
    pub token_ttl: Duration,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
}

impl Default for TriviaSettings {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(30 * 60),
            min_request_interval: Duration::from_secs(2),
            token_ttl: Duration::from_secs(6 * 60 * 60),
            backoff_base: Duration::from_secs(1),
            backoff_cap: Duration::from_secs(30),
        }
    }
}

/// Where a batch came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchSource {
    Upstream,
    Cache,
    StaleCache,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct QuestionBatch {
    pub questions: Vec<TriviaQuestion>,
    pub source: BatchSource,
}

impl QuestionBatch {
    fn fallback() -> Self {
        Self {
            questions: fallback::fallback_questions(BATCH_SIZE),
            source: BatchSource::Fallback,
        }
    }
}

pub struct TriviaService {
    provider: Arc<dyn TriviaProvider>,
    cache: QuestionCache,
    tokens: TokenTable,
    backoff: Mutex<Backoff>,
}

impl TriviaService {
    pub fn new(provider: Arc<dyn TriviaProvider>) -> Self {
        Self::with_settings(provider, TriviaSettings::default())
    }

    pub fn with_settings(provider: Arc<dyn TriviaProvider>, settings: TriviaSettings) -> Self {
        Self {
            provider,
            cache: QuestionCache::new(settings.cache_ttl),
            tokens: TokenTable::new(settings.token_ttl, settings.min_request_interval),
            backoff: Mutex::new(Backoff::new(settings.backoff_base, settings.backoff_cap)),
        }
    }

    /// A batch of questions for `partition` (the caller's identity).
    pub async fn questions(&self, partition: &str, query: QuestionQuery) -> QuestionBatch {
        let key = CacheKey::new(partition, &query);

        {
            let backoff = self.backoff.lock().await;
            if backoff.is_active(Instant::now()) {
                tracing::debug!(
                    "Trivia upstream cooling down after {} failures, serving fallback for {}",
                    backoff.failures(),
                    key
                );
                return QuestionBatch::fallback();
            }
        }

        if let Some(questions) = self.cache.fresh(&key, Instant::now()).await {
            return QuestionBatch {
                questions,
                source: BatchSource::Cache,
            };
        }

        match self.fetch_upstream(partition, &query).await {
            Ok(outcome)
                if outcome.code == ResponseCode::Success && outcome.questions.len() >= BATCH_SIZE =>
            {
                let mut questions = outcome.questions;
                questions.truncate(BATCH_SIZE);
                self.backoff.lock().await.reset();
                self.cache
                    .store(key, questions.clone(), Instant::now())
                    .await;
                QuestionBatch {
                    questions,
                    source: BatchSource::Upstream,
                }
            }
            Ok(outcome) if outcome.code == ResponseCode::RateLimited => {
                self.record_failure().await;
                tracing::warn!("Trivia upstream rate limited {}, serving fallback", key);
                QuestionBatch::fallback()
            }
            Ok(outcome) => {
                tracing::warn!(
                    "Trivia upstream answered {:?} with {} questions for {}",
                    outcome.code,
                    outcome.questions.len(),
                    key
                );
                self.cached_or_fallback(&key).await
            }
            Err(ProviderError::Rejected(ResponseCode::RateLimited)) => {
                self.record_failure().await;
                tracing::warn!("Trivia upstream rate limited {}, serving fallback", key);
                QuestionBatch::fallback()
            }
            Err(e) => {
                self.record_failure().await;
                tracing::warn!("Trivia upstream unavailable for {}: {}", key, e);
                self.cached_or_fallback(&key).await
            }
        }
    }

    /// Drops cached batches of `partition` so its next quiz is fresh.
    pub async fn forget(&self, partition: &str) {
        self.cache.forget_partition(partition).await;
    }

    /// Consecutive upstream failures currently on record.
    pub async fn consecutive_failures(&self) -> u32 {
        self.backoff.lock().await.failures()
    }

    async fn record_failure(&self) {
        self.backoff.lock().await.record_failure(Instant::now());
    }

    async fn cached_or_fallback(&self, key: &CacheKey) -> QuestionBatch {
        match self.cache.any(key).await {
            Some(questions) => {
                tracing::info!("Serving previously cached questions for {}", key);
                QuestionBatch {
                    questions,
                    source: BatchSource::StaleCache,
                }
            }
            None => QuestionBatch::fallback(),
        }
    }

    /// One upstream question request, renewing the session token and
    /// retrying once when the upstream reports it unusable.
    async fn fetch_upstream(
        &self,
        partition: &str,
        query: &QuestionQuery,
    ) -> Result<FetchOutcome, ProviderError> {
        let token = self.session_token(partition).await?;
        let outcome = self.paced_fetch(partition, query, &token).await?;
        if !outcome.code.needs_new_token() {
            return Ok(outcome);
        }

        tracing::info!(
            "Trivia session token of {} needs renewal ({:?})",
            partition,
            outcome.code
        );
        let token = match outcome.code {
            ResponseCode::TokenEmpty => self.provider.reset_token(&token).await?,
            _ => self.provider.request_token().await?,
        };
        self.tokens
            .store(partition, token.clone(), Instant::now())
            .await;
        self.paced_fetch(partition, query, &token).await
    }

    async fn session_token(&self, partition: &str) -> Result<String, ProviderError> {
        if let Some(token) = self.tokens.current(partition, Instant::now()).await {
            return Ok(token);
        }
        let token = self.provider.request_token().await?;
        self.tokens
            .store(partition, token.clone(), Instant::now())
            .await;
        Ok(token)
    }

    async fn paced_fetch(
        &self,
        partition: &str,
        query: &QuestionQuery,
        token: &str,
    ) -> Result<FetchOutcome, ProviderError> {
        let wait = self.tokens.reserve_slot(partition, Instant::now()).await;
        if !wait.is_zero() {
            tracing::debug!("Pacing trivia request of {} by {:?}", partition, wait);
            tokio::time::sleep(wait).await;
        }
        self.provider
            .fetch_questions(query, BATCH_SIZE, Some(token))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{ScriptedProvider, sample_questions};

    fn service(provider: &Arc<ScriptedProvider>) -> TriviaService {
        TriviaService::new(provider.clone())
    }

    #[tokio::test(start_paused = true)]
    async fn first_request_goes_upstream_then_hits_cache() {
        let provider = Arc::new(ScriptedProvider::new());
        let trivia = service(&provider);

        let first = trivia.questions("alice", QuestionQuery::default()).await;
        assert_eq!(first.source, BatchSource::Upstream);
        assert_eq!(first.questions.len(), BATCH_SIZE);

        let second = trivia.questions("alice", QuestionQuery::default()).await;
        assert_eq!(second.source, BatchSource::Cache);
        assert_eq!(second.questions, first.questions);
        assert_eq!(provider.fetch_calls(), 1);
        assert_eq!(provider.token_requests(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cache_expires_after_thirty_minutes() {
        let provider = Arc::new(ScriptedProvider::new());
        let trivia = service(&provider);

        trivia.questions("alice", QuestionQuery::default()).await;
        tokio::time::advance(Duration::from_secs(30 * 60)).await;

        let batch = trivia.questions("alice", QuestionQuery::default()).await;
        assert_eq!(batch.source, BatchSource::Upstream);
        assert_eq!(provider.fetch_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cache_is_per_caller_and_per_hint() {
        let provider = Arc::new(ScriptedProvider::new());
        let trivia = service(&provider);

        trivia.questions("alice", QuestionQuery::default()).await;
        let bob = trivia.questions("bob", QuestionQuery::default()).await;
        assert_eq!(bob.source, BatchSource::Upstream);

        let hard = QuestionQuery {
            category: None,
            difficulty: Some(crate::models::score::Difficulty::Hard),
        };
        let alice_hard = trivia.questions("alice", hard).await;
        assert_eq!(alice_hard.source, BatchSource::Upstream);
        assert_eq!(provider.fetch_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn forgetting_a_caller_forces_a_new_batch() {
        let provider = Arc::new(ScriptedProvider::new());
        let trivia = service(&provider);

        trivia.questions("alice", QuestionQuery::default()).await;
        trivia.forget("alice").await;

        let batch = trivia.questions("alice", QuestionQuery::default()).await;
        assert_eq!(batch.source, BatchSource::Upstream);
    }

    #[tokio::test(start_paused = true)]
    async fn consecutive_requests_are_spaced_two_seconds_apart() {
        let provider = Arc::new(ScriptedProvider::new());
        let trivia = service(&provider);

        let start = Instant::now();
        trivia.questions("alice", QuestionQuery::default()).await;
        trivia.forget("alice").await;
        trivia.questions("alice", QuestionQuery::default()).await;

        assert!(start.elapsed() >= Duration::from_secs(2));
        assert_eq!(provider.fetch_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_token_is_reset_and_request_retried_once() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.push(Ok(FetchOutcome::signal(ResponseCode::TokenEmpty)));
        let trivia = service(&provider);

        let batch = trivia.questions("alice", QuestionQuery::default()).await;
        assert_eq!(batch.source, BatchSource::Upstream);
        assert_eq!(provider.token_resets(), 1);
        assert_eq!(provider.fetch_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_token_is_replaced_with_a_new_one() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.push(Ok(FetchOutcome::signal(ResponseCode::TokenNotFound)));
        let trivia = service(&provider);

        let batch = trivia.questions("alice", QuestionQuery::default()).await;
        assert_eq!(batch.source, BatchSource::Upstream);
        assert_eq!(provider.token_requests(), 2);
        assert_eq!(provider.token_resets(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn token_renewal_is_attempted_only_once() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.push(Ok(FetchOutcome::signal(ResponseCode::TokenEmpty)));
        provider.push(Ok(FetchOutcome::signal(ResponseCode::TokenEmpty)));
        let trivia = service(&provider);

        let batch = trivia.questions("alice", QuestionQuery::default()).await;
        assert_eq!(batch.source, BatchSource::Fallback);
        assert_eq!(provider.fetch_calls(), 2);
        assert_eq!(trivia.consecutive_failures().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_counts_as_failure_and_serves_fallback() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.push(Ok(FetchOutcome::signal(ResponseCode::RateLimited)));
        let trivia = service(&provider);

        let batch = trivia.questions("alice", QuestionQuery::default()).await;
        assert_eq!(batch.source, BatchSource::Fallback);
        assert_eq!(batch.questions.len(), BATCH_SIZE);
        assert_eq!(trivia.consecutive_failures().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn other_signals_prefer_a_stale_batch() {
        let provider = Arc::new(ScriptedProvider::new());
        let trivia = service(&provider);

        let live = trivia.questions("alice", QuestionQuery::default()).await;
        tokio::time::advance(Duration::from_secs(31 * 60)).await;

        provider.push(Ok(FetchOutcome::signal(ResponseCode::NoResults)));
        let batch = trivia.questions("alice", QuestionQuery::default()).await;
        assert_eq!(batch.source, BatchSource::StaleCache);
        assert_eq!(batch.questions, live.questions);
        assert_eq!(trivia.consecutive_failures().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn short_batches_are_not_served() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.push(Ok(FetchOutcome::success(sample_questions(3, "short"))));
        let trivia = service(&provider);

        let batch = trivia.questions("alice", QuestionQuery::default()).await;
        assert_eq!(batch.source, BatchSource::Fallback);
        assert_eq!(batch.questions.len(), BATCH_SIZE);
    }

    #[tokio::test(start_paused = true)]
    async fn outage_backs_off_then_recovers() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.set_offline(true);
        let trivia = service(&provider);

        // Each attempt waits out the previous window, so each one fails upstream.
        for (attempt, window) in [(1u32, 1u64), (2, 2)] {
            let batch = trivia.questions("alice", QuestionQuery::default()).await;
            assert_eq!(batch.source, BatchSource::Fallback);
            assert_eq!(trivia.consecutive_failures().await, attempt);
            tokio::time::advance(Duration::from_secs(window)).await;
        }
        let batch = trivia.questions("alice", QuestionQuery::default()).await;
        assert_eq!(batch.source, BatchSource::Fallback);
        assert_eq!(trivia.consecutive_failures().await, 3);
        let token_requests = provider.token_requests();

        // Inside the 4s window nothing reaches the upstream, even once it is back.
        provider.set_offline(false);
        tokio::time::advance(Duration::from_secs(3)).await;
        let batch = trivia.questions("alice", QuestionQuery::default()).await;
        assert_eq!(batch.source, BatchSource::Fallback);
        assert_eq!(provider.token_requests(), token_requests);

        tokio::time::advance(Duration::from_secs(1)).await;
        let batch = trivia.questions("alice", QuestionQuery::default()).await;
        assert_eq!(batch.source, BatchSource::Upstream);
        assert_eq!(trivia.consecutive_failures().await, 0);
    }
}
