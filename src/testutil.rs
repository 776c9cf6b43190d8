// src/testutil.rs

//! Shared test helpers, used by unit tests and by the integration tests
//! under `tests/`.

use std::{
    collections::VecDeque,
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    config::{Config, parse_base_url},
    models::question::{QuestionQuery, TriviaQuestion},
    repositories::{DynRepository, MemoryRepository},
    routes::create_router,
    services::trivia::{
        TriviaService, TriviaSettings,
        provider::{FetchOutcome, ProviderError, TriviaProvider},
    },
    state::AppState,
};

/// `count` distinct questions whose text carries `tag`.
pub fn sample_questions(count: usize, tag: &str) -> Vec<TriviaQuestion> {
    (0..count)
        .map(|i| TriviaQuestion {
            category: "General Knowledge".to_string(),
            difficulty: "easy".to_string(),
            question: format!("{} question #{}?", tag, i + 1),
            correct_answer: format!("{}-right-{}", tag, i + 1),
            incorrect_answers: vec![
                format!("{}-wrong-a-{}", tag, i + 1),
                format!("{}-wrong-b-{}", tag, i + 1),
                format!("{}-wrong-c-{}", tag, i + 1),
            ],
        })
        .collect()
}

/// In-process `TriviaProvider` with queued answers.
///
/// Fetches pop queued outcomes first; with an empty queue every fetch
/// succeeds with a full batch. While offline, every call fails as if the
/// upstream answered HTTP 503.
#[derive(Default)]
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<FetchOutcome, ProviderError>>>,
    offline: AtomicBool,
    fetches: AtomicUsize,
    token_requests: AtomicUsize,
    token_resets: AtomicUsize,
    issued: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, outcome: Result<FetchOutcome, ProviderError>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(outcome);
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn token_requests(&self) -> usize {
        self.token_requests.load(Ordering::SeqCst)
    }

    pub fn token_resets(&self) -> usize {
        self.token_resets.load(Ordering::SeqCst)
    }

    fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    fn next_token(&self) -> String {
        format!("token-{}", self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait]
impl TriviaProvider for ScriptedProvider {
    async fn request_token(&self) -> Result<String, ProviderError> {
        self.token_requests.fetch_add(1, Ordering::SeqCst);
        if self.is_offline() {
            return Err(ProviderError::Status(503));
        }
        Ok(self.next_token())
    }

    async fn reset_token(&self, _token: &str) -> Result<String, ProviderError> {
        self.token_resets.fetch_add(1, Ordering::SeqCst);
        if self.is_offline() {
            return Err(ProviderError::Status(503));
        }
        Ok(self.next_token())
    }

    async fn fetch_questions(
        &self,
        _query: &QuestionQuery,
        amount: usize,
        _token: Option<&str>,
    ) -> Result<FetchOutcome, ProviderError> {
        let call = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
        if self.is_offline() {
            return Err(ProviderError::Status(503));
        }

        let scripted = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match scripted {
            Some(outcome) => outcome,
            None => Ok(FetchOutcome::success(sample_questions(
                amount,
                &format!("batch{}", call),
            ))),
        }
    }
}

/// A `Config` for the in-process store; nothing is read from the environment.
pub fn test_config() -> Config {
    Config {
        database_url: "memory://".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        port: 0,
        rust_log: "error".to_string(),
        trivia_api_url: parse_base_url("http://127.0.0.1:9/").unwrap(),
        cors_origins: vec!["http://localhost:5173".to_string()],
    }
}

/// A running server over fresh in-memory state.
pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub repo: DynRepository,
    pub provider: Arc<ScriptedProvider>,
    pub trivia: Arc<TriviaService>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }
}

/// Spawns the app on a random port.
///
/// Request pacing is disabled so tests do not sleep between quizzes.
pub async fn spawn_app() -> TestApp {
    let repo: DynRepository = Arc::new(MemoryRepository::new());
    let provider = Arc::new(ScriptedProvider::new());
    let settings = TriviaSettings {
        min_request_interval: Duration::ZERO,
        ..TriviaSettings::default()
    };
    let trivia = Arc::new(TriviaService::with_settings(provider.clone(), settings));

    let state = AppState {
        repo: repo.clone(),
        config: test_config(),
        trivia: trivia.clone(),
    };
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::builder().no_proxy().build().unwrap(),
        repo,
        provider,
        trivia,
    }
}
