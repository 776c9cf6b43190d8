// src/services/trivia/provider.rs

use std::{fmt, time::Duration};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use crate::models::question::{QuestionQuery, TriviaQuestion};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// `response_code` values of the Open Trivia DB protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    Success,
    NoResults,
    InvalidParameter,
    TokenNotFound,
    TokenEmpty,
    RateLimited,
    Unknown(i64),
}

impl ResponseCode {
    /// Codes that are cured by renewing the session token.
    pub fn needs_new_token(self) -> bool {
        matches!(self, ResponseCode::TokenNotFound | ResponseCode::TokenEmpty)
    }
}

impl From<i64> for ResponseCode {
    fn from(code: i64) -> Self {
        match code {
            0 => ResponseCode::Success,
            1 => ResponseCode::NoResults,
            2 => ResponseCode::InvalidParameter,
            3 => ResponseCode::TokenNotFound,
            4 => ResponseCode::TokenEmpty,
            5 => ResponseCode::RateLimited,
            other => ResponseCode::Unknown(other),
        }
    }
}

/// Answer to a question request that reached the upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub code: ResponseCode,
    pub questions: Vec<TriviaQuestion>,
}

impl FetchOutcome {
    pub fn success(questions: Vec<TriviaQuestion>) -> Self {
        Self {
            code: ResponseCode::Success,
            questions,
        }
    }

    pub fn signal(code: ResponseCode) -> Self {
        Self {
            code,
            questions: Vec::new(),
        }
    }
}

/// The upstream could not be asked, or gave no usable answer.
#[derive(Debug)]
pub enum ProviderError {
    Transport(reqwest::Error),
    Status(u16),
    Rejected(ResponseCode),
    InvalidUrl(url::ParseError),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Transport(e) => write!(f, "trivia request failed: {}", e),
            ProviderError::Status(status) => write!(f, "trivia upstream answered HTTP {}", status),
            ProviderError::Rejected(code) => {
                write!(f, "trivia upstream rejected request: {:?}", code)
            }
            ProviderError::InvalidUrl(e) => write!(f, "invalid trivia endpoint: {}", e),
        }
    }
}

impl std::error::Error for ProviderError {}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Transport(err)
    }
}

impl From<url::ParseError> for ProviderError {
    fn from(err: url::ParseError) -> Self {
        ProviderError::InvalidUrl(err)
    }
}

/// Source of trivia questions and of the session tokens that keep a caller
/// from seeing repeats.
#[async_trait]
pub trait TriviaProvider: Send + Sync {
    async fn request_token(&self) -> Result<String, ProviderError>;

    /// Re-arms an exhausted token; returns the token to use from now on.
    async fn reset_token(&self, token: &str) -> Result<String, ProviderError>;

    async fn fetch_questions(
        &self,
        query: &QuestionQuery,
        amount: usize,
        token: Option<&str>,
    ) -> Result<FetchOutcome, ProviderError>;
}

#[derive(Debug, Deserialize)]
struct QuestionsBody {
    response_code: i64,
    #[serde(default)]
    results: Vec<TriviaQuestion>,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    response_code: i64,
    #[serde(default)]
    token: Option<String>,
}

/// HTTP client for opentdb.com or a compatible server.
#[derive(Clone)]
pub struct OpenTdbClient {
    http: reqwest::Client,
    base_url: Url,
}

impl OpenTdbClient {
    pub fn new(base_url: Url) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, base_url })
    }

    async fn token_command(&self, params: &[(&str, &str)]) -> Result<String, ProviderError> {
        let url = self.base_url.join("api_token.php")?;
        let response = self.http.get(url).query(params).send().await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::Rejected(ResponseCode::RateLimited));
        }
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let body: TokenBody = response.json().await?;
        match (ResponseCode::from(body.response_code), body.token) {
            (ResponseCode::Success, Some(token)) if !token.is_empty() => Ok(token),
            (code, _) => Err(ProviderError::Rejected(code)),
        }
    }
}

#[async_trait]
impl TriviaProvider for OpenTdbClient {
    async fn request_token(&self) -> Result<String, ProviderError> {
        self.token_command(&[("command", "request")]).await
    }

    async fn reset_token(&self, token: &str) -> Result<String, ProviderError> {
        self.token_command(&[("command", "reset"), ("token", token)])
            .await
    }

    async fn fetch_questions(
        &self,
        query: &QuestionQuery,
        amount: usize,
        token: Option<&str>,
    ) -> Result<FetchOutcome, ProviderError> {
        let url = self.base_url.join("api.php")?;

        let mut params: Vec<(&str, String)> = vec![
            ("amount", amount.to_string()),
            ("type", "multiple".to_string()),
        ];
        if let Some(category) = query.category {
            params.push(("category", category.to_string()));
        }
        if let Some(difficulty) = query.difficulty {
            params.push(("difficulty", difficulty.to_string()));
        }
        if let Some(token) = token {
            params.push(("token", token.to_string()));
        }

        let response = self.http.get(url).query(&params).send().await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Ok(FetchOutcome::signal(ResponseCode::RateLimited));
        }
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let body: QuestionsBody = response.json().await?;
        Ok(FetchOutcome {
            code: ResponseCode::from(body.response_code),
            questions: body.results,
        })
    }
}
