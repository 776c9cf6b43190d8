use std::sync::Arc;

use axum::extract::FromRef;

use crate::{config::Config, repositories::DynRepository, services::trivia::TriviaService};

#[derive(Clone)]
pub struct AppState {
    pub repo: DynRepository,
    pub config: Config,
    pub trivia: Arc<TriviaService>,
}

impl FromRef<AppState> for DynRepository {
    fn from_ref(state: &AppState) -> Self {
        state.repo.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<TriviaService> {
    fn from_ref(state: &AppState) -> Self {
        state.trivia.clone()
    }
}
