// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, leaderboard, quiz, user},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, user, quiz, leaderboard) under `/api`.
/// * Protected routes go through `auth_middleware`.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let user_routes = Router::new()
        .route("/stats/{user_id}", get(user::get_stats))
        // Protected user routes
        .merge(
            Router::new()
                .route(
                    "/me",
                    get(user::get_me).put(user::update_me).delete(user::delete_me),
                )
                .route("/change-password", post(user::change_password))
                .route(
                    "/friends",
                    get(user::list_friends)
                        .post(user::add_friend)
                        .delete(user::remove_friend),
                )
                .route_layer(auth.clone()),
        );

    let quiz_routes = Router::new()
        .route("/", get(quiz::get_questions))
        .route("/submit", post(quiz::submit_score))
        .route_layer(auth.clone());

    let leaderboard_routes = Router::new()
        .route("/global", get(leaderboard::global))
        .merge(
            Router::new()
                .route("/friends", get(leaderboard::friends))
                .route_layer(auth),
        );

    Router::new()
        .route("/", get(|| async { "Welcome to Quizzard Backend" }))
        .nest("/api/auth", auth_routes)
        .nest("/api/user", user_routes)
        .nest("/api/quiz", quiz_routes)
        .nest("/api/leaderboard", leaderboard_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
