use crate::handlers;
use crate::state::AppState;
use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
            axum::http::HeaderName::from_static("x-request-id"),
        ]);

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/v1/topics", get(handlers::list_topics))
        .route("/api/v1/sessions", post(handlers::create_session))
        .route("/api/v1/sessions/:id", get(handlers::get_session))
        .route("/api/v1/sessions/:id/start", post(handlers::start_quiz))
        .route("/api/v1/sessions/:id/answers", post(handlers::select_answer))
        .route("/api/v1/sessions/:id/navigate", post(handlers::navigate))
        .route(
            "/api/v1/sessions/:id/bookmarks",
            post(handlers::toggle_bookmark),
        )
        .route("/api/v1/sessions/:id/submit", post(handlers::submit))
        .route("/api/v1/bookmarks", get(handlers::list_bookmarks))
        .route("/api/v1/history", get(handlers::list_history))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
