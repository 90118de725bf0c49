use crate::error::AppError;
use crate::models::{topic_catalog, Difficulty, Question, QuizResult, Topic};
use crate::session::{BookmarkCoordinator, QuizSession, SessionPhase};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

fn request_id_from_headers(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

fn lookup_session(
    state: &AppState,
    session_id: &str,
    req_id: &str,
) -> Result<Arc<Mutex<QuizSession>>, AppError> {
    state
        .sessions
        .get(session_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| {
            AppError::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "session not found",
                req_id,
            )
        })
}

async fn bookmarked_ids(state: &AppState) -> HashSet<String> {
    match state.identity.current_user_id() {
        Some(user_id) => state
            .bookmarks
            .list_by_user(&user_id)
            .await
            .into_iter()
            .map(|q| q.id)
            .collect(),
        None => HashSet::new(),
    }
}

pub async fn list_topics() -> Json<Vec<Topic>> {
    Json(topic_catalog())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCreated {
    pub session_id: String,
}

pub async fn create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<SessionCreated>) {
    let session_id = uuid::Uuid::new_v4().to_string();
    state
        .sessions
        .insert(session_id.clone(), Arc::new(Mutex::new(QuizSession::new())));
    info!(%session_id, "quiz session created");
    (StatusCode::CREATED, Json(SessionCreated { session_id }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartQuizPayload {
    pub topic: String,
    pub question_count: usize,
    pub difficulty: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartQuizResponse {
    pub questions: Vec<Question>,
    pub used_fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

pub async fn start_quiz(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<StartQuizPayload>,
) -> Result<Json<StartQuizResponse>, AppError> {
    let req_id = request_id_from_headers(&headers);
    if payload.topic.trim().is_empty() {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            "topic must not be empty",
            req_id,
        ));
    }
    if payload.question_count == 0 {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            "questionCount must be at least 1",
            req_id,
        ));
    }
    let session = lookup_session(&state, &session_id, &req_id)?;
    let difficulty = Difficulty::from(payload.difficulty);

    // The session lock is not held across the generation call, so state
    // reads stay responsive while the model works.
    let seq = session
        .lock()
        .await
        .begin_generation(&payload.topic, difficulty.clone());

    let bookmarked = bookmarked_ids(&state).await;
    let outcome = state
        .generator
        .generate(&payload.topic, payload.question_count, &difficulty, &bookmarked)
        .await;

    let applied = session.lock().await.complete_generation(seq, outcome.clone());
    if !applied {
        return Err(AppError::new(
            StatusCode::CONFLICT,
            "SUPERSEDED",
            "a newer generation request replaced this one",
            req_id,
        ));
    }

    Ok(Json(StartQuizResponse {
        questions: outcome.questions,
        used_fallback: outcome.used_fallback,
        error_message: outcome.error_message,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub phase: SessionPhase,
    pub is_loading: bool,
    pub current_index: usize,
    pub selected_answers: HashMap<usize, usize>,
    pub questions: Vec<Question>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<SessionView>, AppError> {
    let req_id = request_id_from_headers(&headers);
    let session = lookup_session(&state, &session_id, &req_id)?;
    let session = session.lock().await;
    Ok(Json(SessionView {
        phase: session.phase(),
        is_loading: session.is_loading(),
        current_index: session.current_index(),
        selected_answers: session.selected_answers().clone(),
        questions: session.questions().to_vec(),
        last_error: session.last_error().map(|s| s.to_string()),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectAnswerPayload {
    pub question_index: usize,
    pub option_index: usize,
}

pub async fn select_answer(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<SelectAnswerPayload>,
) -> Result<StatusCode, AppError> {
    let req_id = request_id_from_headers(&headers);
    let session = lookup_session(&state, &session_id, &req_id)?;
    session
        .lock()
        .await
        .select_answer(payload.question_index, payload.option_index)
        .map_err(|err| AppError::from_quiz_error(&err, req_id))?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct NavigatePayload {
    pub delta: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateResponse {
    pub current_index: usize,
}

pub async fn navigate(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<NavigatePayload>,
) -> Result<Json<NavigateResponse>, AppError> {
    let req_id = request_id_from_headers(&headers);
    let session = lookup_session(&state, &session_id, &req_id)?;
    let current_index = session
        .lock()
        .await
        .navigate(payload.delta)
        .map_err(|err| AppError::from_quiz_error(&err, req_id))?;
    Ok(Json(NavigateResponse { current_index }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleBookmarkPayload {
    pub question_index: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleBookmarkResponse {
    pub is_bookmarked: bool,
}

pub async fn toggle_bookmark(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<ToggleBookmarkPayload>,
) -> Result<Json<ToggleBookmarkResponse>, AppError> {
    let req_id = request_id_from_headers(&headers);
    let session = lookup_session(&state, &session_id, &req_id)?;
    let coordinator = BookmarkCoordinator::new(state.bookmarks.clone(), state.identity.clone());
    let is_bookmarked = session
        .lock()
        .await
        .toggle_bookmark(payload.question_index, &coordinator)
        .await
        .map_err(|err| AppError::from_quiz_error(&err, req_id))?;
    Ok(Json(ToggleBookmarkResponse { is_bookmarked }))
}

pub async fn submit(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<QuizResult>, AppError> {
    let req_id = request_id_from_headers(&headers);
    let session = lookup_session(&state, &session_id, &req_id)?;
    let user_id = state.identity.current_user_id();
    let result = session
        .lock()
        .await
        .submit(user_id.as_deref())
        .map_err(|err| AppError::from_quiz_error(&err, req_id))?;

    // Fire-and-forget: a failed history save never alters the result the
    // caller already holds.
    if user_id.is_some() {
        let history = state.history.clone();
        let record = result.clone();
        tokio::spawn(async move {
            if let Err(err) = history.save(record).await {
                warn!(%err, "failed to save quiz result to history");
            }
        });
    }

    info!(%session_id, score = result.score, total = result.total_questions, "quiz submitted");
    Ok(Json(result))
}

pub async fn list_bookmarks(State(state): State<AppState>) -> Json<Vec<Question>> {
    match state.identity.current_user_id() {
        Some(user_id) => Json(state.bookmarks.list_by_user(&user_id).await),
        None => Json(Vec::new()),
    }
}

pub async fn list_history(State(state): State<AppState>) -> Json<Vec<QuizResult>> {
    match state.identity.current_user_id() {
        Some(user_id) => Json(state.history.list_by_user(&user_id).await),
        None => Json(Vec::new()),
    }
}
