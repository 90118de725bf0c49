pub mod error;
pub mod fallback;
pub mod generation;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod session;
pub mod state;

use std::sync::Arc;

pub fn build_state() -> state::AppState {
    let ai_client: Arc<dyn state::GenerationClient> =
        if let Some(real) = state::GeminiClient::from_env() {
            Arc::new(real)
        } else {
            Arc::new(state::MockGenerationClient)
        };
    state::AppState::new(
        ai_client,
        Arc::new(state::InMemoryBookmarkStore::default()),
        Arc::new(state::InMemoryHistoryStore::default()),
        Arc::new(state::EnvIdentity::from_env()),
    )
}
