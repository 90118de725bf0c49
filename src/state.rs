use crate::generation::QuestionGenerator;
use crate::models::{Question, QuizResult};
use crate::session::QuizSession;
use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// One-shot text completion. No retry lives behind this seam; timeout policy
/// belongs to the implementation.
pub trait GenerationClient: Send + Sync {
    fn generate_text(&self, prompt: &str) -> BoxFuture<'static, anyhow::Result<String>>;
}

/// Deterministic stand-in used when no Gemini credentials are configured.
/// Returns a small valid payload so local runs exercise the real parse path.
#[derive(Clone)]
pub struct MockGenerationClient;

impl GenerationClient for MockGenerationClient {
    fn generate_text(&self, _prompt: &str) -> BoxFuture<'static, anyhow::Result<String>> {
        Box::pin(async move {
            let payload = serde_json::json!([
                {
                    "question": "Which option is marked correct in this mock payload?",
                    "options": ["The first", "The second", "The third", "The fourth"],
                    "correctAnswer": 0,
                    "explanation": "The mock client always marks the first option"
                },
                {
                    "question": "Where does this question come from?",
                    "options": ["Gemini", "A database", "The mock client", "A cache"],
                    "correctAnswer": 2
                }
            ]);
            Ok(payload.to_string())
        })
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    http: reqwest::Client,
}

impl GeminiClient {
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|v| !v.trim().is_empty())?;
        let base_url = std::env::var("GEMINI_BASE_URL")
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string())
            .trim_end_matches('/')
            .to_string();
        let model =
            std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.0-flash".to_string());
        let timeout_secs = std::env::var("GEMINI_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);

        Some(Self {
            api_key,
            base_url,
            model,
            timeout_secs,
            http: reqwest::Client::new(),
        })
    }
}

impl GenerationClient for GeminiClient {
    fn generate_text(&self, prompt: &str) -> BoxFuture<'static, anyhow::Result<String>> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let body = serde_json::json!({
            "contents": [{"parts": [{"text": prompt}]}]
        });
        let http = self.http.clone();
        let timeout = Duration::from_secs(self.timeout_secs);

        Box::pin(async move {
            let res = http.post(&url).json(&body).timeout(timeout).send().await?;
            if !res.status().is_success() {
                let status = res.status();
                let text = res.text().await.unwrap_or_default();
                anyhow::bail!("gemini api error {}: {}", status, text);
            }
            let payload: serde_json::Value = res.json().await?;
            payload
                .get("candidates")
                .and_then(|c| c.get(0))
                .and_then(|c| c.get("content"))
                .and_then(|c| c.get("parts"))
                .and_then(|p| p.get(0))
                .and_then(|p| p.get("text"))
                .and_then(|t| t.as_str())
                .map(|t| t.to_string())
                .ok_or_else(|| anyhow::anyhow!("gemini response carried no text candidate"))
        })
    }
}

/// Remote bookmark persistence seam. Failures are reported, not raised past
/// the coordinator; the session reverts its optimistic flag on `Err`.
#[async_trait]
pub trait BookmarkStore: Send + Sync {
    async fn save(&self, question: Question) -> anyhow::Result<()>;
    async fn delete(&self, question_id: &str) -> anyhow::Result<()>;
    async fn list_by_user(&self, user_id: &str) -> Vec<Question>;
}

#[derive(Default)]
pub struct InMemoryBookmarkStore {
    entries: DashMap<String, Question>,
}

#[async_trait]
impl BookmarkStore for InMemoryBookmarkStore {
    async fn save(&self, question: Question) -> anyhow::Result<()> {
        self.entries.insert(question.id.clone(), question);
        Ok(())
    }

    async fn delete(&self, question_id: &str) -> anyhow::Result<()> {
        self.entries.remove(question_id);
        Ok(())
    }

    async fn list_by_user(&self, user_id: &str) -> Vec<Question> {
        self.entries
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn save(&self, result: QuizResult) -> anyhow::Result<()>;
    /// Newest first.
    async fn list_by_user(&self, user_id: &str) -> Vec<QuizResult>;
}

#[derive(Default)]
pub struct InMemoryHistoryStore {
    entries: DashMap<String, QuizResult>,
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn save(&self, result: QuizResult) -> anyhow::Result<()> {
        self.entries.insert(result.id.clone(), result);
        Ok(())
    }

    async fn list_by_user(&self, user_id: &str) -> Vec<QuizResult> {
        let mut results: Vec<QuizResult> = self
            .entries
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        results.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        results
    }
}

/// Supplies the acting user, or `None` for anonymous mode where persistence
/// is skipped but quiz-taking still works.
pub trait IdentityProvider: Send + Sync {
    fn current_user_id(&self) -> Option<String>;
}

pub struct EnvIdentity {
    user_id: Option<String>,
}

impl EnvIdentity {
    pub fn from_env() -> Self {
        Self {
            user_id: std::env::var("QUIZ_USER_ID")
                .ok()
                .filter(|v| !v.trim().is_empty()),
        }
    }

    pub fn fixed(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self { user_id: None }
    }
}

impl IdentityProvider for EnvIdentity {
    fn current_user_id(&self) -> Option<String> {
        self.user_id.clone()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub generator: QuestionGenerator,
    pub bookmarks: Arc<dyn BookmarkStore>,
    pub history: Arc<dyn HistoryStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub sessions: Arc<DashMap<String, Arc<Mutex<QuizSession>>>>,
}

impl AppState {
    pub fn new(
        ai_client: Arc<dyn GenerationClient>,
        bookmarks: Arc<dyn BookmarkStore>,
        history: Arc<dyn HistoryStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            generator: QuestionGenerator::new(ai_client),
            bookmarks,
            history,
            identity,
            sessions: Arc::new(DashMap::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Difficulty;

    fn result(id: &str, user_id: &str, timestamp: i64) -> QuizResult {
        QuizResult {
            id: id.to_string(),
            score: 1,
            total_questions: 2,
            topic: "dsa".into(),
            difficulty: Difficulty::Medium,
            timestamp,
            user_id: user_id.to_string(),
        }
    }

    #[tokio::test]
    async fn history_lists_newest_first() {
        let store = InMemoryHistoryStore::default();
        store.save(result("r-old", "user-1", 1_000)).await.unwrap();
        store.save(result("r-new", "user-1", 3_000)).await.unwrap();
        store.save(result("r-mid", "user-1", 2_000)).await.unwrap();

        let listed = store.list_by_user("user-1").await;
        let ids: Vec<&str> = listed.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["r-new", "r-mid", "r-old"]);
    }

    #[tokio::test]
    async fn history_is_scoped_to_the_user() {
        let store = InMemoryHistoryStore::default();
        store.save(result("mine", "user-1", 1_000)).await.unwrap();
        store.save(result("theirs", "user-2", 2_000)).await.unwrap();

        let listed = store.list_by_user("user-1").await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "mine");
    }
}
