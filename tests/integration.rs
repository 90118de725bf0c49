use futures::future::BoxFuture;
use quiznow_backend::routes::build_router;
use quiznow_backend::state::{
    AppState, EnvIdentity, GenerationClient, InMemoryBookmarkStore, InMemoryHistoryStore,
    MockGenerationClient,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

struct FailingClient;

impl GenerationClient for FailingClient {
    fn generate_text(&self, _prompt: &str) -> BoxFuture<'static, anyhow::Result<String>> {
        Box::pin(async { anyhow::bail!("service unavailable") })
    }
}

fn app_state(ai_client: Arc<dyn GenerationClient>, identity: EnvIdentity) -> AppState {
    AppState::new(
        ai_client,
        Arc::new(InMemoryBookmarkStore::default()),
        Arc::new(InMemoryHistoryStore::default()),
        Arc::new(identity),
    )
}

async fn spawn_server(state: AppState) -> (String, reqwest::Client) {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), reqwest::Client::new())
}

async fn create_session(base: &str, client: &reqwest::Client) -> String {
    let resp = client
        .post(format!("{}/api/v1/sessions", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    resp.json::<serde_json::Value>().await.unwrap()["sessionId"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn full_quiz_flow_with_generated_questions() {
    let state = app_state(Arc::new(MockGenerationClient), EnvIdentity::anonymous());
    let (base, client) = spawn_server(state).await;
    let session_id = create_session(&base, &client).await;

    let start = client
        .post(format!("{}/api/v1/sessions/{}/start", base, session_id))
        .json(&json!({"topic": "dsa", "questionCount": 2, "difficulty": "medium"}))
        .send()
        .await
        .unwrap();
    assert_eq!(start.status(), 200);
    let body = start.json::<serde_json::Value>().await.unwrap();
    assert_eq!(body["usedFallback"], false);
    let questions = body["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 2);
    for q in questions {
        assert_eq!(q["options"].as_array().unwrap().len(), 4);
        let correct = q["correctAnswer"].as_u64().unwrap();
        assert!(correct < 4);
    }

    // answer question 0 correctly, leave question 1 unanswered
    let correct0 = questions[0]["correctAnswer"].as_u64().unwrap() as usize;
    let answer = client
        .post(format!("{}/api/v1/sessions/{}/answers", base, session_id))
        .json(&json!({"questionIndex": 0, "optionIndex": correct0}))
        .send()
        .await
        .unwrap();
    assert_eq!(answer.status(), 204);

    let nav = client
        .post(format!("{}/api/v1/sessions/{}/navigate", base, session_id))
        .json(&json!({"delta": 5}))
        .send()
        .await
        .unwrap();
    assert_eq!(nav.status(), 200);
    assert_eq!(
        nav.json::<serde_json::Value>().await.unwrap()["currentIndex"],
        1
    );

    let submit = client
        .post(format!("{}/api/v1/sessions/{}/submit", base, session_id))
        .send()
        .await
        .unwrap();
    assert_eq!(submit.status(), 200);
    let result = submit.json::<serde_json::Value>().await.unwrap();
    assert_eq!(result["score"], 1);
    assert_eq!(result["totalQuestions"], 2);
    assert_eq!(result["topic"], "dsa");
    assert_eq!(result["difficulty"], "medium");

    // submit is only legal once
    let again = client
        .post(format!("{}/api/v1/sessions/{}/submit", base, session_id))
        .send()
        .await
        .unwrap();
    assert_eq!(again.status(), 409);
    let err = again.json::<serde_json::Value>().await.unwrap();
    assert_eq!(err["error"]["code"], "INVALID_STATE");
}

#[tokio::test]
async fn failed_generation_serves_fallback_questions() {
    let state = app_state(Arc::new(FailingClient), EnvIdentity::anonymous());
    let (base, client) = spawn_server(state).await;
    let session_id = create_session(&base, &client).await;

    let start = client
        .post(format!("{}/api/v1/sessions/{}/start", base, session_id))
        .json(&json!({"topic": "dsa", "questionCount": 3, "difficulty": "medium"}))
        .send()
        .await
        .unwrap();
    assert_eq!(start.status(), 200);
    let body = start.json::<serde_json::Value>().await.unwrap();
    assert_eq!(body["usedFallback"], true);
    let questions = body["questions"].as_array().unwrap();
    assert!(!questions.is_empty());
    assert!(questions.len() <= 3);
    assert!(body["errorMessage"]
        .as_str()
        .unwrap()
        .contains("Failed to generate questions"));
}

#[tokio::test]
async fn start_validation_and_missing_session() {
    let state = app_state(Arc::new(MockGenerationClient), EnvIdentity::anonymous());
    let (base, client) = spawn_server(state).await;
    let session_id = create_session(&base, &client).await;

    let zero = client
        .post(format!("{}/api/v1/sessions/{}/start", base, session_id))
        .json(&json!({"topic": "dsa", "questionCount": 0, "difficulty": "easy"}))
        .send()
        .await
        .unwrap();
    assert_eq!(zero.status(), 400);
    let err = zero.json::<serde_json::Value>().await.unwrap();
    assert_eq!(err["error"]["code"], "VALIDATION_ERROR");

    let missing = client
        .post(format!("{}/api/v1/sessions/nope/start", base))
        .json(&json!({"topic": "dsa", "questionCount": 2, "difficulty": "easy"}))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);
}

#[tokio::test]
async fn bookmarks_and_history_persist_for_logged_in_user() {
    let state = app_state(Arc::new(MockGenerationClient), EnvIdentity::fixed("user-7"));
    let (base, client) = spawn_server(state).await;
    let session_id = create_session(&base, &client).await;

    client
        .post(format!("{}/api/v1/sessions/{}/start", base, session_id))
        .json(&json!({"topic": "js", "questionCount": 2, "difficulty": "easy"}))
        .send()
        .await
        .unwrap();

    let toggled = client
        .post(format!("{}/api/v1/sessions/{}/bookmarks", base, session_id))
        .json(&json!({"questionIndex": 0}))
        .send()
        .await
        .unwrap();
    assert_eq!(toggled.status(), 200);
    assert_eq!(
        toggled.json::<serde_json::Value>().await.unwrap()["isBookmarked"],
        true
    );

    let bookmarks = client
        .get(format!("{}/api/v1/bookmarks", base))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    assert_eq!(bookmarks.as_array().unwrap().len(), 1);
    assert_eq!(bookmarks[0]["userId"], "user-7");
    assert_eq!(bookmarks[0]["isBookmarked"], true);

    let submit = client
        .post(format!("{}/api/v1/sessions/{}/submit", base, session_id))
        .send()
        .await
        .unwrap();
    assert_eq!(submit.status(), 200);

    // history save is fire-and-forget, give the spawned task a moment
    let mut history = Vec::new();
    for _ in 0..20 {
        let resp = client
            .get(format!("{}/api/v1/history", base))
            .send()
            .await
            .unwrap()
            .json::<serde_json::Value>()
            .await
            .unwrap();
        history = resp.as_array().unwrap().clone();
        if !history.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["userId"], "user-7");
    assert_eq!(history[0]["topic"], "js");
}

#[tokio::test]
async fn topics_catalog_and_session_view() {
    let state = app_state(Arc::new(MockGenerationClient), EnvIdentity::anonymous());
    let (base, client) = spawn_server(state).await;

    let topics = client
        .get(format!("{}/api/v1/topics", base))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    let topics = topics.as_array().unwrap();
    assert_eq!(topics.len(), 20);
    assert!(topics.iter().any(|t| t["id"] == "dsa"));

    let session_id = create_session(&base, &client).await;
    let view = client
        .get(format!("{}/api/v1/sessions/{}", base, session_id))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    assert_eq!(view["phase"], "idle");
    assert_eq!(view["isLoading"], false);
    assert_eq!(view["currentIndex"], 0);
    assert!(view["questions"].as_array().unwrap().is_empty());
}
