use crate::error::QuizError;
use crate::generation::GenerationOutcome;
use crate::models::{Difficulty, Question, QuizResult};
use crate::state::{BookmarkStore, IdentityProvider};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Idle,
    Loading,
    Ready,
    Submitted,
}

/// Applies optimistic bookmark flips against the remote store and reports
/// the outcome so the session can revert on failure. Anonymous users get a
/// local-only bookmark: no store call, always succeeds.
#[derive(Clone)]
pub struct BookmarkCoordinator {
    store: Arc<dyn BookmarkStore>,
    identity: Arc<dyn IdentityProvider>,
}

impl BookmarkCoordinator {
    pub fn new(store: Arc<dyn BookmarkStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { store, identity }
    }

    pub async fn add(&self, question: &Question) -> bool {
        let Some(user_id) = self.identity.current_user_id() else {
            return true;
        };
        let mut bookmarked = question.clone();
        bookmarked.is_bookmarked = true;
        bookmarked.user_id = user_id;
        match self.store.save(bookmarked).await {
            Ok(()) => true,
            Err(err) => {
                warn!(question_id = %question.id, %err, "failed to save bookmark");
                false
            }
        }
    }

    pub async fn remove(&self, question_id: &str) -> bool {
        if self.identity.current_user_id().is_none() {
            return true;
        }
        match self.store.delete(question_id).await {
            Ok(()) => true,
            Err(err) => {
                warn!(%question_id, %err, "failed to remove bookmark");
                false
            }
        }
    }
}

/// State machine for one quiz run: `Idle → Loading → Ready → Submitted`.
///
/// A session has a single logical owner; callers serialize operations against
/// it (the HTTP layer holds one `Mutex` per session). Generation is guarded
/// by a monotonically increasing sequence number so that when a new request
/// starts while another is in flight, only the latest outcome is applied.
pub struct QuizSession {
    phase: SessionPhase,
    topic: String,
    difficulty: Difficulty,
    questions: Vec<Question>,
    current_index: usize,
    selected_answers: HashMap<usize, usize>,
    last_error: Option<String>,
    generation_seq: u64,
}

impl QuizSession {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Idle,
            topic: String::new(),
            difficulty: Difficulty::Medium,
            questions: Vec::new(),
            current_index: 0,
            selected_answers: HashMap::new(),
            last_error: None,
            generation_seq: 0,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == SessionPhase::Loading
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn selected_answers(&self) -> &HashMap<usize, usize> {
        &self.selected_answers
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Enters `Loading` and returns the sequence number the caller must hand
    /// back to [`complete_generation`]. Starting again while a generation is
    /// in flight simply bumps the sequence; the earlier outcome is discarded
    /// on arrival (last write wins).
    ///
    /// [`complete_generation`]: QuizSession::complete_generation
    pub fn begin_generation(&mut self, topic: &str, difficulty: Difficulty) -> u64 {
        self.phase = SessionPhase::Loading;
        self.topic = topic.to_string();
        self.difficulty = difficulty;
        self.last_error = None;
        self.generation_seq += 1;
        self.generation_seq
    }

    /// Applies a finished generation outcome. Returns `false` (and leaves all
    /// state untouched) when `seq` is stale.
    pub fn complete_generation(&mut self, seq: u64, outcome: GenerationOutcome) -> bool {
        if seq != self.generation_seq {
            return false;
        }
        self.questions = outcome.questions;
        self.current_index = 0;
        self.selected_answers = HashMap::new();
        self.last_error = outcome.error_message;
        self.phase = SessionPhase::Ready;
        true
    }

    /// Records (or overwrites) the chosen option for a question. Legal to
    /// change a prior selection; last write wins.
    pub fn select_answer(
        &mut self,
        question_index: usize,
        option_index: usize,
    ) -> Result<(), QuizError> {
        if self.phase != SessionPhase::Ready {
            return Err(QuizError::InvalidState("no active quiz to answer"));
        }
        if question_index >= self.questions.len() {
            return Err(QuizError::InvalidState("question index out of range"));
        }
        if option_index >= self.questions[question_index].options.len() {
            return Err(QuizError::InvalidState("option index out of range"));
        }
        // Copy-on-write so each transition replaces the map wholesale.
        let mut next = self.selected_answers.clone();
        next.insert(question_index, option_index);
        self.selected_answers = next;
        Ok(())
    }

    /// Moves the cursor by `delta`, clamped to the question range.
    /// Out-of-range requests are not errors.
    pub fn navigate(&mut self, delta: i64) -> Result<usize, QuizError> {
        if self.phase != SessionPhase::Ready {
            return Err(QuizError::InvalidState("no active quiz to navigate"));
        }
        let last = self.questions.len().saturating_sub(1);
        let target = self.current_index as i64 + delta;
        self.current_index = target.clamp(0, last as i64) as usize;
        Ok(self.current_index)
    }

    /// Optimistically flips the bookmark flag, then reconciles with the
    /// remote store through the coordinator. A failed store call is
    /// compensated by an explicit reverse flip. Returns the resulting flag.
    pub async fn toggle_bookmark(
        &mut self,
        question_index: usize,
        coordinator: &BookmarkCoordinator,
    ) -> Result<bool, QuizError> {
        if self.phase != SessionPhase::Ready {
            return Err(QuizError::InvalidState("no active quiz to bookmark"));
        }
        let question = self
            .questions
            .get_mut(question_index)
            .ok_or(QuizError::InvalidState("question index out of range"))?;

        let was_bookmarked = question.is_bookmarked;
        question.is_bookmarked = !was_bookmarked;
        let snapshot = question.clone();

        let ok = if was_bookmarked {
            coordinator.remove(&snapshot.id).await
        } else {
            coordinator.add(&snapshot).await
        };

        let question = &mut self.questions[question_index];
        if !ok {
            question.is_bookmarked = was_bookmarked;
        }
        Ok(question.is_bookmarked)
    }

    /// Scores the quiz and consumes the run: unanswered questions count as
    /// wrong, the session moves to `Submitted`. Only legal from `Ready`.
    pub fn submit(&mut self, user_id: Option<&str>) -> Result<QuizResult, QuizError> {
        if self.phase != SessionPhase::Ready {
            return Err(QuizError::InvalidState("submit requires an active quiz"));
        }
        if self.questions.is_empty() {
            return Err(QuizError::InvalidState("cannot submit an empty quiz"));
        }

        let score = self
            .questions
            .iter()
            .enumerate()
            .filter(|(index, question)| {
                self.selected_answers.get(index) == Some(&question.correct_answer)
            })
            .count() as u32;

        self.phase = SessionPhase::Submitted;
        Ok(QuizResult {
            id: uuid::Uuid::new_v4().to_string(),
            score,
            total_questions: self.questions.len() as u32,
            topic: self.topic.clone(),
            difficulty: self.difficulty.clone(),
            timestamp: Utc::now().timestamp_millis(),
            user_id: user_id.unwrap_or_default().to_string(),
        })
    }
}

impl Default for QuizSession {
    fn default() -> Self {
        Self::new()
    }
}
