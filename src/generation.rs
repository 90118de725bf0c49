use crate::error::QuizError;
use crate::fallback::fallback_questions;
use crate::models::{Difficulty, GeminiQuestionResponse, Question};
use crate::state::GenerationClient;
use chrono::Utc;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Instruction text sent to the model. Deterministic given its inputs; the
/// format contract here is what `parse_questions` enforces on the way back.
pub fn build_prompt(topic: &str, count: usize, difficulty: &Difficulty) -> String {
    format!(
        r#"Generate exactly {count} multiple choice questions about {topic} with {difficulty} difficulty level.
Try not to generate repetitive questions.
Requirements:
- Each question should have exactly 4 options
- Only one correct answer per question
- correctAnswer should be the index (0-3) of the correct option
- Questions should be appropriate for {difficulty} level
- Avoid overly complex or ambiguous questions

Return ONLY a JSON array in this exact format:
[
    {{
        "question": "What is the time complexity of binary search?",
        "options": ["O(n)", "O(log n)", "O(n²)", "O(1)"],
        "correctAnswer": 1,
        "explanation": "Binary search divides the search space in half with each iteration"
    }}
]

Topic: {topic}
Difficulty: {difficulty}
Count: {count}"#
    )
}

/// Strips markdown fences and slices to the outermost JSON array. When no
/// array brackets are present the trimmed input is returned as-is and the
/// parser downstream reports the failure. Idempotent.
pub fn sanitize_response(raw: &str) -> String {
    let cleaned = raw.replace("```json", "").replace("```", "");
    let start = cleaned.find('[');
    let end = cleaned.rfind(']');
    match (start, end) {
        (Some(start), Some(end)) if end > start => cleaned[start..=end].trim().to_string(),
        _ => cleaned.trim().to_string(),
    }
}

/// Decodes a sanitized payload into questions. Strict: one malformed record
/// invalidates the whole batch. Every question in the batch shares one
/// generation timestamp; the record index keeps ids unique.
pub fn parse_questions(
    sanitized: &str,
    topic: &str,
    difficulty: &Difficulty,
    bookmarked_ids: &HashSet<String>,
) -> Result<Vec<Question>, QuizError> {
    let records: Vec<GeminiQuestionResponse> = serde_json::from_str(sanitized)
        .map_err(|err| QuizError::MalformedResponse(err.to_string()))?;

    let batch_millis = Utc::now().timestamp_millis();
    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            if record.options.len() != 4 {
                return Err(QuizError::MalformedResponse(format!(
                    "question {index} has {} options, expected 4",
                    record.options.len()
                )));
            }
            if !(0..4).contains(&record.correct_answer) {
                return Err(QuizError::MalformedResponse(format!(
                    "question {index} has correctAnswer {} outside 0-3",
                    record.correct_answer
                )));
            }
            let id = format!("{topic}_{batch_millis}_{index}");
            let is_bookmarked = bookmarked_ids.contains(&id);
            Ok(Question {
                id,
                question: record.question,
                options: record.options,
                correct_answer: record.correct_answer as usize,
                topic: topic.to_string(),
                difficulty: difficulty.clone(),
                is_bookmarked,
                user_id: String::new(),
                explanation: record.explanation,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutcome {
    pub questions: Vec<Question>,
    pub used_fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Orchestrates prompt → external call → sanitize → parse, substituting the
/// fallback bank on any failure. Never errors past its own boundary.
#[derive(Clone)]
pub struct QuestionGenerator {
    client: Arc<dyn GenerationClient>,
}

impl QuestionGenerator {
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self { client }
    }

    pub async fn generate(
        &self,
        topic: &str,
        count: usize,
        difficulty: &Difficulty,
        bookmarked_ids: &HashSet<String>,
    ) -> GenerationOutcome {
        // An empty quiz is a legitimate (if useless) request; skip the
        // external call entirely rather than asking the model for nothing.
        if count == 0 {
            return GenerationOutcome {
                questions: Vec::new(),
                used_fallback: false,
                error_message: None,
            };
        }

        let prompt = build_prompt(topic, count, difficulty);
        let attempt = match self.client.generate_text(&prompt).await {
            Ok(raw) if raw.trim().is_empty() => Err(QuizError::GenerationCallFailure(
                "empty response from model".to_string(),
            )),
            Ok(raw) => parse_questions(&sanitize_response(&raw), topic, difficulty, bookmarked_ids),
            Err(err) => Err(QuizError::GenerationCallFailure(err.to_string())),
        };

        match attempt {
            Ok(questions) => {
                info!(topic, count = questions.len(), "generated questions");
                GenerationOutcome {
                    questions,
                    used_fallback: false,
                    error_message: None,
                }
            }
            Err(err) => {
                warn!(topic, %err, "generation failed, serving fallback questions");
                GenerationOutcome {
                    questions: fallback_questions(topic, count, difficulty, bookmarked_ids),
                    used_fallback: true,
                    error_message: Some(format!("Failed to generate questions: {err}")),
                }
            }
        }
    }
}
