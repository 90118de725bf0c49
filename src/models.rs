use serde::{Deserialize, Serialize};

/// Question complexity tag. The catalog of topics is open-ended, but
/// difficulty is a closed set; values the UI sends that we do not know are
/// carried through literally so prompts still read naturally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Other(String),
}

impl From<String> for Difficulty {
    fn from(value: String) -> Self {
        match value.as_str() {
            "easy" => Difficulty::Easy,
            "medium" => Difficulty::Medium,
            "hard" => Difficulty::Hard,
            _ => Difficulty::Other(value),
        }
    }
}

impl From<Difficulty> for String {
    fn from(value: Difficulty) -> Self {
        value.to_string()
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Difficulty::Easy => f.write_str("easy"),
            Difficulty::Medium => f.write_str("medium"),
            Difficulty::Hard => f.write_str("hard"),
            Difficulty::Other(raw) => f.write_str(raw),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    pub topic: String,
    pub difficulty: Difficulty,
    pub is_bookmarked: bool,
    /// Empty for anonymous sessions; set when the question is persisted.
    #[serde(default)]
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub id: String,
    pub score: u32,
    pub total_questions: u32,
    pub topic: String,
    pub difficulty: Difficulty,
    /// Unix timestamp in milliseconds.
    pub timestamp: i64,
    #[serde(default)]
    pub user_id: String,
}

/// Raw record shape produced by the model; converted to [`Question`] during
/// parsing and discarded.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiQuestionResponse {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: i64,
    #[serde(default)]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Topic {
    pub id: &'static str,
    pub name: &'static str,
}

pub fn topic_catalog() -> Vec<Topic> {
    vec![
        Topic { id: "dsa", name: "DSA" },
        Topic { id: "html", name: "HTML" },
        Topic { id: "css", name: "CSS" },
        Topic { id: "blockchain", name: "Blockchain" },
        Topic { id: "js", name: "JavaScript" },
        Topic { id: "devops", name: "DevOps" },
        Topic { id: "github", name: "GitHub" },
        Topic { id: "system_design", name: "System Design" },
        Topic { id: "spring_boot", name: "Spring Boot" },
        Topic { id: "mern", name: "MERN" },
        Topic { id: "aws", name: "AWS" },
        Topic { id: "api", name: "API" },
        Topic { id: "vcs", name: "VCS (Git)" },
        Topic { id: "ml", name: "Machine Learning" },
        Topic { id: "ai", name: "AI" },
        Topic { id: "python", name: "Python" },
        Topic { id: "data_science", name: "Data Science" },
        Topic { id: "oops", name: "OOPs" },
        Topic { id: "iot", name: "IoT" },
        Topic { id: "kotlin", name: "Kotlin" },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_roundtrip() {
        for raw in ["easy", "medium", "hard"] {
            let d = Difficulty::from(raw.to_string());
            assert_eq!(d.to_string(), raw);
            assert!(!matches!(d, Difficulty::Other(_)));
        }
    }

    #[test]
    fn difficulty_unknown_passes_through() {
        let d = Difficulty::from("brutal".to_string());
        assert_eq!(d, Difficulty::Other("brutal".to_string()));
        assert_eq!(d.to_string(), "brutal");
    }

    #[test]
    fn question_wire_shape_is_camel_case() {
        let q = Question {
            id: "dsa_1".into(),
            question: "Which data structure uses LIFO?".into(),
            options: vec!["Queue".into(), "Stack".into(), "Array".into(), "List".into()],
            correct_answer: 1,
            topic: "dsa".into(),
            difficulty: Difficulty::Medium,
            is_bookmarked: false,
            user_id: String::new(),
            explanation: None,
        };
        let raw = serde_json::to_value(&q).unwrap();
        assert_eq!(raw["correctAnswer"], 1);
        assert_eq!(raw["isBookmarked"], false);
        assert!(raw.get("explanation").is_none());
    }

    #[test]
    fn topic_catalog_has_unique_ids() {
        let topics = topic_catalog();
        let mut ids: Vec<_> = topics.iter().map(|t| t.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), topics.len());
    }
}
