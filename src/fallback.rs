use crate::models::{Difficulty, Question};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

struct BankEntry {
    id_suffix: &'static str,
    question: &'static str,
    options: [&'static str; 4],
    correct_answer: usize,
}

/// Deterministic question sets served when generation fails. Keyed by
/// lowercased topic id; topics without a dedicated set get the generic
/// two-question placeholder.
static BANK: Lazy<HashMap<&'static str, Vec<BankEntry>>> = Lazy::new(|| {
    let mut bank = HashMap::new();
    bank.insert(
        "dsa",
        vec![
            BankEntry {
                id_suffix: "1",
                question: "What is the time complexity of binary search?",
                options: ["O(n)", "O(log n)", "O(n²)", "O(1)"],
                correct_answer: 1,
            },
            BankEntry {
                id_suffix: "2",
                question: "Which data structure uses LIFO principle?",
                options: ["Queue", "Stack", "Array", "Linked List"],
                correct_answer: 1,
            },
            BankEntry {
                id_suffix: "3",
                question: "What is the space complexity of merge sort?",
                options: ["O(1)", "O(log n)", "O(n)", "O(n log n)"],
                correct_answer: 2,
            },
        ],
    );
    bank.insert(
        "js",
        vec![
            BankEntry {
                id_suffix: "1",
                question: "What does 'this' keyword refer to in JavaScript?",
                options: [
                    "Global object",
                    "Current function",
                    "Current object",
                    "Depends on context",
                ],
                correct_answer: 3,
            },
            BankEntry {
                id_suffix: "2",
                question: "Which method is used to add elements to the end of an array?",
                options: ["push()", "pop()", "shift()", "unshift()"],
                correct_answer: 0,
            },
            BankEntry {
                id_suffix: "3",
                question: "What is closure in JavaScript?",
                options: [
                    "A loop",
                    "A function with access to outer scope",
                    "An object",
                    "A variable",
                ],
                correct_answer: 1,
            },
        ],
    );
    bank
});

const GENERIC: [(&str, [&str; 4], usize); 2] = [
    (
        "Sample question for {topic}?",
        ["Option A", "Option B", "Option C", "Option D"],
        1,
    ),
    (
        "Another question for {topic}?",
        ["Choice 1", "Choice 2", "Choice 3", "Choice 4"],
        2,
    ),
];

/// Returns at most `count` fallback questions for `topic`. Bank sets are
/// small, so callers must tolerate receiving fewer questions than requested.
pub fn fallback_questions(
    topic: &str,
    count: usize,
    difficulty: &Difficulty,
    bookmarked_ids: &HashSet<String>,
) -> Vec<Question> {
    // "javascript" and "js" share one set, matching the topic catalog id.
    let key = match topic.to_lowercase() {
        k if k == "javascript" => "js".to_string(),
        k => k,
    };
    let build = |id: String, question: String, options: Vec<String>, correct_answer: usize| {
        let is_bookmarked = bookmarked_ids.contains(&id);
        Question {
            id,
            question,
            options,
            correct_answer,
            topic: topic.to_string(),
            difficulty: difficulty.clone(),
            is_bookmarked,
            user_id: String::new(),
            explanation: None,
        }
    };

    match BANK.get(key.as_str()) {
        Some(entries) => entries
            .iter()
            .take(count)
            .map(|e| {
                build(
                    format!("{key}_{}", e.id_suffix),
                    e.question.to_string(),
                    e.options.iter().map(|o| o.to_string()).collect(),
                    e.correct_answer,
                )
            })
            .collect(),
        None => GENERIC
            .iter()
            .take(count)
            .enumerate()
            .map(|(i, (question, options, correct_answer))| {
                build(
                    format!("{topic}_{}", i + 1),
                    question.replace("{topic}", topic),
                    options.iter().map(|o| o.to_string()).collect(),
                    *correct_answer,
                )
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_topic_returns_dedicated_set() {
        let qs = fallback_questions("dsa", 3, &Difficulty::Medium, &HashSet::new());
        assert_eq!(qs.len(), 3);
        assert!(qs[0].question.contains("binary search"));
        assert!(qs.iter().all(|q| q.options.len() == 4));
        assert!(qs.iter().all(|q| q.correct_answer < 4));
    }

    #[test]
    fn take_respects_count() {
        let qs = fallback_questions("dsa", 2, &Difficulty::Easy, &HashSet::new());
        assert_eq!(qs.len(), 2);
    }

    #[test]
    fn unknown_topic_uses_generic_placeholder() {
        let qs = fallback_questions("Quantum Basketweaving", 5, &Difficulty::Hard, &HashSet::new());
        assert_eq!(qs.len(), 2);
        assert!(qs[0].question.contains("Quantum Basketweaving"));
        // generic ids carry the caller's casing, dedicated sets use the key
        assert_eq!(qs[0].id, "Quantum Basketweaving_1");
        assert_eq!(qs[1].id, "Quantum Basketweaving_2");
    }

    #[test]
    fn topic_match_is_case_insensitive() {
        let qs = fallback_questions("DSA", 3, &Difficulty::Medium, &HashSet::new());
        assert!(qs[0].question.contains("binary search"));
        assert_eq!(qs[0].topic, "DSA");
    }

    #[test]
    fn javascript_alias_shares_js_set() {
        let qs = fallback_questions("JavaScript", 1, &Difficulty::Easy, &HashSet::new());
        assert_eq!(qs[0].id, "js_1");
        assert!(qs[0].question.contains("'this'"));
    }

    #[test]
    fn bookmark_flags_resolved_from_id_set() {
        let mut bookmarked = HashSet::new();
        bookmarked.insert("dsa_2".to_string());
        let qs = fallback_questions("dsa", 3, &Difficulty::Medium, &bookmarked);
        assert!(!qs[0].is_bookmarked);
        assert!(qs[1].is_bookmarked);
    }
}
