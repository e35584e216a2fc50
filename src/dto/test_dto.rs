use crate::models::question::{Question, TestDifficulty};
use crate::models::test::Test;
use crate::services::scoring_service;
use crate::utils::time::format_time;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TestConfigRequest {
    #[validate(length(min = 1, max = 10), custom(function = "validate_names"))]
    pub topics: Vec<String>,
    #[validate(custom(function = "validate_names"))]
    pub subtopics: Option<Vec<String>>,
    pub difficulty: TestDifficulty,
    #[validate(range(min = 1, max = 200))]
    pub question_count: u32,
}

fn validate_names(names: &[String]) -> Result<(), ValidationError> {
    if names.iter().any(|n| n.trim().is_empty()) {
        return Err(ValidationError::new("name_cannot_be_empty"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigureTestResponse {
    pub available_count: i64,
    pub duration_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartTestResponse {
    pub session_id: Uuid,
    pub question_count: usize,
    pub duration_minutes: i64,
}

/// The active session as shown to its owner, questions resolved in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveSessionResponse {
    pub id: Uuid,
    pub questions: Vec<Question>,
    pub answers: Vec<Option<i32>>,
    pub marked_for_review: Vec<bool>,
    pub remaining_time: i32,
    pub time_extensions: i32,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SaveAnswerRequest {
    pub session_id: Uuid,
    pub question_index: usize,
    #[validate(range(min = 0, max = 3))]
    pub answer: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveAnswerResponse {
    pub saved: bool,
    pub question_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkReviewRequest {
    pub session_id: Uuid,
    pub question_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkReviewResponse {
    pub question_index: usize,
    pub marked_for_review: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ExtendTimeRequest {
    pub session_id: Uuid,
    #[validate(custom(function = "validate_extension_minutes"))]
    pub minutes: i64,
}

fn validate_extension_minutes(minutes: i64) -> Result<(), ValidationError> {
    if minutes != 5 && minutes != 10 {
        return Err(ValidationError::new("extension_must_be_5_or_10_minutes"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtendTimeResponse {
    pub remaining_time: i32,
    pub time_extensions: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitTestRequest {
    pub session_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitTestResponse {
    pub test_id: Uuid,
    pub score: i32,
    pub total_questions: i32,
    pub percentage: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
    pub skip: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSummary {
    pub id: Uuid,
    pub score: i32,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub incorrect_answers: i32,
    pub unanswered_questions: i32,
    pub percentage: f64,
    pub time_taken: String,
    pub time_extensions: i32,
    pub started_at: DateTime<Utc>,
    pub submitted_at: DateTime<Utc>,
}

impl From<&Test> for TestSummary {
    fn from(test: &Test) -> Self {
        Self {
            id: test.id,
            score: test.score,
            total_questions: test.total_questions,
            correct_answers: test.correct_answers,
            incorrect_answers: test.incorrect_answers,
            unanswered_questions: test.unanswered_questions,
            percentage: scoring_service::percentage(test.correct_answers, test.total_questions),
            time_taken: format_time(i64::from(test.time_taken_seconds)),
            time_extensions: test.time_extensions,
            started_at: test.started_at,
            submitted_at: test.submitted_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicsResponse {
    pub topics: Vec<String>,
    pub subtopics_by_topic: BTreeMap<String, Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TestConfigRequest {
        TestConfigRequest {
            topics: vec!["History".to_string()],
            subtopics: None,
            difficulty: TestDifficulty::Mixed,
            question_count: 10,
        }
    }

    #[test]
    fn accepts_a_valid_configuration() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn rejects_empty_or_oversized_topic_lists() {
        let mut c = config();
        c.topics = vec![];
        assert!(c.validate().is_err());

        let mut c = config();
        c.topics = (0..11).map(|i| format!("Topic {}", i)).collect();
        assert!(c.validate().is_err());

        let mut c = config();
        c.topics = vec!["  ".to_string()];
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_question_count_out_of_bounds() {
        let mut c = config();
        c.question_count = 0;
        assert!(c.validate().is_err());

        c.question_count = 201;
        assert!(c.validate().is_err());

        c.question_count = 200;
        assert!(c.validate().is_ok());
    }

    #[test]
    fn difficulty_parses_lowercase_wire_values() {
        let parsed: TestDifficulty = serde_json::from_str("\"mixed\"").unwrap();
        assert_eq!(parsed, TestDifficulty::Mixed);
        assert!(serde_json::from_str::<TestDifficulty>("\"extreme\"").is_err());
    }

    #[test]
    fn extension_minutes_must_be_five_or_ten() {
        let ok = ExtendTimeRequest {
            session_id: Uuid::new_v4(),
            minutes: 5,
        };
        assert!(ok.validate().is_ok());

        let bad = ExtendTimeRequest {
            session_id: Uuid::new_v4(),
            minutes: 7,
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn answers_outside_the_option_range_fail_validation() {
        let bad = SaveAnswerRequest {
            session_id: Uuid::new_v4(),
            question_index: 0,
            answer: 4,
        };
        assert!(bad.validate().is_err());
    }
}
