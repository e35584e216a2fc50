use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Stored difficulty level of a question. "Mixed" is a selection policy,
/// never a stored value; see [`TestDifficulty`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "difficulty", rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];
}

/// Difficulty requested for a test: a concrete level, or "mixed" which
/// balances the selection across all three levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestDifficulty {
    Easy,
    Medium,
    Hard,
    Mixed,
}

impl TestDifficulty {
    /// The stored difficulty to filter on, or `None` for mixed.
    pub fn as_filter(&self) -> Option<Difficulty> {
        match self {
            TestDifficulty::Easy => Some(Difficulty::Easy),
            TestDifficulty::Medium => Some(Difficulty::Medium),
            TestDifficulty::Hard => Some(Difficulty::Hard),
            TestDifficulty::Mixed => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: Uuid,
    pub topic: String,
    pub subtopic: String,
    pub question: String,
    pub options: Json<Vec<String>>,
    pub correct_answer: i32,
    pub difficulty: Difficulty,
    pub explanation: String,
    pub tags: Vec<String>,
    pub pyq_year: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Denormalized question content captured onto a completed test at
/// submission time, so history survives later edits or deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSnapshot {
    pub question_id: Uuid,
    pub topic: String,
    pub subtopic: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: i32,
    pub difficulty: Difficulty,
    pub explanation: String,
}

impl From<&Question> for QuestionSnapshot {
    fn from(q: &Question) -> Self {
        Self {
            question_id: q.id,
            topic: q.topic.clone(),
            subtopic: q.subtopic.clone(),
            question: q.question.clone(),
            options: q.options.0.clone(),
            correct_answer: q.correct_answer,
            difficulty: q.difficulty,
            explanation: q.explanation.clone(),
        }
    }
}
