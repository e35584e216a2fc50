use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

pub const MAX_TIME_EXTENSIONS: i32 = 2;

/// The mutable working state of one in-progress attempt. At most one row
/// exists per user (unique index on `user_id`).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TestSession {
    pub id: Uuid,
    pub user_id: String,
    pub question_ids: Json<Vec<Uuid>>,
    pub answers: Json<Vec<Option<i32>>>,
    pub marked_for_review: Json<Vec<bool>>,
    pub remaining_time: i32,
    pub time_extensions: i32,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl TestSession {
    fn check_index(&self, question_index: usize) -> Result<()> {
        if question_index >= self.question_ids.0.len() {
            return Err(Error::BusinessLogic("Invalid question index".to_string()));
        }
        Ok(())
    }

    /// Overwrite the answer slot. Re-answering is last-write-wins; erasing
    /// is not representable (the wire layer only admits 0..=3).
    pub fn set_answer(&mut self, question_index: usize, answer: i32) -> Result<()> {
        self.check_index(question_index)?;
        self.answers.0[question_index] = Some(answer);
        Ok(())
    }

    /// Flip the marked-for-review flag, returning the new value.
    pub fn toggle_mark(&mut self, question_index: usize) -> Result<bool> {
        self.check_index(question_index)?;
        let flag = &mut self.marked_for_review.0[question_index];
        *flag = !*flag;
        Ok(*flag)
    }

    /// Grant additional minutes, capped at [`MAX_TIME_EXTENSIONS`] grants
    /// per session.
    pub fn extend(&mut self, minutes: i64) -> Result<()> {
        if self.time_extensions >= MAX_TIME_EXTENSIONS {
            return Err(Error::BusinessLogic(format!(
                "Maximum time extensions ({}) reached",
                MAX_TIME_EXTENSIONS
            )));
        }
        let additional_seconds = minutes * 60;
        self.remaining_time += additional_seconds as i32;
        self.time_extensions += 1;
        self.expires_at = self.expires_at + Duration::seconds(additional_seconds);
        Ok(())
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}
