use crate::config::get_config;
use crate::error::{Error, Result};
use crate::models::question::{Question, QuestionSnapshot};
use crate::models::test::Test;
use crate::models::test_session::TestSession;
use crate::services::scoring_service;
use crate::utils::time::test_duration_minutes;
use chrono::{Duration, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Clone)]
pub struct TestService {
    pool: PgPool,
}

impl TestService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the session for an already-selected question set. The unique
    /// index on `test_sessions.user_id` decides the winner when two starts
    /// race; the loser surfaces as a business-rule rejection.
    pub async fn create_session(&self, user_id: &str, questions: &[Question]) -> Result<TestSession> {
        let question_count = questions.len();
        let duration_seconds = test_duration_minutes(question_count) * 60;
        let now = Utc::now();
        let expires_at = now + Duration::seconds(duration_seconds);

        let question_ids: Vec<Uuid> = questions.iter().map(|q| q.id).collect();
        let answers: Vec<Option<i32>> = vec![None; question_count];
        let marked_for_review: Vec<bool> = vec![false; question_count];

        let session = sqlx::query_as::<_, TestSession>(
            r#"
            INSERT INTO test_sessions
                (user_id, question_ids, answers, marked_for_review, remaining_time, time_extensions, started_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, 0, $6, $7)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(Json(&question_ids))
        .bind(Json(&answers))
        .bind(Json(&marked_for_review))
        .bind(duration_seconds as i32)
        .bind(now)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            if let sqlx::Error::Database(db_err) = &err {
                if db_err.is_unique_violation() {
                    return Error::BusinessLogic(
                        "You already have an active test session. Please complete or abandon it first."
                            .to_string(),
                    );
                }
            }
            Error::from(err)
        })?;

        Ok(session)
    }

    /// The user's active session with its questions resolved in order, or
    /// `None` when no attempt is in progress.
    pub async fn get_session(&self, user_id: &str) -> Result<Option<(TestSession, Vec<Question>)>> {
        let session = sqlx::query_as::<_, TestSession>(
            "SELECT * FROM test_sessions WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(session) = session else {
            return Ok(None);
        };

        let questions = self.resolve_questions(&session.question_ids.0).await?;
        Ok(Some((session, questions)))
    }

    async fn get_session_by_id(&self, session_id: Uuid) -> Result<TestSession> {
        let session = sqlx::query_as::<_, TestSession>(
            "SELECT * FROM test_sessions WHERE id = $1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Test session".to_string()))?;

        Ok(session)
    }

    pub async fn save_answer(
        &self,
        session_id: Uuid,
        question_index: usize,
        answer: i32,
    ) -> Result<()> {
        let mut session = self.get_session_by_id(session_id).await?;
        guard_expiry(&session)?;
        session.set_answer(question_index, answer)?;

        sqlx::query("UPDATE test_sessions SET answers = $1 WHERE id = $2")
            .bind(Json(&session.answers.0))
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn toggle_mark_for_review(
        &self,
        session_id: Uuid,
        question_index: usize,
    ) -> Result<bool> {
        let mut session = self.get_session_by_id(session_id).await?;
        guard_expiry(&session)?;
        let marked = session.toggle_mark(question_index)?;

        sqlx::query("UPDATE test_sessions SET marked_for_review = $1 WHERE id = $2")
            .bind(Json(&session.marked_for_review.0))
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(marked)
    }

    /// Grant 5 or 10 extra minutes. Allowed even past the deadline, since
    /// the extension is how a timed-out client recovers, but capped at two
    /// grants per session.
    pub async fn extend_time(&self, session_id: Uuid, minutes: i64) -> Result<TestSession> {
        let mut session = self.get_session_by_id(session_id).await?;
        session.extend(minutes)?;

        sqlx::query(
            "UPDATE test_sessions SET remaining_time = $1, time_extensions = $2, expires_at = $3 WHERE id = $4",
        )
        .bind(session.remaining_time)
        .bind(session.time_extensions)
        .bind(session.expires_at)
        .bind(session_id)
        .execute(&self.pool)
        .await?;

        Ok(session)
    }

    /// Drop the active session without producing a test record.
    pub async fn abandon_session(&self, user_id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM test_sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Test session".to_string()));
        }
        Ok(())
    }

    /// Score the session and convert it into an immutable test record. The
    /// insert and the session delete commit together.
    pub async fn submit_test(&self, session_id: Uuid) -> Result<Test> {
        let session = self.get_session_by_id(session_id).await?;

        let resolved = self.resolve_questions(&session.question_ids.0).await?;
        let by_id: HashMap<Uuid, Question> =
            resolved.into_iter().map(|q| (q.id, q)).collect();

        // Keep answers/marks aligned with the questions that still exist.
        let mut questions: Vec<Question> = Vec::with_capacity(session.question_ids.0.len());
        let mut answers: Vec<Option<i32>> = Vec::with_capacity(session.answers.0.len());
        let mut marked_for_review: Vec<bool> = Vec::with_capacity(session.marked_for_review.0.len());
        for (index, id) in session.question_ids.0.iter().enumerate() {
            if let Some(question) = by_id.get(id) {
                questions.push(question.clone());
                answers.push(session.answers.0.get(index).copied().flatten());
                marked_for_review.push(
                    session
                        .marked_for_review
                        .0
                        .get(index)
                        .copied()
                        .unwrap_or(false),
                );
            }
        }

        let results = scoring_service::calculate_results(&answers, &questions);
        let snapshot: Vec<QuestionSnapshot> =
            questions.iter().map(QuestionSnapshot::from).collect();
        let question_ids: Vec<Uuid> = questions.iter().map(|q| q.id).collect();

        let now = Utc::now();
        let time_taken_seconds = (now - session.started_at).num_seconds().max(0) as i32;

        let mut tx = self.pool.begin().await?;

        let test = sqlx::query_as::<_, Test>(
            r#"
            INSERT INTO tests
                (user_id, question_ids, questions_snapshot, answers, marked_for_review,
                 score, total_questions, correct_answers, incorrect_answers, unanswered_questions,
                 time_taken_seconds, time_extensions, started_at, submitted_at,
                 topic_wise_performance, difficulty_wise_performance)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING *
            "#,
        )
        .bind(&session.user_id)
        .bind(Json(&question_ids))
        .bind(Json(&snapshot))
        .bind(Json(&answers))
        .bind(Json(&marked_for_review))
        .bind(results.score)
        .bind(results.total_questions)
        .bind(results.correct_answers)
        .bind(results.incorrect_answers)
        .bind(results.unanswered_questions)
        .bind(time_taken_seconds)
        .bind(session.time_extensions)
        .bind(session.started_at)
        .bind(now)
        .bind(Json(&results.topic_wise_performance))
        .bind(Json(&results.difficulty_wise_performance))
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM test_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            test_id = %test.id,
            user_id = %test.user_id,
            score = test.score,
            total = test.total_questions,
            "test submitted"
        );

        Ok(test)
    }

    pub async fn get_test(&self, test_id: Uuid) -> Result<Test> {
        let test = sqlx::query_as::<_, Test>("SELECT * FROM tests WHERE id = $1")
            .bind(test_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Test".to_string()))?;

        Ok(test)
    }

    pub async fn get_test_history(
        &self,
        user_id: &str,
        limit: i64,
        skip: i64,
    ) -> Result<Vec<Test>> {
        let tests = sqlx::query_as::<_, Test>(
            r#"
            SELECT * FROM tests
            WHERE user_id = $1
            ORDER BY submitted_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.pool)
        .await?;

        Ok(tests)
    }

    /// Delete sessions whose deadline passed more than `retention` ago and
    /// that were never submitted or abandoned.
    pub async fn sweep_expired_sessions(&self, retention: Duration) -> Result<u64> {
        let cutoff = Utc::now() - retention;
        let result = sqlx::query("DELETE FROM test_sessions WHERE expires_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Fetch questions by id, preserving the requested order. Ids whose
    /// question has since been deleted are skipped with a warning.
    async fn resolve_questions(&self, ids: &[Uuid]) -> Result<Vec<Question>> {
        let rows = sqlx::query_as::<_, Question>("SELECT * FROM questions WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        let mut by_id: HashMap<Uuid, Question> = rows.into_iter().map(|q| (q.id, q)).collect();
        let questions: Vec<Question> = ids.iter().filter_map(|id| by_id.remove(id)).collect();

        if questions.len() != ids.len() {
            tracing::warn!(
                requested = ids.len(),
                resolved = questions.len(),
                "session references deleted questions"
            );
        }

        Ok(questions)
    }
}

/// With `ENFORCE_SESSION_EXPIRY` set, answer and mark mutations are rejected
/// once the deadline has passed. Off by default: the countdown is
/// client-driven and "time up" arrives as an extension or submit request.
fn guard_expiry(session: &TestSession) -> Result<()> {
    if get_config().enforce_session_expiry && session.is_expired(Utc::now()) {
        return Err(Error::BusinessLogic(
            "Test session has expired. Request an extension or submit.".to_string(),
        ));
    }
    Ok(())
}
