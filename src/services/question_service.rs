use crate::dto::question_dto::{BulkImportError, BulkImportResult, QuestionFilter, QuestionPayload};
use crate::dto::test_dto::TestConfigRequest;
use crate::error::{Error, Result};
use crate::models::question::{Difficulty, Question};
use crate::services::selection;
use sqlx::types::Json;
use sqlx::PgPool;
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct QuestionService {
    pool: PgPool,
}

impl QuestionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_question(&self, payload: QuestionPayload) -> Result<Question> {
        payload.validate()?;

        let question = sqlx::query_as::<_, Question>(
            r#"
            INSERT INTO questions (topic, subtopic, question, options, correct_answer, difficulty, explanation, tags, pyq_year)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(payload.topic.trim())
        .bind(payload.subtopic.trim())
        .bind(&payload.question)
        .bind(Json(&payload.options))
        .bind(payload.correct_answer)
        .bind(payload.difficulty)
        .bind(&payload.explanation)
        .bind(&payload.tags)
        .bind(payload.pyq_year)
        .fetch_one(&self.pool)
        .await?;

        Ok(question)
    }

    pub async fn update_question(&self, id: Uuid, payload: QuestionPayload) -> Result<Question> {
        payload.validate()?;

        let question = sqlx::query_as::<_, Question>(
            r#"
            UPDATE questions
            SET topic = $1, subtopic = $2, question = $3, options = $4,
                correct_answer = $5, difficulty = $6, explanation = $7,
                tags = $8, pyq_year = $9, updated_at = NOW()
            WHERE id = $10
            RETURNING *
            "#,
        )
        .bind(payload.topic.trim())
        .bind(payload.subtopic.trim())
        .bind(&payload.question)
        .bind(Json(&payload.options))
        .bind(payload.correct_answer)
        .bind(payload.difficulty)
        .bind(&payload.explanation)
        .bind(&payload.tags)
        .bind(payload.pyq_year)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Question".to_string()))?;

        Ok(question)
    }

    /// Completed tests keep their own snapshot, so deleting a question only
    /// removes it from future selections.
    pub async fn delete_question(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Question".to_string()));
        }
        Ok(())
    }

    pub async fn get_question(&self, id: Uuid) -> Result<Question> {
        let question = sqlx::query_as::<_, Question>("SELECT * FROM questions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Question".to_string()))?;

        Ok(question)
    }

    pub async fn list_questions(&self, filter: QuestionFilter) -> Result<Vec<Question>> {
        filter.validate()?;
        let tags = filter.tag_list().filter(|tags| !tags.is_empty());

        let questions = sqlx::query_as::<_, Question>(
            r#"
            SELECT * FROM questions
            WHERE ($1::text IS NULL OR topic = $1)
              AND ($2::text IS NULL OR subtopic = $2)
              AND ($3::difficulty IS NULL OR difficulty = $3)
              AND ($4::text[] IS NULL OR tags && $4)
            ORDER BY created_at DESC
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(filter.topic)
        .bind(filter.subtopic)
        .bind(filter.difficulty)
        .bind(tags)
        .bind(filter.limit.unwrap_or(50))
        .bind(filter.skip.unwrap_or(0))
        .fetch_all(&self.pool)
        .await?;

        Ok(questions)
    }

    /// Import a batch of questions, reporting per-line failures instead of
    /// rejecting the whole batch.
    pub async fn bulk_import(&self, questions: Vec<QuestionPayload>) -> Result<BulkImportResult> {
        let mut result = BulkImportResult {
            successful: 0,
            failed: 0,
            errors: Vec::new(),
        };

        for (index, payload) in questions.into_iter().enumerate() {
            let line = index + 1;
            if let Err(validation) = payload.validate() {
                result.failed += 1;
                result.errors.push(BulkImportError {
                    line,
                    error: validation.to_string(),
                });
                continue;
            }
            match self.create_question(payload).await {
                Ok(_) => result.successful += 1,
                Err(err) => {
                    tracing::warn!(line, error = %err, "bulk import row failed");
                    result.failed += 1;
                    result.errors.push(BulkImportError {
                        line,
                        error: err.to_string(),
                    });
                }
            }
        }

        Ok(result)
    }

    pub async fn count_matching(
        &self,
        topics: &[String],
        subtopics: Option<&[String]>,
        difficulty: Option<Difficulty>,
    ) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM questions
            WHERE topic = ANY($1)
              AND ($2::text[] IS NULL OR subtopic = ANY($2))
              AND ($3::difficulty IS NULL OR difficulty = $3)
            "#,
        )
        .bind(topics)
        .bind(subtopics)
        .bind(difficulty)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn find_matching(
        &self,
        topics: &[String],
        subtopics: Option<&[String]>,
        difficulty: Option<Difficulty>,
    ) -> Result<Vec<Question>> {
        let questions = sqlx::query_as::<_, Question>(
            r#"
            SELECT * FROM questions
            WHERE topic = ANY($1)
              AND ($2::text[] IS NULL OR subtopic = ANY($2))
              AND ($3::difficulty IS NULL OR difficulty = $3)
            "#,
        )
        .bind(topics)
        .bind(subtopics)
        .bind(difficulty)
        .fetch_all(&self.pool)
        .await?;

        Ok(questions)
    }

    /// Every question id the user has been served in any completed test,
    /// regardless of topic.
    async fn attempted_question_ids(&self, user_id: &str) -> Result<HashSet<Uuid>> {
        let rows = sqlx::query_scalar::<_, Json<Vec<Uuid>>>(
            "SELECT question_ids FROM tests WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().flat_map(|ids| ids.0).collect())
    }

    /// Pick the question set for a new test: filter, check supply, then hand
    /// the pool plus the user's exposure history to the selection engine.
    pub async fn select_for_test(
        &self,
        config: &TestConfigRequest,
        user_id: &str,
    ) -> Result<Vec<Question>> {
        let subtopics = normalized_subtopics(config);
        let difficulty = config.difficulty.as_filter();

        let available = self
            .find_matching(&config.topics, subtopics, difficulty)
            .await?;

        let requested = config.question_count as usize;
        if available.len() < requested {
            return Err(Error::BusinessLogic(format!(
                "Insufficient questions available. Found {}, need {}",
                available.len(),
                requested
            )));
        }

        let attempted = self.attempted_question_ids(user_id).await?;
        Ok(selection::select_questions(
            available,
            &attempted,
            config.difficulty,
            requested,
        ))
    }

    /// Distinct topics plus the sorted subtopics under each, for the test
    /// configuration screen.
    pub async fn available_topics(&self) -> Result<(Vec<String>, BTreeMap<String, Vec<String>>)> {
        let topics = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT topic FROM questions ORDER BY topic",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut subtopics_by_topic = BTreeMap::new();
        for topic in &topics {
            let subtopics = sqlx::query_scalar::<_, String>(
                "SELECT DISTINCT subtopic FROM questions WHERE topic = $1 ORDER BY subtopic",
            )
            .bind(topic)
            .fetch_all(&self.pool)
            .await?;
            subtopics_by_topic.insert(topic.clone(), subtopics);
        }

        Ok((topics, subtopics_by_topic))
    }
}

/// An empty subtopic list means "no subtopic filter".
fn normalized_subtopics(config: &TestConfigRequest) -> Option<&[String]> {
    match config.subtopics.as_deref() {
        Some([]) | None => None,
        Some(subtopics) => Some(subtopics),
    }
}
