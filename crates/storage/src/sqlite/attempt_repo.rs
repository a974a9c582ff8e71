use chrono::{DateTime, Utc};

use assess_core::model::{
    Answer, AssessmentId, Attempt, AttemptId, AttemptStatus, LearnerId, QuestionId,
};

use super::SqliteGateway;
use super::mapping::{answer_columns, id_i64, map_attempt_row, map_response_row, u32_from_i64};
use crate::repository::{AttemptRepository, StorageError};

const ATTEMPT_COLUMNS: &str = r"
    id, assessment_id, learner_id, started_at, status,
    score, time_spent_seconds, submitted_at
";

impl SqliteGateway {
    async fn find_open_attempt(
        &self,
        assessment_id: i64,
        learner_id: i64,
    ) -> Result<Option<Attempt>, StorageError> {
        let row = sqlx::query(&format!(
            r"
                SELECT {ATTEMPT_COLUMNS}
                FROM attempts
                WHERE assessment_id = ?1 AND learner_id = ?2 AND status = 'in_progress'
            "
        ))
        .bind(assessment_id)
        .bind(learner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_attempt_row).transpose()
    }
}

#[async_trait::async_trait]
impl AttemptRepository for SqliteGateway {
    async fn start_attempt(
        &self,
        assessment_id: AssessmentId,
        learner_id: LearnerId,
        now: DateTime<Utc>,
    ) -> Result<Attempt, StorageError> {
        let assessment = id_i64("assessment id", assessment_id.value())?;
        let learner = id_i64("learner id", learner_id.value())?;

        if let Some(existing) = self.find_open_attempt(assessment, learner).await? {
            return Ok(existing);
        }

        let attempt = Attempt::start(AttemptId::generate(), assessment_id, learner_id, now);
        let inserted = sqlx::query(
            r"
                INSERT INTO attempts (id, assessment_id, learner_id, started_at, status)
                VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(attempt.id().to_string())
        .bind(assessment)
        .bind(learner)
        .bind(attempt.started_at())
        .bind(AttemptStatus::InProgress.to_string())
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => Ok(attempt),
            // The partial unique index on open attempts means a concurrent
            // start beat us to the insert; return its attempt instead.
            Err(sqlx::Error::Database(_)) => self
                .find_open_attempt(assessment, learner)
                .await?
                .ok_or(StorageError::Conflict),
            Err(e) => Err(StorageError::Connection(e.to_string())),
        }
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<Attempt, StorageError> {
        let row = sqlx::query(&format!(
            r"
                SELECT {ATTEMPT_COLUMNS}
                FROM attempts
                WHERE id = ?1
            "
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        map_attempt_row(&row)
    }

    async fn save_response(
        &self,
        attempt_id: AttemptId,
        question_id: QuestionId,
        answer: &Answer,
    ) -> Result<(), StorageError> {
        let attempt = self.get_attempt(attempt_id).await?;
        if attempt.is_submitted() {
            return Err(StorageError::Conflict);
        }

        let (answer_text, payload) = answer_columns(answer)?;
        sqlx::query(
            r"
                INSERT INTO responses (attempt_id, question_id, answer_text, payload, saved_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(attempt_id, question_id) DO UPDATE SET
                    answer_text = excluded.answer_text,
                    payload = excluded.payload,
                    saved_at = excluded.saved_at
            ",
        )
        .bind(attempt_id.to_string())
        .bind(id_i64("question id", question_id.value())?)
        .bind(answer_text)
        .bind(payload)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn list_responses(
        &self,
        attempt_id: AttemptId,
    ) -> Result<Vec<(QuestionId, Answer)>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT question_id, answer_text, payload
                FROM responses
                WHERE attempt_id = ?1
                ORDER BY question_id ASC
            ",
        )
        .bind(attempt_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_response_row(&row)?);
        }
        Ok(out)
    }

    async fn submit_attempt(
        &self,
        attempt_id: AttemptId,
        responses: &[(QuestionId, Answer)],
        score: Option<u32>,
        time_spent_seconds: i64,
        submitted_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        // The status guard makes a duplicate submit a zero-row update, never
        // a second terminal write.
        let updated = sqlx::query(
            r"
                UPDATE attempts
                SET status = 'submitted',
                    score = ?2,
                    time_spent_seconds = ?3,
                    submitted_at = ?4
                WHERE id = ?1 AND status = 'in_progress'
            ",
        )
        .bind(attempt_id.to_string())
        .bind(score.map(i64::from))
        .bind(time_spent_seconds)
        .bind(submitted_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if updated.rows_affected() == 0 {
            let exists = sqlx::query("SELECT 1 FROM attempts WHERE id = ?1")
                .bind(attempt_id.to_string())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            return Err(if exists.is_some() {
                StorageError::Conflict
            } else {
                StorageError::NotFound
            });
        }

        for (question_id, answer) in responses {
            let (answer_text, payload) = answer_columns(answer)?;
            sqlx::query(
                r"
                    INSERT INTO responses (attempt_id, question_id, answer_text, payload, saved_at)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    ON CONFLICT(attempt_id, question_id) DO UPDATE SET
                        answer_text = excluded.answer_text,
                        payload = excluded.payload,
                        saved_at = excluded.saved_at
                ",
            )
            .bind(attempt_id.to_string())
            .bind(id_i64("question id", question_id.value())?)
            .bind(answer_text)
            .bind(payload)
            .bind(submitted_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(())
    }

    async fn count_submitted(
        &self,
        assessment_id: AssessmentId,
        learner_id: LearnerId,
    ) -> Result<u32, StorageError> {
        let row = sqlx::query(
            r"
                SELECT COUNT(*) AS submitted
                FROM attempts
                WHERE assessment_id = ?1 AND learner_id = ?2 AND status = 'submitted'
            ",
        )
        .bind(id_i64("assessment id", assessment_id.value())?)
        .bind(id_i64("learner id", learner_id.value())?)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        use sqlx::Row;
        u32_from_i64(
            "submitted",
            row.try_get::<i64, _>("submitted")
                .map_err(|e| StorageError::Serialization(e.to_string()))?,
        )
    }
}
