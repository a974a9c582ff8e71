use assess_core::model::{Assessment, AssessmentId, Question};

use super::SqliteGateway;
use super::mapping::{grading_to_str, id_i64, map_assessment_row, map_question_row, ser};
use crate::repository::{AssessmentRepository, StorageError};

#[async_trait::async_trait]
impl AssessmentRepository for SqliteGateway {
    async fn upsert_assessment(&self, assessment: &Assessment) -> Result<(), StorageError> {
        let id = id_i64("assessment id", assessment.id().value())?;
        let settings = assessment.settings();

        sqlx::query(
            r"
                INSERT INTO assessments (
                    id, title, instructions, time_limit_minutes, max_attempts,
                    passing_score, shuffle_questions, show_correct_answers, grading
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    instructions = excluded.instructions,
                    time_limit_minutes = excluded.time_limit_minutes,
                    max_attempts = excluded.max_attempts,
                    passing_score = excluded.passing_score,
                    shuffle_questions = excluded.shuffle_questions,
                    show_correct_answers = excluded.show_correct_answers,
                    grading = excluded.grading
            ",
        )
        .bind(id)
        .bind(assessment.title())
        .bind(assessment.instructions())
        .bind(settings.time_limit_minutes.map(i64::from))
        .bind(settings.max_attempts.map(i64::from))
        .bind(settings.passing_score.map(i64::from))
        .bind(i64::from(settings.shuffle_questions))
        .bind(i64::from(settings.show_correct_answers))
        .bind(grading_to_str(settings.grading))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn upsert_question(
        &self,
        assessment_id: AssessmentId,
        question: &Question,
    ) -> Result<(), StorageError> {
        let assessment = id_i64("assessment id", assessment_id.value())?;
        let id = id_i64("question id", question.id().value())?;
        let payload = serde_json::to_string(question.payload()).map_err(ser)?;

        // New questions append after the current highest position; updates
        // keep their slot.
        sqlx::query(
            r"
                INSERT INTO questions (
                    id, assessment_id, position, prompt, points, skill_tag, payload
                )
                VALUES (
                    ?1, ?2,
                    (SELECT COALESCE(MAX(position) + 1, 0) FROM questions WHERE assessment_id = ?2),
                    ?3, ?4, ?5, ?6
                )
                ON CONFLICT(id, assessment_id) DO UPDATE SET
                    prompt = excluded.prompt,
                    points = excluded.points,
                    skill_tag = excluded.skill_tag,
                    payload = excluded.payload
            ",
        )
        .bind(id)
        .bind(assessment)
        .bind(question.prompt())
        .bind(i64::from(question.points()))
        .bind(question.skill_tag().map(|t| t.as_str().to_owned()))
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_assessment(&self, id: AssessmentId) -> Result<Assessment, StorageError> {
        let row = sqlx::query(
            r"
                SELECT
                    id, title, instructions, time_limit_minutes, max_attempts,
                    passing_score, shuffle_questions, show_correct_answers, grading
                FROM assessments
                WHERE id = ?1
            ",
        )
        .bind(id_i64("assessment id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        map_assessment_row(&row)
    }

    async fn list_questions(
        &self,
        assessment_id: AssessmentId,
    ) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, prompt, points, skill_tag, payload
                FROM questions
                WHERE assessment_id = ?1
                ORDER BY position ASC, id ASC
            ",
        )
        .bind(id_i64("assessment id", assessment_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_question_row(&row)?);
        }
        Ok(out)
    }
}
