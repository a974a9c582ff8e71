use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use assess_core::model::{
    Answer, AnswerPayload, Assessment, AssessmentId, AssessmentSettings, Attempt, AttemptId,
    AttemptStatus, GradingMode, LearnerId, Question, QuestionId, QuestionPayload, SkillTag,
};

use crate::repository::StorageError;

pub(super) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(super) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(super) fn u64_from_i64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(super) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(super) fn grading_to_str(grading: GradingMode) -> &'static str {
    match grading {
        GradingMode::Automatic => "automatic",
        GradingMode::Manual => "manual",
    }
}

fn grading_from_str(s: &str) -> Result<GradingMode, StorageError> {
    match s {
        "automatic" => Ok(GradingMode::Automatic),
        "manual" => Ok(GradingMode::Manual),
        other => Err(StorageError::Serialization(format!(
            "unknown grading mode: {other}"
        ))),
    }
}

pub(super) fn map_assessment_row(row: &SqliteRow) -> Result<Assessment, StorageError> {
    let id = u64_from_i64("assessment id", row.try_get::<i64, _>("id").map_err(ser)?)?;
    let title: String = row.try_get("title").map_err(ser)?;
    let instructions: Option<String> = row.try_get("instructions").map_err(ser)?;

    let time_limit_minutes = row
        .try_get::<Option<i64>, _>("time_limit_minutes")
        .map_err(ser)?
        .map(|v| u32_from_i64("time_limit_minutes", v))
        .transpose()?;
    let max_attempts = row
        .try_get::<Option<i64>, _>("max_attempts")
        .map_err(ser)?
        .map(|v| u32_from_i64("max_attempts", v))
        .transpose()?;
    let passing_score = row
        .try_get::<Option<i64>, _>("passing_score")
        .map_err(ser)?
        .map(|v| u32_from_i64("passing_score", v))
        .transpose()?;

    let settings = AssessmentSettings {
        time_limit_minutes,
        max_attempts,
        passing_score,
        shuffle_questions: row.try_get::<i64, _>("shuffle_questions").map_err(ser)? != 0,
        show_correct_answers: row.try_get::<i64, _>("show_correct_answers").map_err(ser)? != 0,
        grading: grading_from_str(row.try_get::<&str, _>("grading").map_err(ser)?)?,
    };

    Assessment::new(AssessmentId::new(id), title, instructions, settings).map_err(ser)
}

pub(super) fn map_question_row(row: &SqliteRow) -> Result<Question, StorageError> {
    let id = u64_from_i64("question id", row.try_get::<i64, _>("id").map_err(ser)?)?;
    let prompt: String = row.try_get("prompt").map_err(ser)?;
    let points = u32_from_i64("points", row.try_get::<i64, _>("points").map_err(ser)?)?;
    let skill_tag: Option<String> = row.try_get("skill_tag").map_err(ser)?;
    let payload_json: String = row.try_get("payload").map_err(ser)?;
    let payload: QuestionPayload = serde_json::from_str(&payload_json).map_err(ser)?;

    Question::new(
        QuestionId::new(id),
        prompt,
        points,
        skill_tag.map(SkillTag::new),
        payload,
    )
    .map_err(ser)
}

pub(super) fn map_attempt_row(row: &SqliteRow) -> Result<Attempt, StorageError> {
    let id: AttemptId = row
        .try_get::<&str, _>("id")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let assessment_id = u64_from_i64(
        "assessment_id",
        row.try_get::<i64, _>("assessment_id").map_err(ser)?,
    )?;
    let learner_id = u64_from_i64(
        "learner_id",
        row.try_get::<i64, _>("learner_id").map_err(ser)?,
    )?;
    let started_at = row.try_get("started_at").map_err(ser)?;
    let status: AttemptStatus = row
        .try_get::<&str, _>("status")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let score = row
        .try_get::<Option<i64>, _>("score")
        .map_err(ser)?
        .map(|v| u32_from_i64("score", v))
        .transpose()?;
    let time_spent_seconds: Option<i64> = row.try_get("time_spent_seconds").map_err(ser)?;
    let submitted_at = row.try_get("submitted_at").map_err(ser)?;

    Attempt::from_persisted(
        id,
        AssessmentId::new(assessment_id),
        LearnerId::new(learner_id),
        started_at,
        status,
        score,
        time_spent_seconds,
        submitted_at,
    )
    .map_err(ser)
}

pub(super) fn map_response_row(row: &SqliteRow) -> Result<(QuestionId, Answer), StorageError> {
    let question_id = u64_from_i64(
        "question_id",
        row.try_get::<i64, _>("question_id").map_err(ser)?,
    )?;
    let answer_text: Option<String> = row.try_get("answer_text").map_err(ser)?;
    let payload_json: Option<String> = row.try_get("payload").map_err(ser)?;
    let payload: Option<AnswerPayload> = payload_json
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(ser)?;

    Ok((
        QuestionId::new(question_id),
        Answer::from_persisted(answer_text, payload),
    ))
}

pub(super) fn answer_columns(
    answer: &Answer,
) -> Result<(Option<String>, Option<String>), StorageError> {
    let payload = answer
        .payload()
        .map(serde_json::to_string)
        .transpose()
        .map_err(ser)?;
    Ok((answer.answer_text().map(str::to_owned), payload))
}
