use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs a single, consolidated migration for the current schema.
///
/// Creates the full schema (assessments, questions with JSON payloads,
/// attempts, responses, and indexes).
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS assessments (
                    id INTEGER PRIMARY KEY,
                    title TEXT NOT NULL,
                    instructions TEXT,
                    time_limit_minutes INTEGER CHECK (time_limit_minutes > 0),
                    max_attempts INTEGER CHECK (max_attempts > 0),
                    passing_score INTEGER CHECK (passing_score BETWEEN 0 AND 100),
                    shuffle_questions INTEGER NOT NULL CHECK (shuffle_questions IN (0, 1)),
                    show_correct_answers INTEGER NOT NULL CHECK (show_correct_answers IN (0, 1)),
                    grading TEXT NOT NULL CHECK (grading IN ('automatic', 'manual'))
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS questions (
                    id INTEGER NOT NULL,
                    assessment_id INTEGER NOT NULL,
                    position INTEGER NOT NULL,
                    prompt TEXT NOT NULL,
                    points INTEGER NOT NULL CHECK (points > 0),
                    skill_tag TEXT,
                    payload TEXT NOT NULL,
                    PRIMARY KEY (id, assessment_id),
                    FOREIGN KEY (assessment_id) REFERENCES assessments(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS attempts (
                    id TEXT PRIMARY KEY,
                    assessment_id INTEGER NOT NULL,
                    learner_id INTEGER NOT NULL,
                    started_at TEXT NOT NULL,
                    status TEXT NOT NULL CHECK (status IN ('in_progress', 'submitted')),
                    score INTEGER,
                    time_spent_seconds INTEGER,
                    submitted_at TEXT,
                    FOREIGN KEY (assessment_id) REFERENCES assessments(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS responses (
                    attempt_id TEXT NOT NULL,
                    question_id INTEGER NOT NULL,
                    answer_text TEXT,
                    payload TEXT,
                    saved_at TEXT NOT NULL,
                    PRIMARY KEY (attempt_id, question_id),
                    FOREIGN KEY (attempt_id) REFERENCES attempts(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_questions_assessment_position
                    ON questions (assessment_id, position);
            ",
        )
        .execute(&mut *tx)
        .await?;

        // One open attempt per (assessment, learner); start_attempt relies on
        // this to stay idempotent under a double-mount.
        sqlx::query(
            r"
                CREATE UNIQUE INDEX IF NOT EXISTS idx_attempts_open_per_learner
                    ON attempts (assessment_id, learner_id)
                    WHERE status = 'in_progress';
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_attempts_assessment_learner_status
                    ON attempts (assessment_id, learner_id, status);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
