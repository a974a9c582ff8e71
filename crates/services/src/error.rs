use assess_core::model::AttemptError;
use storage::repository::StorageError;

/// Errors surfaced by the assessment session engine.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("assessment has no questions")]
    Empty,

    #[error("failed to load assessment data")]
    Load(#[source] StorageError),

    #[error("attempt limit reached ({limit})")]
    AttemptLimitReached { limit: u32 },

    #[error("attempt already submitted")]
    AlreadySubmitted,

    #[error("session is not in progress")]
    NotInProgress,

    #[error("question index {index} out of bounds (total {total})")]
    OutOfBounds { index: usize, total: usize },

    #[error("question is not part of this assessment")]
    UnknownQuestion,

    #[error("answer shape does not match the question type")]
    IncompatibleAnswer,

    #[error("failed to submit attempt")]
    Submit(#[source] StorageError),

    #[error(transparent)]
    Attempt(#[from] AttemptError),
}
