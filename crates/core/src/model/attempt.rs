use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{AssessmentId, AttemptId, LearnerId};

/// Lifecycle of an attempt. `Submitted` is terminal: once reached, no further
/// answer mutation is accepted anywhere in the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStatus {
    InProgress,
    Submitted,
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptStatus::InProgress => write!(f, "in_progress"),
            AttemptStatus::Submitted => write!(f, "submitted"),
        }
    }
}

impl FromStr for AttemptStatus {
    type Err = AttemptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(AttemptStatus::InProgress),
            "submitted" => Ok(AttemptStatus::Submitted),
            other => Err(AttemptError::UnknownStatus {
                provided: other.to_owned(),
            }),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("attempt is already submitted")]
    AlreadySubmitted,

    #[error("submitted_at is before started_at")]
    InvalidTimeRange,

    #[error("submitted attempt is missing its submission timestamp")]
    MissingSubmittedAt,

    #[error("in-progress attempt must not carry a score")]
    PrematureScore,

    #[error("unknown attempt status: {provided}")]
    UnknownStatus { provided: String },
}

/// One learner's instance of taking an assessment, from start to submission.
///
/// Created when the learner begins; mutated only through `submit`, after
/// which it is immutable.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    id: AttemptId,
    assessment_id: AssessmentId,
    learner_id: LearnerId,
    started_at: DateTime<Utc>,
    status: AttemptStatus,
    score: Option<u32>,
    time_spent_seconds: Option<i64>,
    submitted_at: Option<DateTime<Utc>>,
}

impl Attempt {
    /// Begin a fresh attempt.
    #[must_use]
    pub fn start(
        id: AttemptId,
        assessment_id: AssessmentId,
        learner_id: LearnerId,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            assessment_id,
            learner_id,
            started_at,
            status: AttemptStatus::InProgress,
            score: None,
            time_spent_seconds: None,
            submitted_at: None,
        }
    }

    /// Rehydrate an attempt from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError` when the persisted fields are inconsistent with
    /// the status.
    pub fn from_persisted(
        id: AttemptId,
        assessment_id: AssessmentId,
        learner_id: LearnerId,
        started_at: DateTime<Utc>,
        status: AttemptStatus,
        score: Option<u32>,
        time_spent_seconds: Option<i64>,
        submitted_at: Option<DateTime<Utc>>,
    ) -> Result<Self, AttemptError> {
        match status {
            AttemptStatus::InProgress => {
                if score.is_some() {
                    return Err(AttemptError::PrematureScore);
                }
            }
            AttemptStatus::Submitted => {
                let at = submitted_at.ok_or(AttemptError::MissingSubmittedAt)?;
                if at < started_at {
                    return Err(AttemptError::InvalidTimeRange);
                }
            }
        }

        Ok(Self {
            id,
            assessment_id,
            learner_id,
            started_at,
            status,
            score,
            time_spent_seconds,
            submitted_at,
        })
    }

    /// One-shot terminal transition to `Submitted`.
    ///
    /// `score` is `None` for manually graded assessments.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::AlreadySubmitted` on a second call, and
    /// `AttemptError::InvalidTimeRange` for a submission timestamp before the
    /// attempt started.
    pub fn submit(
        &mut self,
        score: Option<u32>,
        time_spent_seconds: i64,
        submitted_at: DateTime<Utc>,
    ) -> Result<(), AttemptError> {
        if self.status == AttemptStatus::Submitted {
            return Err(AttemptError::AlreadySubmitted);
        }
        if submitted_at < self.started_at {
            return Err(AttemptError::InvalidTimeRange);
        }

        self.status = AttemptStatus::Submitted;
        self.score = score;
        self.time_spent_seconds = Some(time_spent_seconds);
        self.submitted_at = Some(submitted_at);
        Ok(())
    }

    #[must_use]
    pub fn id(&self) -> AttemptId {
        self.id
    }

    #[must_use]
    pub fn assessment_id(&self) -> AssessmentId {
        self.assessment_id
    }

    #[must_use]
    pub fn learner_id(&self) -> LearnerId {
        self.learner_id
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn status(&self) -> AttemptStatus {
        self.status
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.status == AttemptStatus::Submitted
    }

    #[must_use]
    pub fn score(&self) -> Option<u32> {
        self.score
    }

    #[must_use]
    pub fn time_spent_seconds(&self) -> Option<i64> {
        self.time_spent_seconds
    }

    #[must_use]
    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }
}
