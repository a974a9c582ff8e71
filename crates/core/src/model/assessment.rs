use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::AssessmentId;

/// How an assessment's submissions are graded.
///
/// `Automatic` quizzes are scored immediately on submission by the scoring
/// engine; `Manual` assessments only change status on submission and leave
/// grading to an external reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradingMode {
    Automatic,
    Manual,
}

/// Per-assessment session settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentSettings {
    /// Countdown length; untimed when absent.
    pub time_limit_minutes: Option<u32>,
    /// How many submitted attempts a learner may accumulate; unlimited when absent.
    pub max_attempts: Option<u32>,
    /// Passing threshold as a percentage (0-100); no pass/fail when absent.
    pub passing_score: Option<u32>,
    pub shuffle_questions: bool,
    pub show_correct_answers: bool,
    pub grading: GradingMode,
}

impl Default for AssessmentSettings {
    fn default() -> Self {
        Self {
            time_limit_minutes: None,
            max_attempts: None,
            passing_score: None,
            shuffle_questions: false,
            show_correct_answers: false,
            grading: GradingMode::Automatic,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AssessmentError {
    #[error("assessment title must not be empty")]
    EmptyTitle,

    #[error("time limit must be positive when present")]
    ZeroTimeLimit,

    #[error("max attempts must be positive when present")]
    ZeroMaxAttempts,

    #[error("passing score must be a percentage (0-100), got {provided}")]
    InvalidPassingScore { provided: u32 },
}

/// Assessment metadata as presented to a session.
///
/// Immutable for the duration of a session once loaded. Total points are
/// derived from the question set (see `scoring::total_points`), never stored
/// here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    id: AssessmentId,
    title: String,
    instructions: Option<String>,
    settings: AssessmentSettings,
}

impl Assessment {
    /// Create a validated assessment.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError` for an empty title or out-of-range settings.
    pub fn new(
        id: AssessmentId,
        title: impl Into<String>,
        instructions: Option<String>,
        settings: AssessmentSettings,
    ) -> Result<Self, AssessmentError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(AssessmentError::EmptyTitle);
        }
        if settings.time_limit_minutes == Some(0) {
            return Err(AssessmentError::ZeroTimeLimit);
        }
        if settings.max_attempts == Some(0) {
            return Err(AssessmentError::ZeroMaxAttempts);
        }
        if let Some(score) = settings.passing_score {
            if score > 100 {
                return Err(AssessmentError::InvalidPassingScore { provided: score });
            }
        }

        Ok(Self {
            id,
            title,
            instructions,
            settings,
        })
    }

    #[must_use]
    pub fn id(&self) -> AssessmentId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }

    #[must_use]
    pub fn settings(&self) -> &AssessmentSettings {
        &self.settings
    }

    #[must_use]
    pub fn time_limit_minutes(&self) -> Option<u32> {
        self.settings.time_limit_minutes
    }

    /// Countdown duration in seconds, if the assessment is timed.
    #[must_use]
    pub fn time_limit_seconds(&self) -> Option<u32> {
        self.settings.time_limit_minutes.map(|m| m * 60)
    }

    #[must_use]
    pub fn max_attempts(&self) -> Option<u32> {
        self.settings.max_attempts
    }

    #[must_use]
    pub fn passing_score(&self) -> Option<u32> {
        self.settings.passing_score
    }

    #[must_use]
    pub fn shuffle_questions(&self) -> bool {
        self.settings.shuffle_questions
    }

    #[must_use]
    pub fn show_correct_answers(&self) -> bool {
        self.settings.show_correct_answers
    }

    #[must_use]
    pub fn grading(&self) -> GradingMode {
        self.settings.grading
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_title() {
        let err = Assessment::new(
            AssessmentId::new(1),
            "  ",
            None,
            AssessmentSettings::default(),
        )
        .unwrap_err();
        assert_eq!(err, AssessmentError::EmptyTitle);
    }

    #[test]
    fn rejects_zero_time_limit() {
        let settings = AssessmentSettings {
            time_limit_minutes: Some(0),
            ..AssessmentSettings::default()
        };
        let err =
            Assessment::new(AssessmentId::new(1), "Quiz", None, settings).unwrap_err();
        assert_eq!(err, AssessmentError::ZeroTimeLimit);
    }

    #[test]
    fn rejects_passing_score_above_hundred() {
        let settings = AssessmentSettings {
            passing_score: Some(120),
            ..AssessmentSettings::default()
        };
        let err =
            Assessment::new(AssessmentId::new(1), "Quiz", None, settings).unwrap_err();
        assert_eq!(err, AssessmentError::InvalidPassingScore { provided: 120 });
    }

    #[test]
    fn time_limit_converts_to_seconds() {
        let settings = AssessmentSettings {
            time_limit_minutes: Some(30),
            ..AssessmentSettings::default()
        };
        let assessment = Assessment::new(AssessmentId::new(1), "Quiz", None, settings).unwrap();
        assert_eq!(assessment.time_limit_seconds(), Some(1800));

        let untimed = Assessment::new(
            AssessmentId::new(2),
            "Untimed",
            None,
            AssessmentSettings::default(),
        )
        .unwrap();
        assert_eq!(untimed.time_limit_seconds(), None);
    }
}
