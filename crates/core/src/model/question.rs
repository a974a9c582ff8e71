use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::model::answer::AnswerPayload;
use crate::model::ids::{OptionId, QuestionId};

//
// ─── SKILL TAG ─────────────────────────────────────────────────────────────────
//

/// Category label on a question, used to aggregate per-topic correctness
/// independent of the overall score.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SkillTag(String);

impl SkillTag {
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into().trim().to_owned())
    }

    /// Fallback tag for questions without an explicit skill tag.
    #[must_use]
    pub fn general() -> Self {
        Self("general".to_owned())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SkillTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── QUESTION PAYLOAD ──────────────────────────────────────────────────────────
//

/// One selectable option of a multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub id: OptionId,
    pub text: String,
    pub correct: bool,
}

/// One left/right pair of a matching question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPair {
    pub left: String,
    pub right: String,
}

/// Type-specific question payload.
///
/// A closed tagged union: each variant fixes which answer payload shape is
/// valid, and consumers match exhaustively instead of probing loose fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionPayload {
    MultipleChoice { options: Vec<ChoiceOption> },
    TrueFalse { correct: bool },
    ShortAnswer { expected: Option<String> },
    Essay { max_words: Option<u32> },
    FillBlank { blanks: Vec<String> },
    Matching { pairs: Vec<MatchPair> },
    Code { language: Option<String> },
}

/// Discriminant of `QuestionPayload`, handy for reporting and dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestionKind {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
    Essay,
    FillBlank,
    Matching,
    Code,
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QuestionKind::MultipleChoice => "multiple_choice",
            QuestionKind::TrueFalse => "true_false",
            QuestionKind::ShortAnswer => "short_answer",
            QuestionKind::Essay => "essay",
            QuestionKind::FillBlank => "fill_blank",
            QuestionKind::Matching => "matching",
            QuestionKind::Code => "code",
        };
        write!(f, "{name}")
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt must not be empty")]
    EmptyPrompt,

    #[error("question points must be positive")]
    ZeroPoints,

    #[error("multiple choice requires at least two options, got {got}")]
    TooFewOptions { got: usize },

    #[error("multiple choice requires at least one correct option")]
    NoCorrectOption,

    #[error("duplicate option id {0}")]
    DuplicateOption(OptionId),

    #[error("fill-blank requires at least one blank")]
    NoBlanks,

    #[error("matching requires at least one pair")]
    NoPairs,
}

/// A single question of an assessment: prompt, point value, optional skill
/// tag, and the type-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    points: u32,
    skill_tag: Option<SkillTag>,
    payload: QuestionPayload,
}

impl Question {
    /// Create a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when the prompt is empty, points are zero, or
    /// the payload fails its variant-specific checks.
    pub fn new(
        id: QuestionId,
        prompt: impl Into<String>,
        points: u32,
        skill_tag: Option<SkillTag>,
        payload: QuestionPayload,
    ) -> Result<Self, QuestionError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        if points == 0 {
            return Err(QuestionError::ZeroPoints);
        }
        validate_payload(&payload)?;

        Ok(Self {
            id,
            prompt,
            points,
            skill_tag,
            payload,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn points(&self) -> u32 {
        self.points
    }

    #[must_use]
    pub fn skill_tag(&self) -> Option<&SkillTag> {
        self.skill_tag.as_ref()
    }

    #[must_use]
    pub fn payload(&self) -> &QuestionPayload {
        &self.payload
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        match self.payload {
            QuestionPayload::MultipleChoice { .. } => QuestionKind::MultipleChoice,
            QuestionPayload::TrueFalse { .. } => QuestionKind::TrueFalse,
            QuestionPayload::ShortAnswer { .. } => QuestionKind::ShortAnswer,
            QuestionPayload::Essay { .. } => QuestionKind::Essay,
            QuestionPayload::FillBlank { .. } => QuestionKind::FillBlank,
            QuestionPayload::Matching { .. } => QuestionKind::Matching,
            QuestionPayload::Code { .. } => QuestionKind::Code,
        }
    }

    /// Whether this question is scored by value comparison (multiple choice
    /// and true/false). Everything else is graded manually or externally.
    #[must_use]
    pub fn is_auto_graded(&self) -> bool {
        matches!(
            self.kind(),
            QuestionKind::MultipleChoice | QuestionKind::TrueFalse
        )
    }

    /// Whether the given answer payload shape is valid for this question.
    #[must_use]
    pub fn accepts(&self, answer: &AnswerPayload) -> bool {
        match (&self.payload, answer) {
            (QuestionPayload::MultipleChoice { .. }, AnswerPayload::Choice { .. })
            | (QuestionPayload::TrueFalse { .. }, AnswerPayload::Boolean { .. })
            | (QuestionPayload::ShortAnswer { .. }, AnswerPayload::Text { .. })
            | (QuestionPayload::Essay { .. }, AnswerPayload::Text { .. })
            | (QuestionPayload::FillBlank { .. }, AnswerPayload::Text { .. })
            | (QuestionPayload::Code { .. }, AnswerPayload::Text { .. })
            | (QuestionPayload::Matching { .. }, AnswerPayload::Matching { .. }) => true,
            _ => false,
        }
    }

    /// The designated correct option of a multiple-choice question.
    #[must_use]
    pub fn correct_option(&self) -> Option<&ChoiceOption> {
        match &self.payload {
            QuestionPayload::MultipleChoice { options } => options.iter().find(|o| o.correct),
            _ => None,
        }
    }

    /// The option with the given id, for displaying a learner's selection.
    #[must_use]
    pub fn option(&self, id: OptionId) -> Option<&ChoiceOption> {
        match &self.payload {
            QuestionPayload::MultipleChoice { options } => options.iter().find(|o| o.id == id),
            _ => None,
        }
    }

    /// Soft word limit for essay questions, if any.
    #[must_use]
    pub fn max_words(&self) -> Option<u32> {
        match &self.payload {
            QuestionPayload::Essay { max_words } => *max_words,
            _ => None,
        }
    }
}

fn validate_payload(payload: &QuestionPayload) -> Result<(), QuestionError> {
    match payload {
        QuestionPayload::MultipleChoice { options } => {
            if options.len() < 2 {
                return Err(QuestionError::TooFewOptions { got: options.len() });
            }
            if !options.iter().any(|o| o.correct) {
                return Err(QuestionError::NoCorrectOption);
            }
            let mut seen = HashSet::new();
            for option in options {
                if !seen.insert(option.id) {
                    return Err(QuestionError::DuplicateOption(option.id));
                }
            }
            Ok(())
        }
        QuestionPayload::FillBlank { blanks } => {
            if blanks.is_empty() {
                return Err(QuestionError::NoBlanks);
            }
            Ok(())
        }
        QuestionPayload::Matching { pairs } => {
            if pairs.is_empty() {
                return Err(QuestionError::NoPairs);
            }
            Ok(())
        }
        QuestionPayload::TrueFalse { .. }
        | QuestionPayload::ShortAnswer { .. }
        | QuestionPayload::Essay { .. }
        | QuestionPayload::Code { .. } => Ok(()),
    }
}
