use serde::{Deserialize, Serialize};

use crate::model::ids::OptionId;
use crate::model::question::MatchPair;

/// Structured answer payload; shape depends on the question type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerPayload {
    /// Selected option of a multiple-choice question.
    Choice { option_id: OptionId },
    /// True/false selection.
    Boolean { value: bool },
    /// Free text: short answer, essay, fill-blank, code.
    Text { text: String },
    /// Learner-made pairing for a matching question.
    Matching { pairs: Vec<MatchPair> },
}

/// A learner's answer to one question: free-text representation and/or a
/// structured payload. Produced only during the session; pre-populated only
/// when resuming an in-progress attempt.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Answer {
    answer_text: Option<String>,
    payload: Option<AnswerPayload>,
}

impl Answer {
    #[must_use]
    pub fn choice(option_id: OptionId) -> Self {
        Self {
            answer_text: None,
            payload: Some(AnswerPayload::Choice { option_id }),
        }
    }

    #[must_use]
    pub fn boolean(value: bool) -> Self {
        Self {
            answer_text: None,
            payload: Some(AnswerPayload::Boolean { value }),
        }
    }

    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            answer_text: Some(text.clone()),
            payload: Some(AnswerPayload::Text { text }),
        }
    }

    #[must_use]
    pub fn matching(pairs: Vec<MatchPair>) -> Self {
        Self {
            answer_text: None,
            payload: Some(AnswerPayload::Matching { pairs }),
        }
    }

    /// Rehydrate an answer from persisted storage.
    #[must_use]
    pub fn from_persisted(answer_text: Option<String>, payload: Option<AnswerPayload>) -> Self {
        Self {
            answer_text,
            payload,
        }
    }

    #[must_use]
    pub fn answer_text(&self) -> Option<&str> {
        self.answer_text.as_deref()
    }

    #[must_use]
    pub fn payload(&self) -> Option<&AnswerPayload> {
        self.payload.as_ref()
    }

    /// An answer with no payload and no non-whitespace text is blank; blank
    /// answers do not count as answered.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match &self.payload {
            Some(AnswerPayload::Text { text }) => text.trim().is_empty(),
            Some(_) => false,
            None => self
                .answer_text
                .as_deref()
                .is_none_or(|t| t.trim().is_empty()),
        }
    }
}

/// Whitespace-separated word count, used for the essay soft limit.
#[must_use]
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
