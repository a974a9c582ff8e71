mod answer;
mod assessment;
mod attempt;
mod ids;
mod question;

pub use answer::{Answer, AnswerPayload, word_count};
pub use assessment::{Assessment, AssessmentError, AssessmentSettings, GradingMode};
pub use attempt::{Attempt, AttemptError, AttemptStatus};
pub use ids::{AssessmentId, AttemptId, LearnerId, OptionId, ParseIdError, QuestionId};
pub use question::{
    ChoiceOption, MatchPair, Question, QuestionError, QuestionKind, QuestionPayload, SkillTag,
};
