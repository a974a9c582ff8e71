use std::collections::HashMap;

use chrono::{DateTime, Utc};

use assess_core::model::{
    Answer, AnswerPayload, Assessment, GradingMode, Question, QuestionId, QuestionPayload,
    SkillTag,
};
use assess_core::scoring::ScoreReport;

//
// ─── OUTCOME ────────────────────────────────────────────────────────────────────
//

/// Which path drove the attempt into its terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    Manual,
    Timeout,
}

/// Terminal record of a submitted attempt.
///
/// `report` is present only for automatically graded assessments; manually
/// graded ones submit without a score and defer to external review.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptOutcome {
    pub trigger: SubmitTrigger,
    pub report: Option<ScoreReport>,
    pub time_spent_seconds: i64,
    pub submitted_at: DateTime<Utc>,
}

//
// ─── RESULTS VIEW ───────────────────────────────────────────────────────────────
//

/// Per-skill line in the results breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillRow {
    pub skill: SkillTag,
    pub correct: u32,
    pub total: u32,
    pub percent: f64,
}

/// Per-question line in the answer review, shown only when the assessment
/// allows revealing correct answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRow {
    pub question_id: QuestionId,
    pub prompt: String,
    pub points: u32,
    pub answered: bool,
    /// `None` for question types this engine does not auto-grade.
    pub correct: Option<bool>,
    pub learner_answer: Option<String>,
    pub correct_answer: Option<String>,
}

/// Render-ready summary of a finished attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultsView {
    pub score: Option<u32>,
    pub total_points: u32,
    pub percentage: Option<f64>,
    pub passed: Option<bool>,
    pub unanswered: u32,
    pub time_spent: String,
    pub skills: Vec<SkillRow>,
    pub review: Vec<ReviewRow>,
}

impl ResultsView {
    #[must_use]
    pub fn build(
        assessment: &Assessment,
        questions: &[Question],
        answers: &HashMap<QuestionId, Answer>,
        outcome: &AttemptOutcome,
    ) -> Self {
        let total_points = assess_core::scoring::total_points(questions);
        let (score, percentage, skills) = match &outcome.report {
            Some(report) => (
                Some(report.score),
                Some(report.percentage()),
                report
                    .skill_scores
                    .iter()
                    .map(|(skill, s)| SkillRow {
                        skill: skill.clone(),
                        correct: s.correct,
                        total: s.total,
                        percent: s.percent(),
                    })
                    .collect(),
            ),
            None => (None, None, Vec::new()),
        };

        let passed = match (percentage, assessment.passing_score()) {
            (Some(pct), Some(required)) => Some(pct >= f64::from(required)),
            _ => None,
        };

        let unanswered = questions
            .iter()
            .filter(|q| !answers.get(&q.id()).is_some_and(|a| !a.is_blank()))
            .count() as u32;

        let review = if assessment.show_correct_answers() {
            questions
                .iter()
                .map(|q| review_row(q, answers.get(&q.id())))
                .collect()
        } else {
            Vec::new()
        };

        Self {
            score,
            total_points,
            percentage,
            passed,
            unanswered,
            time_spent: format_time_spent(outcome.time_spent_seconds),
            skills,
            review,
        }
    }

    /// True when the attempt was graded automatically on submission.
    #[must_use]
    pub fn is_graded(&self) -> bool {
        self.score.is_some()
    }
}

/// Whether the grading mode produces a score at submission time.
#[must_use]
pub fn grades_on_submit(mode: GradingMode) -> bool {
    mode == GradingMode::Automatic
}

fn review_row(question: &Question, answer: Option<&Answer>) -> ReviewRow {
    let answered = answer.is_some_and(|a| !a.is_blank());
    ReviewRow {
        question_id: question.id(),
        prompt: question.prompt().to_owned(),
        points: question.points(),
        answered,
        correct: auto_graded_verdict(question, answer),
        learner_answer: answer.and_then(|a| display_answer(question, a)),
        correct_answer: display_correct_answer(question),
    }
}

fn auto_graded_verdict(question: &Question, answer: Option<&Answer>) -> Option<bool> {
    if !question.is_auto_graded() {
        return None;
    }
    let verdict = match (question.payload(), answer.and_then(Answer::payload)) {
        (QuestionPayload::MultipleChoice { options }, Some(AnswerPayload::Choice { option_id })) => {
            options.iter().any(|o| o.correct && o.id == *option_id)
        }
        (QuestionPayload::TrueFalse { correct }, Some(AnswerPayload::Boolean { value })) => {
            correct == value
        }
        _ => false,
    };
    Some(verdict)
}

fn display_answer(question: &Question, answer: &Answer) -> Option<String> {
    match answer.payload() {
        Some(AnswerPayload::Choice { option_id }) => question
            .option(*option_id)
            .map(|o| o.text.clone())
            .or_else(|| Some(option_id.to_string())),
        Some(AnswerPayload::Boolean { value }) => Some(display_bool(*value)),
        Some(AnswerPayload::Text { text }) => Some(text.clone()),
        Some(AnswerPayload::Matching { pairs }) => Some(
            pairs
                .iter()
                .map(|p| format!("{}: {}", p.left, p.right))
                .collect::<Vec<_>>()
                .join(", "),
        ),
        None => answer.answer_text().map(str::to_owned),
    }
}

fn display_correct_answer(question: &Question) -> Option<String> {
    match question.payload() {
        QuestionPayload::MultipleChoice { .. } => {
            question.correct_option().map(|o| o.text.clone())
        }
        QuestionPayload::TrueFalse { correct } => Some(display_bool(*correct)),
        QuestionPayload::ShortAnswer { expected } => expected.clone(),
        _ => None,
    }
}

fn display_bool(value: bool) -> String {
    if value { "True" } else { "False" }.to_owned()
}

//
// ─── FORMATTING ─────────────────────────────────────────────────────────────────
//

/// Format remaining seconds as `MM:SS`, or `H:MM:SS` past an hour.
#[must_use]
pub fn format_clock(seconds: u32) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes:02}:{secs:02}")
    }
}

/// Format elapsed attempt time for the results screen.
#[must_use]
pub fn format_time_spent(seconds: i64) -> String {
    let clamped = u32::try_from(seconds.max(0)).unwrap_or(u32::MAX);
    format_clock(clamped)
}

/// Word-counter label for essay questions, e.g. `620 / 500`.
#[must_use]
pub fn format_word_count(count: usize, max_words: Option<u32>) -> String {
    match max_words {
        Some(limit) => format!("{count} / {limit}"),
        None => count.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assess_core::model::{
        AssessmentId, AssessmentSettings, ChoiceOption, OptionId, QuestionId,
    };
    use assess_core::scoring;
    use assess_core::time::fixed_now;

    fn choice_question(id: u64, correct_option: u64, skill: &str) -> Question {
        Question::new(
            QuestionId::new(id),
            format!("Q{id}"),
            2,
            Some(SkillTag::new(skill)),
            QuestionPayload::MultipleChoice {
                options: vec![
                    ChoiceOption {
                        id: OptionId::new(1),
                        text: "Alpha".to_owned(),
                        correct: correct_option == 1,
                    },
                    ChoiceOption {
                        id: OptionId::new(2),
                        text: "Beta".to_owned(),
                        correct: correct_option == 2,
                    },
                ],
            },
        )
        .unwrap()
    }

    fn graded_assessment(show_correct_answers: bool) -> Assessment {
        Assessment::new(
            AssessmentId::new(1),
            "Quiz",
            None,
            AssessmentSettings {
                passing_score: Some(70),
                show_correct_answers,
                ..AssessmentSettings::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn builds_graded_view_with_skill_rows_and_review() {
        let questions = vec![choice_question(1, 1, "algebra"), choice_question(2, 2, "geometry")];
        let mut answers = HashMap::new();
        answers.insert(QuestionId::new(1), Answer::choice(OptionId::new(1)));

        let report = scoring::score(&questions, &answers);
        let outcome = AttemptOutcome {
            trigger: SubmitTrigger::Manual,
            report: Some(report),
            time_spent_seconds: 95,
            submitted_at: fixed_now(),
        };

        let view = ResultsView::build(&graded_assessment(true), &questions, &answers, &outcome);
        assert_eq!(view.score, Some(2));
        assert_eq!(view.total_points, 4);
        assert_eq!(view.percentage, Some(50.0));
        assert_eq!(view.passed, Some(false));
        assert_eq!(view.unanswered, 1);
        assert_eq!(view.time_spent, "01:35");
        assert_eq!(view.skills.len(), 2);

        assert_eq!(view.review.len(), 2);
        assert_eq!(view.review[0].correct, Some(true));
        assert_eq!(view.review[0].learner_answer.as_deref(), Some("Alpha"));
        assert_eq!(view.review[0].correct_answer.as_deref(), Some("Alpha"));
        assert_eq!(view.review[1].correct, Some(false));
        assert!(!view.review[1].answered);
    }

    #[test]
    fn review_credits_any_correct_flagged_option() {
        let question = Question::new(
            QuestionId::new(1),
            "Pick any correct",
            2,
            None,
            QuestionPayload::MultipleChoice {
                options: vec![
                    ChoiceOption {
                        id: OptionId::new(1),
                        text: "Alpha".to_owned(),
                        correct: true,
                    },
                    ChoiceOption {
                        id: OptionId::new(2),
                        text: "Beta".to_owned(),
                        correct: true,
                    },
                    ChoiceOption {
                        id: OptionId::new(3),
                        text: "Gamma".to_owned(),
                        correct: false,
                    },
                ],
            },
        )
        .unwrap();
        let questions = vec![question];
        let mut answers = HashMap::new();
        // The learner picked the second of the two correct-flagged options.
        answers.insert(QuestionId::new(1), Answer::choice(OptionId::new(2)));

        let outcome = AttemptOutcome {
            trigger: SubmitTrigger::Manual,
            report: Some(scoring::score(&questions, &answers)),
            time_spent_seconds: 30,
            submitted_at: fixed_now(),
        };
        let view = ResultsView::build(&graded_assessment(true), &questions, &answers, &outcome);

        assert_eq!(view.score, Some(2));
        assert_eq!(view.review[0].correct, Some(true));
        assert_eq!(view.review[0].learner_answer.as_deref(), Some("Beta"));
    }

    #[test]
    fn review_is_withheld_when_answers_are_hidden() {
        let questions = vec![choice_question(1, 1, "algebra")];
        let answers = HashMap::new();
        let outcome = AttemptOutcome {
            trigger: SubmitTrigger::Timeout,
            report: Some(scoring::score(&questions, &answers)),
            time_spent_seconds: 60,
            submitted_at: fixed_now(),
        };

        let view = ResultsView::build(&graded_assessment(false), &questions, &answers, &outcome);
        assert!(view.review.is_empty());
        assert_eq!(view.unanswered, 1);
    }

    #[test]
    fn manual_grading_yields_no_score_or_pass_verdict() {
        let questions = vec![choice_question(1, 1, "algebra")];
        let answers = HashMap::new();
        let outcome = AttemptOutcome {
            trigger: SubmitTrigger::Manual,
            report: None,
            time_spent_seconds: 10,
            submitted_at: fixed_now(),
        };

        let view = ResultsView::build(&graded_assessment(true), &questions, &answers, &outcome);
        assert_eq!(view.score, None);
        assert_eq!(view.percentage, None);
        assert_eq!(view.passed, None);
        assert!(!view.is_graded());
        assert!(view.skills.is_empty());
    }

    #[test]
    fn clock_formatting() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(59), "00:59");
        assert_eq!(format_clock(300), "05:00");
        assert_eq!(format_clock(3661), "1:01:01");
    }

    #[test]
    fn word_count_formatting() {
        assert_eq!(format_word_count(620, Some(500)), "620 / 500");
        assert_eq!(format_word_count(12, None), "12");
    }
}
