use std::collections::{BTreeMap, HashMap};

use crate::model::{Answer, AnswerPayload, Question, QuestionId, QuestionPayload, SkillTag};

//
// ─── REPORT TYPES ──────────────────────────────────────────────────────────────
//

/// Per-skill correctness tally. `correct <= total` always holds, and summing
/// `total` over all tags yields the number of questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SkillScore {
    pub correct: u32,
    pub total: u32,
}

impl SkillScore {
    /// Share of the group answered correctly, as a percentage.
    #[must_use]
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        f64::from(self.correct) / f64::from(self.total) * 100.0
    }
}

/// Outcome of scoring one attempt: points earned, points available, and the
/// per-skill breakdown. Derived fresh at scoring time, never persisted by the
/// engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreReport {
    pub score: u32,
    pub total_points: u32,
    pub skill_scores: BTreeMap<SkillTag, SkillScore>,
}

impl ScoreReport {
    /// Score as a percentage of the available points.
    #[must_use]
    pub fn percentage(&self) -> f64 {
        if self.total_points == 0 {
            return 0.0;
        }
        f64::from(self.score) / f64::from(self.total_points) * 100.0
    }
}

//
// ─── SCORING ───────────────────────────────────────────────────────────────────
//

/// Sum of points over all questions, answered or not.
#[must_use]
pub fn total_points(questions: &[Question]) -> u32 {
    questions.iter().map(Question::points).sum()
}

/// Score an answer map against a question set.
///
/// Only multiple-choice and true/false questions are auto-graded, by value
/// equality against the designated correct value. Every other kind counts
/// toward `total_points` but never toward `score`; manual or external review
/// owns those. An unanswered question scores exactly like a wrong one.
///
/// Pure and deterministic: the same inputs always produce identical output
/// (the skill breakdown is a `BTreeMap` so iteration order is stable), which
/// is what makes idempotent re-submission guards testable.
#[must_use]
pub fn score(questions: &[Question], answers: &HashMap<QuestionId, Answer>) -> ScoreReport {
    let mut earned = 0_u32;
    let mut skill_scores: BTreeMap<SkillTag, SkillScore> = BTreeMap::new();

    for question in questions {
        let tag = question
            .skill_tag()
            .cloned()
            .unwrap_or_else(SkillTag::general);
        let entry = skill_scores.entry(tag).or_default();
        entry.total += 1;

        if is_correct(question, answers.get(&question.id())) {
            earned += question.points();
            entry.correct += 1;
        }
    }

    ScoreReport {
        score: earned,
        total_points: total_points(questions),
        skill_scores,
    }
}

/// Value-equality correctness check for auto-gradable kinds.
fn is_correct(question: &Question, answer: Option<&Answer>) -> bool {
    let Some(payload) = answer.and_then(Answer::payload) else {
        return false;
    };

    match (question.payload(), payload) {
        // Any correct-flagged option earns the points; a question may carry
        // more than one.
        (QuestionPayload::MultipleChoice { options }, AnswerPayload::Choice { option_id }) => {
            options.iter().any(|o| o.correct && o.id == *option_id)
        }
        (QuestionPayload::TrueFalse { correct }, AnswerPayload::Boolean { value }) => {
            value == correct
        }
        // Short answer, essay, fill-blank, matching, and code are never
        // auto-graded here; that is a scope boundary, not an omission.
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChoiceOption, OptionId, QuestionKind};

    fn mc_question(id: u64, points: u32, tag: Option<&str>) -> Question {
        Question::new(
            QuestionId::new(id),
            format!("Question {id}"),
            points,
            tag.map(SkillTag::new),
            QuestionPayload::MultipleChoice {
                options: vec![
                    ChoiceOption {
                        id: OptionId::new(1),
                        text: "Right".to_owned(),
                        correct: true,
                    },
                    ChoiceOption {
                        id: OptionId::new(2),
                        text: "Wrong".to_owned(),
                        correct: false,
                    },
                ],
            },
        )
        .unwrap()
    }

    fn tf_question(id: u64, points: u32, correct: bool, tag: Option<&str>) -> Question {
        Question::new(
            QuestionId::new(id),
            format!("Question {id}"),
            points,
            tag.map(SkillTag::new),
            QuestionPayload::TrueFalse { correct },
        )
        .unwrap()
    }

    fn essay_question(id: u64, points: u32) -> Question {
        Question::new(
            QuestionId::new(id),
            format!("Question {id}"),
            points,
            None,
            QuestionPayload::Essay {
                max_words: Some(500),
            },
        )
        .unwrap()
    }

    #[test]
    fn four_choice_questions_half_right_scores_half() {
        // Q1 correct, Q2 wrong, Q3 correct, Q4 blank; 2 points each.
        let questions: Vec<_> = (1..=4).map(|id| mc_question(id, 2, None)).collect();
        let mut answers = HashMap::new();
        answers.insert(QuestionId::new(1), Answer::choice(OptionId::new(1)));
        answers.insert(QuestionId::new(2), Answer::choice(OptionId::new(2)));
        answers.insert(QuestionId::new(3), Answer::choice(OptionId::new(1)));

        let report = score(&questions, &answers);
        assert_eq!(report.score, 4);
        assert_eq!(report.total_points, 8);
        assert!((report.percentage() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn score_never_exceeds_total_points() {
        let questions = vec![
            mc_question(1, 3, Some("algebra")),
            tf_question(2, 2, true, Some("algebra")),
            essay_question(3, 5),
        ];
        let mut answers = HashMap::new();
        answers.insert(QuestionId::new(1), Answer::choice(OptionId::new(1)));
        answers.insert(QuestionId::new(2), Answer::boolean(true));
        answers.insert(QuestionId::new(3), Answer::text("a long essay"));

        let report = score(&questions, &answers);
        assert!(report.score <= report.total_points);
        // Essay contributes to the total but never to the score.
        assert_eq!(report.score, 5);
        assert_eq!(report.total_points, 10);
    }

    #[test]
    fn scoring_is_deterministic() {
        let questions = vec![
            mc_question(1, 2, Some("geometry")),
            tf_question(2, 1, false, Some("algebra")),
            essay_question(3, 4),
        ];
        let mut answers = HashMap::new();
        answers.insert(QuestionId::new(1), Answer::choice(OptionId::new(2)));
        answers.insert(QuestionId::new(2), Answer::boolean(false));

        assert_eq!(score(&questions, &answers), score(&questions, &answers));
    }

    #[test]
    fn skill_totals_cover_every_question() {
        let questions = vec![
            mc_question(1, 2, Some("algebra")),
            mc_question(2, 2, Some("algebra")),
            tf_question(3, 1, true, Some("geometry")),
            essay_question(4, 5), // untagged, lands in "general"
        ];
        let mut answers = HashMap::new();
        answers.insert(QuestionId::new(1), Answer::choice(OptionId::new(1)));
        answers.insert(QuestionId::new(3), Answer::boolean(false));

        let report = score(&questions, &answers);

        let sum: u32 = report.skill_scores.values().map(|s| s.total).sum();
        assert_eq!(sum as usize, questions.len());
        for skill in report.skill_scores.values() {
            assert!(skill.correct <= skill.total);
        }

        let algebra = &report.skill_scores[&SkillTag::new("algebra")];
        assert_eq!((algebra.correct, algebra.total), (1, 2));
        let geometry = &report.skill_scores[&SkillTag::new("geometry")];
        assert_eq!((geometry.correct, geometry.total), (0, 1));
        let general = &report.skill_scores[&SkillTag::general()];
        assert_eq!((general.correct, general.total), (0, 1));
    }

    #[test]
    fn every_correct_flagged_option_earns_the_points() {
        // Two of three options are flagged correct.
        let question = Question::new(
            QuestionId::new(1),
            "Pick any correct",
            2,
            None,
            QuestionPayload::MultipleChoice {
                options: vec![
                    ChoiceOption {
                        id: OptionId::new(1),
                        text: "Also right".to_owned(),
                        correct: true,
                    },
                    ChoiceOption {
                        id: OptionId::new(2),
                        text: "Right".to_owned(),
                        correct: true,
                    },
                    ChoiceOption {
                        id: OptionId::new(3),
                        text: "Wrong".to_owned(),
                        correct: false,
                    },
                ],
            },
        )
        .unwrap();
        let questions = vec![question];

        for option in [1, 2] {
            let mut answers = HashMap::new();
            answers.insert(QuestionId::new(1), Answer::choice(OptionId::new(option)));
            assert_eq!(score(&questions, &answers).score, 2);
        }

        let mut answers = HashMap::new();
        answers.insert(QuestionId::new(1), Answer::choice(OptionId::new(3)));
        assert_eq!(score(&questions, &answers).score, 0);
    }

    #[test]
    fn unanswered_scores_like_incorrect() {
        let questions = vec![mc_question(1, 2, None), mc_question(2, 2, None)];

        let mut wrong = HashMap::new();
        wrong.insert(QuestionId::new(1), Answer::choice(OptionId::new(2)));
        let blank = HashMap::new();

        assert_eq!(score(&questions, &wrong).score, 0);
        assert_eq!(score(&questions, &blank).score, 0);
    }

    #[test]
    fn mismatched_payload_counts_as_wrong() {
        let questions = vec![tf_question(1, 2, true, None)];
        let mut answers = HashMap::new();
        // Text answer against a true/false question.
        answers.insert(QuestionId::new(1), Answer::text("true"));

        let report = score(&questions, &answers);
        assert_eq!(report.score, 0);
        assert_eq!(questions[0].kind(), QuestionKind::TrueFalse);
    }
}
