use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use assess_core::model::{
    Answer, Assessment, AssessmentId, Attempt, AttemptId, LearnerId, Question, QuestionId,
};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Read/write contract for assessment content (the CMS side owns writes; the
/// session engine only reads).
#[async_trait]
pub trait AssessmentRepository: Send + Sync {
    /// Persist or update an assessment.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the assessment cannot be stored.
    async fn upsert_assessment(&self, assessment: &Assessment) -> Result<(), StorageError>;

    /// Persist or update a question under an assessment, appended in position
    /// order on first insert.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn upsert_question(
        &self,
        assessment_id: AssessmentId,
        question: &Question,
    ) -> Result<(), StorageError>;

    /// Fetch an assessment by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_assessment(&self, id: AssessmentId) -> Result<Assessment, StorageError>;

    /// Fetch the assessment's questions in authored order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures; an empty list is not an
    /// error at this layer.
    async fn list_questions(
        &self,
        assessment_id: AssessmentId,
    ) -> Result<Vec<Question>, StorageError>;
}

/// Durable attempt state: the PersistenceGateway contract the session engine
/// depends on but does not implement.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Begin or resume an attempt.
    ///
    /// Idempotent per (learner, assessment): when an in-progress attempt
    /// already exists it is returned unchanged, so a double-mounted session
    /// converges on one attempt.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the attempt cannot be created or read.
    async fn start_attempt(
        &self,
        assessment_id: AssessmentId,
        learner_id: LearnerId,
        now: DateTime<Utc>,
    ) -> Result<Attempt, StorageError>;

    /// Fetch an attempt by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_attempt(&self, id: AttemptId) -> Result<Attempt, StorageError>;

    /// Persist one in-progress response (best effort; the engine debounces
    /// calls and retries dirty entries on the next flush cycle).
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` once the attempt is submitted, or
    /// other storage errors.
    async fn save_response(
        &self,
        attempt_id: AttemptId,
        question_id: QuestionId,
        answer: &Answer,
    ) -> Result<(), StorageError>;

    /// Fetch every saved response of an attempt, used to pre-populate the
    /// session when resuming.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_responses(
        &self,
        attempt_id: AttemptId,
    ) -> Result<Vec<(QuestionId, Answer)>, StorageError>;

    /// Terminal call: store the final response set and flip the attempt to
    /// submitted.
    ///
    /// `score` is `None` for manually graded assessments.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when the attempt is already
    /// submitted, so a duplicate submission can never double-count.
    async fn submit_attempt(
        &self,
        attempt_id: AttemptId,
        responses: &[(QuestionId, Answer)],
        score: Option<u32>,
        time_spent_seconds: i64,
        submitted_at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Number of submitted attempts the learner has accumulated for the
    /// assessment, for max-attempts enforcement.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn count_submitted(
        &self,
        assessment_id: AssessmentId,
        learner_id: LearnerId,
    ) -> Result<u32, StorageError>;
}

//
// ─── IN-MEMORY GATEWAY ─────────────────────────────────────────────────────────
//

/// Simple in-memory gateway implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryGateway {
    assessments: Arc<Mutex<HashMap<AssessmentId, Assessment>>>,
    questions: Arc<Mutex<HashMap<AssessmentId, Vec<Question>>>>,
    attempts: Arc<Mutex<HashMap<AttemptId, Attempt>>>,
    responses: Arc<Mutex<HashMap<(AttemptId, QuestionId), Answer>>>,
}

impl InMemoryGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock<'a, T>(m: &'a Mutex<T>) -> Result<std::sync::MutexGuard<'a, T>, StorageError> {
    m.lock().map_err(|e| StorageError::Connection(e.to_string()))
}

#[async_trait]
impl AssessmentRepository for InMemoryGateway {
    async fn upsert_assessment(&self, assessment: &Assessment) -> Result<(), StorageError> {
        let mut guard = lock(&self.assessments)?;
        guard.insert(assessment.id(), assessment.clone());
        Ok(())
    }

    async fn upsert_question(
        &self,
        assessment_id: AssessmentId,
        question: &Question,
    ) -> Result<(), StorageError> {
        let mut guard = lock(&self.questions)?;
        let questions = guard.entry(assessment_id).or_default();
        match questions.iter_mut().find(|q| q.id() == question.id()) {
            Some(existing) => *existing = question.clone(),
            None => questions.push(question.clone()),
        }
        Ok(())
    }

    async fn get_assessment(&self, id: AssessmentId) -> Result<Assessment, StorageError> {
        let guard = lock(&self.assessments)?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_questions(
        &self,
        assessment_id: AssessmentId,
    ) -> Result<Vec<Question>, StorageError> {
        let guard = lock(&self.questions)?;
        Ok(guard.get(&assessment_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl AttemptRepository for InMemoryGateway {
    async fn start_attempt(
        &self,
        assessment_id: AssessmentId,
        learner_id: LearnerId,
        now: DateTime<Utc>,
    ) -> Result<Attempt, StorageError> {
        let mut guard = lock(&self.attempts)?;
        if let Some(existing) = guard.values().find(|a| {
            a.assessment_id() == assessment_id
                && a.learner_id() == learner_id
                && !a.is_submitted()
        }) {
            return Ok(existing.clone());
        }

        let attempt = Attempt::start(AttemptId::generate(), assessment_id, learner_id, now);
        guard.insert(attempt.id(), attempt.clone());
        Ok(attempt)
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<Attempt, StorageError> {
        let guard = lock(&self.attempts)?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn save_response(
        &self,
        attempt_id: AttemptId,
        question_id: QuestionId,
        answer: &Answer,
    ) -> Result<(), StorageError> {
        {
            let attempts = lock(&self.attempts)?;
            let attempt = attempts.get(&attempt_id).ok_or(StorageError::NotFound)?;
            if attempt.is_submitted() {
                return Err(StorageError::Conflict);
            }
        }
        let mut guard = lock(&self.responses)?;
        guard.insert((attempt_id, question_id), answer.clone());
        Ok(())
    }

    async fn list_responses(
        &self,
        attempt_id: AttemptId,
    ) -> Result<Vec<(QuestionId, Answer)>, StorageError> {
        let guard = lock(&self.responses)?;
        let mut out: Vec<_> = guard
            .iter()
            .filter(|((aid, _), _)| *aid == attempt_id)
            .map(|((_, qid), answer)| (*qid, answer.clone()))
            .collect();
        out.sort_by_key(|(qid, _)| *qid);
        Ok(out)
    }

    async fn submit_attempt(
        &self,
        attempt_id: AttemptId,
        responses: &[(QuestionId, Answer)],
        score: Option<u32>,
        time_spent_seconds: i64,
        submitted_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut attempts = lock(&self.attempts)?;
        let attempt = attempts.get_mut(&attempt_id).ok_or(StorageError::NotFound)?;
        if attempt.is_submitted() {
            return Err(StorageError::Conflict);
        }
        attempt
            .submit(score, time_spent_seconds, submitted_at)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let mut guard = lock(&self.responses)?;
        for (question_id, answer) in responses {
            guard.insert((attempt_id, *question_id), answer.clone());
        }
        Ok(())
    }

    async fn count_submitted(
        &self,
        assessment_id: AssessmentId,
        learner_id: LearnerId,
    ) -> Result<u32, StorageError> {
        let guard = lock(&self.attempts)?;
        let count = guard
            .values()
            .filter(|a| {
                a.assessment_id() == assessment_id
                    && a.learner_id() == learner_id
                    && a.is_submitted()
            })
            .count();
        u32::try_from(count).map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

//
// ─── GATEWAY AGGREGATE ─────────────────────────────────────────────────────────
//

/// Aggregates the repository traits behind trait objects for easy backend
/// swapping.
#[derive(Clone)]
pub struct Gateway {
    pub assessments: Arc<dyn AssessmentRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway").finish_non_exhaustive()
    }
}

impl Gateway {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryGateway::new();
        let assessments: Arc<dyn AssessmentRepository> = Arc::new(repo.clone());
        let attempts: Arc<dyn AttemptRepository> = Arc::new(repo);
        Self {
            assessments,
            attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assess_core::model::{
        AssessmentSettings, ChoiceOption, OptionId, QuestionPayload,
    };
    use assess_core::time::fixed_now;

    fn build_assessment(id: u64) -> Assessment {
        Assessment::new(
            AssessmentId::new(id),
            format!("Assessment {id}"),
            None,
            AssessmentSettings::default(),
        )
        .unwrap()
    }

    fn build_question(id: u64) -> Question {
        Question::new(
            QuestionId::new(id),
            format!("Q{id}"),
            2,
            None,
            QuestionPayload::MultipleChoice {
                options: vec![
                    ChoiceOption {
                        id: OptionId::new(1),
                        text: "A".to_owned(),
                        correct: true,
                    },
                    ChoiceOption {
                        id: OptionId::new(2),
                        text: "B".to_owned(),
                        correct: false,
                    },
                ],
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn start_attempt_is_idempotent_per_learner_and_assessment() {
        let repo = InMemoryGateway::new();
        let assessment_id = AssessmentId::new(1);
        let learner_id = LearnerId::new(7);

        let first = repo
            .start_attempt(assessment_id, learner_id, fixed_now())
            .await
            .unwrap();
        let second = repo
            .start_attempt(assessment_id, learner_id, fixed_now())
            .await
            .unwrap();
        assert_eq!(first.id(), second.id());

        // A different learner gets a different attempt.
        let other = repo
            .start_attempt(assessment_id, LearnerId::new(8), fixed_now())
            .await
            .unwrap();
        assert_ne!(other.id(), first.id());
    }

    #[tokio::test]
    async fn duplicate_submit_conflicts() {
        let repo = InMemoryGateway::new();
        let attempt = repo
            .start_attempt(AssessmentId::new(1), LearnerId::new(7), fixed_now())
            .await
            .unwrap();

        repo.submit_attempt(attempt.id(), &[], Some(4), 30, fixed_now())
            .await
            .unwrap();
        let err = repo
            .submit_attempt(attempt.id(), &[], Some(4), 30, fixed_now())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn save_response_after_submit_conflicts() {
        let repo = InMemoryGateway::new();
        let attempt = repo
            .start_attempt(AssessmentId::new(1), LearnerId::new(7), fixed_now())
            .await
            .unwrap();
        repo.submit_attempt(attempt.id(), &[], None, 10, fixed_now())
            .await
            .unwrap();

        let err = repo
            .save_response(attempt.id(), QuestionId::new(1), &Answer::boolean(true))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn responses_roundtrip_in_question_order() {
        let repo = InMemoryGateway::new();
        let attempt = repo
            .start_attempt(AssessmentId::new(1), LearnerId::new(7), fixed_now())
            .await
            .unwrap();

        repo.save_response(attempt.id(), QuestionId::new(2), &Answer::text("b"))
            .await
            .unwrap();
        repo.save_response(attempt.id(), QuestionId::new(1), &Answer::text("a"))
            .await
            .unwrap();

        let responses = repo.list_responses(attempt.id()).await.unwrap();
        let ids: Vec<_> = responses.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![QuestionId::new(1), QuestionId::new(2)]);
    }

    #[tokio::test]
    async fn questions_keep_authored_order() {
        let repo = InMemoryGateway::new();
        let assessment = build_assessment(1);
        repo.upsert_assessment(&assessment).await.unwrap();
        for id in [3_u64, 1, 2] {
            repo.upsert_question(assessment.id(), &build_question(id))
                .await
                .unwrap();
        }

        let questions = repo.list_questions(assessment.id()).await.unwrap();
        let ids: Vec<_> = questions.iter().map(|q| q.id().value()).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }
}
