use rand::seq::SliceRandom;
use tracing::{debug, warn};

use assess_core::model::{
    Answer, Assessment, AssessmentId, Attempt, LearnerId, Question, QuestionId, word_count,
};
use assess_core::{Clock, scoring};
use storage::repository::{Gateway, StorageError};

use super::clock::{ClockTick, SessionClock};
use super::flush::CoalescingFlush;
use super::results::{AttemptOutcome, ResultsView, SubmitTrigger, grades_on_submit};
use super::store::ResponseStore;
use crate::error::SessionError;

//
// ─── STATUS ─────────────────────────────────────────────────────────────────────
//

/// Lifecycle of one assessment-taking session.
///
/// `Submitting` is re-entered on a failed submission so the learner can
/// retry; `Submitted` is terminal and refuses all further mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Ready,
    InProgress,
    Submitting,
    Submitted,
}

//
// ─── CONTROLLER ─────────────────────────────────────────────────────────────────
//

/// Orchestrates one learner's attempt at an assessment.
///
/// Owns the question list, the in-session answer store, the countdown, and
/// the debounced save deadline. All mutation funnels through `&mut self`
/// methods, so the manual-submit versus timeout race collapses into a status
/// check at the top of the single submission path.
///
/// Timing is driven from outside: the caller feeds [`Self::on_tick`] once
/// per second (see `Ticker`), which advances the save debounce and the
/// countdown together and auto-submits when time runs out.
#[derive(Debug)]
pub struct SessionController {
    gateway: Gateway,
    clock: Clock,
    assessment: Assessment,
    questions: Vec<Question>,
    attempt: Attempt,
    store: ResponseStore,
    countdown: SessionClock,
    flush: CoalescingFlush,
    current: usize,
    status: SessionStatus,
    outcome: Option<AttemptOutcome>,
}

impl SessionController {
    /// Fetch the assessment and its questions, start (or resume) the open
    /// attempt, and return a controller in `Ready`.
    ///
    /// Questions are shuffled once at load when the assessment asks for it;
    /// the order then stays fixed for the whole session. Previously saved
    /// responses of a resumed attempt pre-populate the answer store.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Load` when fetching fails,
    /// `SessionError::Empty` for an assessment without questions, and
    /// `SessionError::AttemptLimitReached` when the learner has used up
    /// every allowed attempt.
    pub async fn load(
        gateway: Gateway,
        clock: Clock,
        assessment_id: AssessmentId,
        learner_id: LearnerId,
    ) -> Result<Self, SessionError> {
        let assessment = gateway
            .assessments
            .get_assessment(assessment_id)
            .await
            .map_err(SessionError::Load)?;
        let mut questions = gateway
            .assessments
            .list_questions(assessment_id)
            .await
            .map_err(SessionError::Load)?;
        if questions.is_empty() {
            return Err(SessionError::Empty);
        }

        if let Some(limit) = assessment.max_attempts() {
            let used = gateway
                .attempts
                .count_submitted(assessment_id, learner_id)
                .await
                .map_err(SessionError::Load)?;
            if used >= limit {
                return Err(SessionError::AttemptLimitReached { limit });
            }
        }

        let attempt = gateway
            .attempts
            .start_attempt(assessment_id, learner_id, clock.now())
            .await
            .map_err(SessionError::Load)?;

        let mut store = ResponseStore::default();
        for (question_id, answer) in gateway
            .attempts
            .list_responses(attempt.id())
            .await
            .map_err(SessionError::Load)?
        {
            store.hydrate(question_id, answer);
        }

        if assessment.shuffle_questions() {
            questions.shuffle(&mut rand::rng());
        }

        let countdown = SessionClock::new(assessment.time_limit_seconds());
        debug!(
            assessment = %assessment_id,
            attempt = %attempt.id(),
            questions = questions.len(),
            resumed = store.answered_count(),
            "session loaded"
        );

        Ok(Self {
            gateway,
            clock,
            assessment,
            questions,
            attempt,
            store,
            countdown,
            flush: CoalescingFlush::default(),
            current: 0,
            status: SessionStatus::Ready,
            outcome: None,
        })
    }

    /// Present the first question and start the countdown if timed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadySubmitted` once terminal.
    pub fn begin(&mut self) -> Result<(), SessionError> {
        match self.status {
            SessionStatus::Ready => {
                self.countdown.start();
                self.status = SessionStatus::InProgress;
                Ok(())
            }
            SessionStatus::InProgress => Ok(()),
            SessionStatus::Submitting => Err(SessionError::NotInProgress),
            SessionStatus::Submitted => Err(SessionError::AlreadySubmitted),
        }
    }

    /// Move the current-question pointer. No effect on answers or score.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::OutOfBounds` for an invalid index and
    /// `SessionError::NotInProgress` outside the in-progress state.
    pub fn navigate(&mut self, index: usize) -> Result<(), SessionError> {
        if self.status != SessionStatus::InProgress {
            return Err(self.not_mutable());
        }
        if index >= self.questions.len() {
            return Err(SessionError::OutOfBounds {
                index,
                total: self.questions.len(),
            });
        }
        self.current = index;
        Ok(())
    }

    /// Record an answer and arm the debounced save.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnknownQuestion` for a question outside this
    /// assessment, `SessionError::IncompatibleAnswer` when the payload shape
    /// does not fit the question type, and `SessionError::AlreadySubmitted`
    /// or `SessionError::NotInProgress` when mutation is no longer allowed.
    pub fn answer(&mut self, question_id: QuestionId, answer: Answer) -> Result<(), SessionError> {
        if self.status != SessionStatus::InProgress {
            debug!(question = %question_id, status = ?self.status, "answer rejected");
            return Err(self.not_mutable());
        }
        let question = self
            .questions
            .iter()
            .find(|q| q.id() == question_id)
            .ok_or(SessionError::UnknownQuestion)?;
        if let Some(payload) = answer.payload() {
            if !question.accepts(payload) {
                return Err(SessionError::IncompatibleAnswer);
            }
        }

        self.store.set(question_id, answer);
        self.flush.schedule(self.clock.now());
        Ok(())
    }

    /// Advance the session by one second.
    ///
    /// Fires a due debounced save first, then steps the countdown; when the
    /// countdown hits zero the attempt is auto-submitted from a fresh store
    /// snapshot, so the last seconds of typing are never lost to a pending
    /// debounce.
    ///
    /// # Errors
    ///
    /// Propagates `SessionError::Submit` from a failed auto-submission; the
    /// session stays in `Submitting` and the next tick retries.
    pub async fn on_tick(&mut self) -> Result<(), SessionError> {
        // A fixed clock moves one second per tick so elapsed time and the
        // countdown agree in deterministic runs.
        self.clock.advance(chrono::Duration::seconds(1));

        if self.status == SessionStatus::InProgress && self.flush.take_due(self.clock.now()) {
            self.flush_dirty().await;
        }

        match self.countdown.tick() {
            ClockTick::JustExpired => {
                debug!(attempt = %self.attempt.id(), "time limit reached, auto-submitting");
                self.submit_with(SubmitTrigger::Timeout).await
            }
            ClockTick::Running { .. } | ClockTick::Ignored => {
                if self.status == SessionStatus::Submitting && self.countdown.is_expired() {
                    // A previous auto-submit failed; keep retrying.
                    self.submit_with(SubmitTrigger::Timeout).await
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Best-effort save of dirty answers. Failures keep the entry dirty so a
    /// later flush retries it.
    async fn flush_dirty(&mut self) {
        for (question_id, answer) in self.store.dirty_entries() {
            match self
                .gateway
                .attempts
                .save_response(self.attempt.id(), question_id, &answer)
                .await
            {
                Ok(()) => self.store.mark_saved(question_id),
                Err(e) => {
                    warn!(question = %question_id, error = %e, "response save failed");
                }
            }
        }
    }

    /// Unanswered-question count to confirm before a manual submit, if any.
    #[must_use]
    pub fn submit_warning(&self) -> Option<usize> {
        let unanswered = self
            .questions
            .iter()
            .filter(|q| !self.store.is_answered(q.id()))
            .count();
        (unanswered > 0).then_some(unanswered)
    }

    /// Manual submission. Safe to call while an auto-submit may be racing:
    /// once the attempt is terminal the call is a logged no-op.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Submit` when persistence fails; the session
    /// stays in `Submitting` so the learner can retry.
    pub async fn submit(&mut self) -> Result<(), SessionError> {
        self.submit_with(SubmitTrigger::Manual).await
    }

    async fn submit_with(&mut self, trigger: SubmitTrigger) -> Result<(), SessionError> {
        match self.status {
            SessionStatus::InProgress | SessionStatus::Submitting => {}
            SessionStatus::Submitted => {
                debug!(attempt = %self.attempt.id(), "duplicate submit ignored");
                return Ok(());
            }
            SessionStatus::Ready => return Err(SessionError::NotInProgress),
        }

        self.status = SessionStatus::Submitting;
        self.flush.cancel();
        self.countdown.stop();

        let responses = self.store.snapshot();
        let submitted_at = self.clock.now();
        let time_spent = (submitted_at - self.attempt.started_at())
            .num_seconds()
            .max(0);

        let report = grades_on_submit(self.assessment.grading())
            .then(|| scoring::score(&self.questions, self.store.answers()));
        let score = report.as_ref().map(|r| r.score);

        match self
            .gateway
            .attempts
            .submit_attempt(self.attempt.id(), &responses, score, time_spent, submitted_at)
            .await
        {
            Ok(()) => {
                self.attempt.submit(score, time_spent, submitted_at)?;
                self.store.mark_all_saved();
                self.status = SessionStatus::Submitted;
                self.outcome = Some(AttemptOutcome {
                    trigger,
                    report,
                    time_spent_seconds: time_spent,
                    submitted_at,
                });
                Ok(())
            }
            Err(StorageError::Conflict) => {
                // Terminal on the storage side already; adopt that verdict.
                self.status = SessionStatus::Submitted;
                Err(SessionError::AlreadySubmitted)
            }
            Err(e) => {
                warn!(attempt = %self.attempt.id(), error = %e, "submit failed");
                Err(SessionError::Submit(e))
            }
        }
    }

    /// Answers typed but not yet confirmed saved; `Some` means leaving now
    /// would lose them and the caller should confirm first.
    #[must_use]
    pub fn exit_warning(&self) -> Option<usize> {
        (self.status == SessionStatus::InProgress && self.store.has_unsaved())
            .then(|| self.store.unsaved_count())
    }

    /// Abandon the session: drop any pending save and stop the countdown.
    pub fn exit(&mut self) {
        self.flush.cancel();
        self.countdown.stop();
    }

    //
    // ─── READ SURFACE ───────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn assessment(&self) -> &Assessment {
        &self.assessment
    }

    #[must_use]
    pub fn attempt(&self) -> &Attempt {
        &self.attempt
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        &self.questions[self.current]
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.store.answered_count()
    }

    /// Answered share as a percentage, for the progress bar.
    #[must_use]
    pub fn progress_percent(&self) -> f64 {
        if self.questions.is_empty() {
            return 0.0;
        }
        self.answered_count() as f64 / self.questions.len() as f64 * 100.0
    }

    #[must_use]
    pub fn answer_for(&self, question_id: QuestionId) -> Option<&Answer> {
        self.store.get(question_id)
    }

    #[must_use]
    pub fn answers(&self) -> &std::collections::HashMap<QuestionId, Answer> {
        self.store.answers()
    }

    /// Seconds left on the countdown, or `None` when untimed.
    #[must_use]
    pub fn time_remaining(&self) -> Option<u32> {
        self.countdown.remaining()
    }

    #[must_use]
    pub fn is_time_warning(&self) -> bool {
        self.countdown.is_warning()
    }

    #[must_use]
    pub fn unsaved_count(&self) -> usize {
        self.store.unsaved_count()
    }

    /// Word count and soft limit for an essay question. The limit is
    /// advisory only; answers past it are still accepted and submittable.
    #[must_use]
    pub fn word_counter(&self, question_id: QuestionId) -> Option<(usize, Option<u32>)> {
        let question = self.questions.iter().find(|q| q.id() == question_id)?;
        let limit = question.max_words();
        let words = self
            .store
            .get(question_id)
            .and_then(Answer::answer_text)
            .map_or(0, word_count);
        Some((words, limit))
    }

    /// Terminal record of the submission, once `Submitted`.
    #[must_use]
    pub fn outcome(&self) -> Option<&AttemptOutcome> {
        self.outcome.as_ref()
    }

    /// Render-ready results, once `Submitted`.
    #[must_use]
    pub fn results(&self) -> Option<ResultsView> {
        let outcome = self.outcome.as_ref()?;
        Some(ResultsView::build(
            &self.assessment,
            &self.questions,
            self.store.answers(),
            outcome,
        ))
    }

    fn not_mutable(&self) -> SessionError {
        match self.status {
            SessionStatus::Submitted => SessionError::AlreadySubmitted,
            _ => SessionError::NotInProgress,
        }
    }
}
