use std::collections::{BTreeSet, HashMap};

use assess_core::model::{Answer, QuestionId};

/// In-session source of truth for what the learner has entered so far.
///
/// Holds the answer map plus per-question dirty flags so the flush path can
/// tell "typed" apart from "confirmed saved". The store knows nothing about
/// scoring or persistence.
#[derive(Debug, Clone, Default)]
pub struct ResponseStore {
    answers: HashMap<QuestionId, Answer>,
    dirty: BTreeSet<QuestionId>,
}

impl ResponseStore {
    /// Record an answer and mark it dirty.
    pub fn set(&mut self, question_id: QuestionId, answer: Answer) {
        self.answers.insert(question_id, answer);
        self.dirty.insert(question_id);
    }

    /// Insert an already-persisted answer without marking it dirty.
    ///
    /// Used when resuming an open attempt from storage.
    pub fn hydrate(&mut self, question_id: QuestionId, answer: Answer) {
        self.answers.insert(question_id, answer);
    }

    #[must_use]
    pub fn get(&self, question_id: QuestionId) -> Option<&Answer> {
        self.answers.get(&question_id)
    }

    /// True when the question has a non-blank answer.
    #[must_use]
    pub fn is_answered(&self, question_id: QuestionId) -> bool {
        self.answers
            .get(&question_id)
            .is_some_and(|a| !a.is_blank())
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.values().filter(|a| !a.is_blank()).count()
    }

    #[must_use]
    pub fn answers(&self) -> &HashMap<QuestionId, Answer> {
        &self.answers
    }

    pub fn entries(&self) -> impl Iterator<Item = (QuestionId, &Answer)> {
        self.answers.iter().map(|(id, answer)| (*id, answer))
    }

    /// Full answer set ordered by question id, for submission payloads.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(QuestionId, Answer)> {
        let mut out: Vec<_> = self
            .answers
            .iter()
            .map(|(id, answer)| (*id, answer.clone()))
            .collect();
        out.sort_by_key(|(id, _)| *id);
        out
    }

    /// Dirty answers in question-id order.
    #[must_use]
    pub fn dirty_entries(&self) -> Vec<(QuestionId, Answer)> {
        self.dirty
            .iter()
            .filter_map(|id| self.answers.get(id).map(|a| (*id, a.clone())))
            .collect()
    }

    /// Clear the dirty flag once a save is confirmed.
    pub fn mark_saved(&mut self, question_id: QuestionId) {
        self.dirty.remove(&question_id);
    }

    pub fn mark_all_saved(&mut self) {
        self.dirty.clear();
    }

    /// Answers typed but not yet confirmed persisted.
    #[must_use]
    pub fn unsaved_count(&self) -> usize {
        self.dirty.len()
    }

    #[must_use]
    pub fn has_unsaved(&self) -> bool {
        !self.dirty.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assess_core::model::OptionId;

    fn qid(n: u64) -> QuestionId {
        QuestionId::new(n)
    }

    #[test]
    fn set_marks_dirty_until_saved() {
        let mut store = ResponseStore::default();
        store.set(qid(1), Answer::choice(OptionId::new(2)));
        assert!(store.has_unsaved());
        assert_eq!(store.unsaved_count(), 1);

        store.mark_saved(qid(1));
        assert!(!store.has_unsaved());
        assert!(store.is_answered(qid(1)));
    }

    #[test]
    fn overwriting_keeps_a_single_entry() {
        let mut store = ResponseStore::default();
        store.set(qid(1), Answer::choice(OptionId::new(2)));
        store.set(qid(1), Answer::choice(OptionId::new(3)));

        assert_eq!(store.answered_count(), 1);
        let dirty = store.dirty_entries();
        assert_eq!(dirty.len(), 1);
        assert_eq!(dirty[0].1, Answer::choice(OptionId::new(3)));
    }

    #[test]
    fn blank_answers_do_not_count_as_answered() {
        let mut store = ResponseStore::default();
        store.set(qid(1), Answer::text("   "));
        assert!(!store.is_answered(qid(1)));
        assert_eq!(store.answered_count(), 0);
        // Still dirty: a cleared answer needs persisting too.
        assert_eq!(store.unsaved_count(), 1);
    }

    #[test]
    fn hydrate_does_not_mark_dirty() {
        let mut store = ResponseStore::default();
        store.hydrate(qid(3), Answer::boolean(true));
        assert!(store.is_answered(qid(3)));
        assert!(!store.has_unsaved());
    }

    #[test]
    fn entries_expose_every_recorded_answer() {
        let mut store = ResponseStore::default();
        store.set(qid(1), Answer::choice(OptionId::new(2)));
        store.hydrate(qid(4), Answer::boolean(true));
        store.set(qid(1), Answer::choice(OptionId::new(3)));

        let mut entries: Vec<_> = store.entries().collect();
        entries.sort_by_key(|(id, _)| *id);
        assert_eq!(
            entries,
            vec![
                (qid(1), &Answer::choice(OptionId::new(3))),
                (qid(4), &Answer::boolean(true)),
            ]
        );
    }

    #[test]
    fn snapshot_is_ordered_by_question_id() {
        let mut store = ResponseStore::default();
        store.set(qid(9), Answer::boolean(true));
        store.set(qid(2), Answer::boolean(false));
        store.set(qid(5), Answer::text("hi"));

        let ids: Vec<_> = store.snapshot().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![qid(2), qid(5), qid(9)]);
    }
}
