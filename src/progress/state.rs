//! Word unlock state machine for one milestone.
//!
//! Statuses are held in unlock order. The words that are not `Locked` always
//! form a prefix of that order, and `Completed` is terminal.

use crate::catalog::Milestone;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordStatus {
    Locked,
    #[serde(alias = "current")]
    Learning,
    Completed,
}

/// Persisted shape: `word_id -> status`.
pub type StoredProgress = BTreeMap<String, WordStatus>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MilestoneState {
    statuses: Vec<WordStatus>,
}

impl MilestoneState {
    /// First word `Learning`, the rest `Locked`.
    pub fn initial(total_words: usize) -> Self {
        let mut state = Self {
            statuses: vec![WordStatus::Locked; total_words],
        };
        state.open_frontier();
        state
    }

    /// Rebuild from stored progress.
    ///
    /// Words missing from the stored map (for example, added to the catalog
    /// later) start `Locked`, and stored ids the milestone no longer has are
    /// ignored. A stored map that breaks the prefix rule is `CorruptState`.
    pub fn from_stored(milestone: &Milestone, stored: &StoredProgress, key: &str) -> Result<Self> {
        let statuses = milestone
            .words
            .iter()
            .map(|word| stored.get(&word.id).copied().unwrap_or(WordStatus::Locked))
            .collect();
        let mut state = Self { statuses };

        if !state.is_prefix_valid() {
            return Err(Error::corrupt(key, "unlocked word found after a locked word"));
        }
        state.open_frontier();
        Ok(state)
    }

    pub fn to_stored(&self, milestone: &Milestone) -> StoredProgress {
        milestone
            .words
            .iter()
            .zip(&self.statuses)
            .map(|(word, status)| (word.id.clone(), *status))
            .collect()
    }

    pub fn status(&self, position: usize) -> Option<WordStatus> {
        self.statuses.get(position).copied()
    }

    pub fn statuses(&self) -> &[WordStatus] {
        &self.statuses
    }

    /// Confirm mastery of the word at `position`.
    ///
    /// `Learning` becomes `Completed` and the next word, if `Locked`, becomes
    /// `Learning`. `Completed` stays as it is. `Locked` is an invalid
    /// transition.
    pub fn mark_got_it(&mut self, position: usize) -> Result<WordStatus> {
        let status = self
            .statuses
            .get(position)
            .copied()
            .ok_or_else(|| Error::not_found(format!("word at position {position}")))?;

        match status {
            WordStatus::Locked => Err(Error::invalid_transition(format!(
                "word at position {position} is locked"
            ))),
            WordStatus::Completed => Ok(WordStatus::Completed),
            WordStatus::Learning => {
                self.statuses[position] = WordStatus::Completed;
                if let Some(next) = self.statuses.get_mut(position + 1) {
                    if *next == WordStatus::Locked {
                        *next = WordStatus::Learning;
                    }
                }
                Ok(WordStatus::Completed)
            }
        }
    }

    pub fn total(&self) -> usize {
        self.statuses.len()
    }

    pub fn completed(&self) -> usize {
        self.statuses
            .iter()
            .filter(|s| **s == WordStatus::Completed)
            .count()
    }

    pub fn remaining(&self) -> usize {
        self.total() - self.completed()
    }

    pub fn is_quiz_eligible(&self) -> bool {
        self.completed() == self.total()
    }

    /// No `Learning`/`Completed` word follows a `Locked` one.
    pub fn is_prefix_valid(&self) -> bool {
        let unlocked = self
            .statuses
            .iter()
            .take_while(|s| **s != WordStatus::Locked)
            .count();
        self.statuses[unlocked..]
            .iter()
            .all(|s| *s == WordStatus::Locked)
    }

    /// If every unlocked word is completed, unlock the next one.
    fn open_frontier(&mut self) {
        let unlocked = self
            .statuses
            .iter()
            .take_while(|s| **s != WordStatus::Locked)
            .count();
        let all_completed = self.statuses[..unlocked]
            .iter()
            .all(|s| *s == WordStatus::Completed);
        if all_completed {
            if let Some(next) = self.statuses.get_mut(unlocked) {
                *next = WordStatus::Learning;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::{milestone, word};
    use proptest::prelude::*;
    use WordStatus::*;

    fn three_words() -> Milestone {
        milestone(
            "fr",
            "m1",
            0,
            vec![
                word("w1", "Bonjour", "Hello", 0),
                word("w2", "Merci", "Thank you", 1),
                word("w3", "Oui", "Yes", 2),
            ],
        )
    }

    // ==================== Initial State Tests ====================

    #[test]
    fn test_initial_state() {
        let state = MilestoneState::initial(3);
        assert_eq!(state.statuses(), [Learning, Locked, Locked]);
        assert_eq!(state.completed(), 0);
        assert!(!state.is_quiz_eligible());
    }

    // ==================== Transition Tests ====================

    #[test]
    fn test_got_it_cascades_one_step() {
        let mut state = MilestoneState::initial(3);

        assert_eq!(state.mark_got_it(0).unwrap(), Completed);
        assert_eq!(state.statuses(), [Completed, Learning, Locked]);
    }

    #[test]
    fn test_got_it_on_locked_is_invalid() {
        let mut state = MilestoneState::initial(3);

        let result = state.mark_got_it(2);
        assert!(matches!(result, Err(Error::InvalidTransition(_))));
        assert_eq!(state.statuses(), [Learning, Locked, Locked]);
    }

    #[test]
    fn test_got_it_on_completed_is_idempotent() {
        let mut state = MilestoneState::initial(3);
        state.mark_got_it(0).unwrap();
        let before = state.clone();

        assert_eq!(state.mark_got_it(0).unwrap(), Completed);
        assert_eq!(state.mark_got_it(0).unwrap(), Completed);
        assert_eq!(state, before);
    }

    #[test]
    fn test_last_word_completes_without_cascade() {
        let mut state = MilestoneState::initial(2);
        state.mark_got_it(0).unwrap();
        state.mark_got_it(1).unwrap();

        assert_eq!(state.statuses(), [Completed, Completed]);
        assert!(state.is_quiz_eligible());
        assert_eq!(state.remaining(), 0);
    }

    #[test]
    fn test_cascade_does_not_touch_already_learning_word() {
        let m = three_words();
        let stored: StoredProgress = [
            ("w1".to_string(), Learning),
            ("w2".to_string(), Learning),
        ]
        .into_iter()
        .collect();
        let mut state = MilestoneState::from_stored(&m, &stored, "k").unwrap();

        state.mark_got_it(0).unwrap();
        assert_eq!(state.statuses(), [Completed, Learning, Locked]);
    }

    #[test]
    fn test_out_of_range_position_is_not_found() {
        let mut state = MilestoneState::initial(1);
        assert!(matches!(state.mark_got_it(5), Err(Error::NotFound(_))));
    }

    // ==================== Stored Progress Tests ====================

    #[test]
    fn test_from_empty_store_matches_initial() {
        let state = MilestoneState::from_stored(&three_words(), &StoredProgress::new(), "k").unwrap();
        assert_eq!(state, MilestoneState::initial(3));
    }

    #[test]
    fn test_stored_roundtrip() {
        let m = three_words();
        let mut state = MilestoneState::initial(3);
        state.mark_got_it(0).unwrap();

        let stored = state.to_stored(&m);
        assert_eq!(stored["w1"], Completed);
        assert_eq!(stored["w2"], Learning);
        assert_eq!(MilestoneState::from_stored(&m, &stored, "k").unwrap(), state);
    }

    #[test]
    fn test_stored_gap_is_corrupt() {
        let stored: StoredProgress = [("w1".to_string(), Locked), ("w3".to_string(), Completed)]
            .into_iter()
            .collect();

        let result = MilestoneState::from_stored(&three_words(), &stored, "progress/fr/m1");
        match result {
            Err(Error::CorruptState { key, .. }) => assert_eq!(key, "progress/fr/m1"),
            other => panic!("expected CorruptState, got {other:?}"),
        }
    }

    #[test]
    fn test_new_catalog_word_is_unlocked_after_completed_prefix() {
        let stored: StoredProgress = [("w1".to_string(), Completed), ("w2".to_string(), Completed)]
            .into_iter()
            .collect();

        let state = MilestoneState::from_stored(&three_words(), &stored, "k").unwrap();
        assert_eq!(state.statuses(), [Completed, Completed, Learning]);
    }

    #[test]
    fn test_current_alias_deserializes_as_learning() {
        let status: WordStatus = serde_json::from_str("\"current\"").unwrap();
        assert_eq!(status, Learning);
        assert_eq!(serde_json::to_string(&Learning).unwrap(), "\"learning\"");
    }

    // ==================== Property Tests ====================

    proptest! {
        #[test]
        fn prop_unlocked_words_form_a_prefix(
            total in 1usize..12,
            picks in proptest::collection::vec(0usize..12, 0..40),
        ) {
            let mut state = MilestoneState::initial(total);
            for pick in picks {
                let _ = state.mark_got_it(pick % total);
                prop_assert!(state.is_prefix_valid());
            }
        }

        #[test]
        fn prop_completed_is_monotonic(
            total in 1usize..12,
            picks in proptest::collection::vec(0usize..12, 0..40),
        ) {
            let mut state = MilestoneState::initial(total);
            for pick in picks {
                let before = state.clone();
                let _ = state.mark_got_it(pick % total);
                for (old, new) in before.statuses().iter().zip(state.statuses()) {
                    if *old == Completed {
                        prop_assert_eq!(*new, Completed);
                    }
                }
                prop_assert!(state.completed() >= before.completed());
                prop_assert!(state.completed() <= before.completed() + 1);
            }
        }

        #[test]
        fn prop_cascade_sets_next_word_to_learning(total in 2usize..12, upto in 0usize..11) {
            let upto = upto % (total - 1);
            let mut state = MilestoneState::initial(total);
            for position in 0..upto {
                state.mark_got_it(position).unwrap();
            }
            prop_assert_eq!(state.status(upto + 1), Some(Locked));
            state.mark_got_it(upto).unwrap();
            prop_assert_eq!(state.status(upto + 1), Some(Learning));
        }
    }
}
