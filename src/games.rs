//! Scoring for the practice mini-games.
//!
//! Games never touch stored progress. They only decide when a round is over
//! and whether the learner did well enough to move on.

use crate::catalog::Word;
use crate::error::{Error, Result};
use crate::progress::score_percent;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    Correct,
    Incorrect,
    /// The word was matched earlier; counters are unchanged
    AlreadyMatched,
}

/// Pair matching: drag each word onto its meaning.
#[derive(Debug, Clone)]
pub struct MatchGame {
    meanings: HashMap<String, String>,
    matched: HashSet<String>,
    correct: usize,
    incorrect: usize,
}

/// One drag of a word onto a meaning.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchPair {
    pub word_id: String,
    pub meaning: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchSummary {
    pub correct: usize,
    pub incorrect: usize,
    pub accuracy: u8,
    pub complete: bool,
    pub can_continue: bool,
}

impl MatchGame {
    pub fn new(words: &[Word]) -> Self {
        Self {
            meanings: words
                .iter()
                .map(|w| (w.id.clone(), w.translated_text.clone()))
                .collect(),
            matched: HashSet::new(),
            correct: 0,
            incorrect: 0,
        }
    }

    /// Try to pair `word_id` with `meaning`.
    pub fn attempt(&mut self, word_id: &str, meaning: &str) -> Result<MatchOutcome> {
        let expected = self
            .meanings
            .get(word_id)
            .ok_or_else(|| Error::not_found(format!("word '{word_id}' in match game")))?;

        if self.matched.contains(word_id) {
            return Ok(MatchOutcome::AlreadyMatched);
        }
        if expected == meaning {
            self.matched.insert(word_id.to_string());
            self.correct += 1;
            Ok(MatchOutcome::Correct)
        } else {
            self.incorrect += 1;
            Ok(MatchOutcome::Incorrect)
        }
    }

    /// `round(100 * correct / attempts)`, 0 before the first attempt.
    pub fn accuracy(&self) -> u8 {
        score_percent(self.correct, self.correct + self.incorrect)
    }

    pub fn is_complete(&self) -> bool {
        self.matched.len() == self.meanings.len()
    }

    pub fn can_continue(&self, pass_threshold: u8) -> bool {
        self.accuracy() >= pass_threshold
    }

    pub fn summary(&self, pass_threshold: u8) -> MatchSummary {
        MatchSummary {
            correct: self.correct,
            incorrect: self.incorrect,
            accuracy: self.accuracy(),
            complete: self.is_complete(),
            can_continue: self.can_continue(pass_threshold),
        }
    }

    pub fn reset(&mut self) {
        self.matched.clear();
        self.correct = 0;
        self.incorrect = 0;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FindSummary {
    pub found: usize,
    pub remaining: usize,
    pub complete: bool,
}

/// Find-all rounds (memory match, word search).
#[derive(Debug, Clone)]
pub struct FoundSet {
    targets: BTreeSet<String>,
    found: BTreeSet<String>,
}

impl FoundSet {
    pub fn new(words: &[Word]) -> Self {
        Self {
            targets: words.iter().map(|w| w.id.clone()).collect(),
            found: BTreeSet::new(),
        }
    }

    /// Record a find. Unknown and repeated ids are ignored and return `false`.
    pub fn find(&mut self, word_id: &str) -> bool {
        self.targets.contains(word_id) && self.found.insert(word_id.to_string())
    }

    pub fn found(&self) -> usize {
        self.found.len()
    }

    pub fn remaining(&self) -> usize {
        self.targets.len() - self.found.len()
    }

    pub fn is_complete(&self) -> bool {
        self.found.len() == self.targets.len()
    }

    pub fn summary(&self) -> FindSummary {
        FindSummary {
            found: self.found(),
            remaining: self.remaining(),
            complete: self.is_complete(),
        }
    }
}
