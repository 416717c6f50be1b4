//! Progression engine: per-word unlocks, milestone gating and quizzes.
//!
//! All operations are synchronous. Read-modify-write cycles on stored progress
//! run under one lock, so concurrent `mark_got_it` calls for different words
//! of the same milestone cannot lose an update.

use crate::catalog::{Catalog, Milestone};
use crate::error::{Error, Result};
use crate::games::{FindSummary, FoundSet, MatchGame, MatchPair, MatchSummary};
use crate::i18n::Language;
use crate::progress::quiz::{
    AnswerOutcome, AttemptId, QuestionView, QuizAttempt, QuizResult, ScoreReport, WrongAnswer,
};
use crate::progress::state::{MilestoneState, StoredProgress, WordStatus};
use crate::store::{self, keys, Store};
use chrono::Utc;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

pub const DEFAULT_PASS_THRESHOLD: u8 = 80;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordProgress {
    pub word_id: String,
    pub status: WordStatus,
}

/// Derived view of one milestone's progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MilestoneProgress {
    pub language: String,
    pub milestone_id: String,
    pub words: Vec<WordProgress>,
    pub completed: usize,
    pub total: usize,
    pub remaining: usize,
    pub quiz_eligible: bool,
}

impl MilestoneProgress {
    fn new(milestone: &Milestone, state: &MilestoneState) -> Self {
        Self {
            language: milestone.language.clone(),
            milestone_id: milestone.id.clone(),
            words: milestone
                .words
                .iter()
                .zip(state.statuses())
                .map(|(word, status)| WordProgress {
                    word_id: word.id.clone(),
                    status: *status,
                })
                .collect(),
            completed: state.completed(),
            total: state.total(),
            remaining: state.remaining(),
            quiz_eligible: state.is_quiz_eligible(),
        }
    }
}

/// One row of the milestone map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MilestoneSummary {
    pub id: String,
    pub name: String,
    pub order_index: u32,
    pub total_words: usize,
    pub unlocked: bool,
    pub best_score: Option<u8>,
}

/// In-memory quiz attempts.
///
/// Only open attempts keep their questions. Finishing an attempt leaves just
/// its id behind, so a repeated finish is still `AttemptAlreadyFinished`.
#[derive(Default)]
struct Attempts {
    open: HashMap<AttemptId, QuizAttempt>,
    finished: HashSet<AttemptId>,
}

impl Attempts {
    fn missing(&self, attempt_id: AttemptId) -> Error {
        if self.finished.contains(&attempt_id) {
            Error::AttemptAlreadyFinished(attempt_id)
        } else {
            Error::not_found(format!("quiz attempt {attempt_id}"))
        }
    }

    fn get(&self, attempt_id: AttemptId) -> Result<&QuizAttempt> {
        self.open.get(&attempt_id).ok_or_else(|| self.missing(attempt_id))
    }

    fn get_mut(&mut self, attempt_id: AttemptId) -> Result<&mut QuizAttempt> {
        let error = self.missing(attempt_id);
        self.open.get_mut(&attempt_id).ok_or(error)
    }

    /// Open a new attempt, abandoning any other open one for the same milestone.
    fn start(&mut self, attempt: QuizAttempt) -> usize {
        let before = self.open.len();
        self.open.retain(|_, open| {
            !(open.language() == attempt.language() && open.milestone_id() == attempt.milestone_id())
        });
        let abandoned = before - self.open.len();
        self.open.insert(attempt.id(), attempt);
        abandoned
    }

    fn close(&mut self, attempt_id: AttemptId) {
        if self.open.remove(&attempt_id).is_some() {
            self.finished.insert(attempt_id);
        }
    }

    fn drop_milestone(&mut self, language: &str, milestone_id: &str) {
        self.open
            .retain(|_, a| !(a.language() == language && a.milestone_id() == milestone_id));
    }
}

pub struct ProgressionEngine {
    catalog: Arc<dyn Catalog>,
    store: Arc<dyn Store>,
    pass_threshold: u8,
    attempts: Mutex<Attempts>,
    next_attempt_id: AtomicU64,
    progress_lock: Mutex<()>,
}

impl ProgressionEngine {
    pub fn new(catalog: Arc<dyn Catalog>, store: Arc<dyn Store>) -> Self {
        Self {
            catalog,
            store,
            pass_threshold: DEFAULT_PASS_THRESHOLD,
            attempts: Mutex::new(Attempts::default()),
            next_attempt_id: AtomicU64::new(1),
            progress_lock: Mutex::new(()),
        }
    }

    /// Percentage needed to pass a quiz, clamped to 100.
    pub fn with_pass_threshold(mut self, pass_threshold: u8) -> Self {
        self.pass_threshold = pass_threshold.min(100);
        self
    }

    pub fn pass_threshold(&self) -> u8 {
        self.pass_threshold
    }

    // ==================== Word progress ====================

    pub fn word_status(&self, language: &str, milestone_id: &str, word_id: &str) -> Result<WordStatus> {
        let milestone = self.milestone(language, milestone_id)?;
        let position = Self::position(milestone, word_id)?;
        let state = self.load_state(milestone)?;
        Ok(state.status(position).unwrap_or(WordStatus::Locked))
    }

    /// Open a milestone, persisting the initial progress on first visit.
    pub fn visit_milestone(&self, language: &str, milestone_id: &str) -> Result<MilestoneProgress> {
        let milestone = self.milestone(language, milestone_id)?;
        self.ensure_unlocked(milestone)?;

        let _guard = self.lock_progress();
        let key = keys::progress(language, milestone_id);
        let state = self.load_state(milestone)?;
        if self.store.get(&key)?.is_none() {
            store::save(self.store.as_ref(), &key, &state.to_stored(milestone))?;
            info!("Started milestone {}/{}", language, milestone_id);
        }
        Ok(MilestoneProgress::new(milestone, &state))
    }

    /// Read-only progress view.
    pub fn milestone_progress(&self, language: &str, milestone_id: &str) -> Result<MilestoneProgress> {
        let milestone = self.milestone(language, milestone_id)?;
        let state = self.load_state(milestone)?;
        Ok(MilestoneProgress::new(milestone, &state))
    }

    /// "Got it" on a word: complete it and unlock the next one.
    pub fn mark_got_it(&self, language: &str, milestone_id: &str, word_id: &str) -> Result<WordStatus> {
        let milestone = self.milestone(language, milestone_id)?;
        self.ensure_unlocked(milestone)?;
        let position = Self::position(milestone, word_id)?;

        let _guard = self.lock_progress();
        let mut state = self.load_state(milestone)?;
        let before = state.status(position);
        let status = state.mark_got_it(position).map_err(|e| match e {
            Error::InvalidTransition(_) => Error::invalid_transition(format!(
                "word '{word_id}' in {language}/{milestone_id} is locked"
            )),
            other => other,
        })?;

        if before != Some(WordStatus::Completed) {
            store::save(
                self.store.as_ref(),
                &keys::progress(language, milestone_id),
                &state.to_stored(milestone),
            )?;
            debug!(
                "Completed word {} in {}/{} ({}/{})",
                word_id,
                language,
                milestone_id,
                state.completed(),
                state.total()
            );
        }
        Ok(status)
    }

    pub fn word_note(&self, language: &str, milestone_id: &str, word_id: &str) -> Result<Option<String>> {
        let milestone = self.milestone(language, milestone_id)?;
        Self::position(milestone, word_id)?;
        store::load(self.store.as_ref(), &keys::note(language, milestone_id, word_id))
    }

    /// Store a note for a word. A blank note removes it.
    pub fn set_word_note(&self, language: &str, milestone_id: &str, word_id: &str, note: &str) -> Result<()> {
        let milestone = self.milestone(language, milestone_id)?;
        Self::position(milestone, word_id)?;

        let key = keys::note(language, milestone_id, word_id);
        if note.trim().is_empty() {
            self.store.remove(&key)
        } else {
            store::save(self.store.as_ref(), &key, &note)
        }
    }

    /// Forget stored progress, quiz result and review log of a milestone.
    pub fn reset_milestone(&self, language: &str, milestone_id: &str) -> Result<()> {
        self.milestone(language, milestone_id)?;

        let _guard = self.lock_progress();
        self.store.remove(&keys::progress(language, milestone_id))?;
        self.store.remove(&keys::quiz_result(language, milestone_id))?;
        self.store.remove(&keys::wrong_answers(language, milestone_id))?;
        self.lock_attempts().drop_milestone(language, milestone_id);

        info!("Reset milestone {}/{}", language, milestone_id);
        Ok(())
    }

    // ==================== Milestone gating ====================

    /// The first milestone is always open; later ones need the previous
    /// milestone's best quiz score to reach the pass threshold.
    pub fn is_milestone_unlocked(&self, language: &str, milestone_id: &str) -> Result<bool> {
        let milestone = self.milestone(language, milestone_id)?;
        self.is_unlocked(milestone)
    }

    pub fn milestones(&self, language: &str) -> Result<Vec<MilestoneSummary>> {
        Language::from_code(language)?;

        self.catalog
            .milestones(language)
            .into_iter()
            .map(|milestone| {
                let result = self.quiz_result(&milestone.language, &milestone.id)?;
                Ok(MilestoneSummary {
                    id: milestone.id.clone(),
                    name: milestone.name.clone(),
                    order_index: milestone.order_index,
                    total_words: milestone.total_words(),
                    unlocked: self.is_unlocked(milestone)?,
                    best_score: result.map(|r| r.score),
                })
            })
            .collect()
    }

    pub fn quiz_result(&self, language: &str, milestone_id: &str) -> Result<Option<QuizResult>> {
        store::load(self.store.as_ref(), &keys::quiz_result(language, milestone_id))
    }

    fn is_unlocked(&self, milestone: &Milestone) -> Result<bool> {
        let milestones = self.catalog.milestones(&milestone.language);
        let position = milestones
            .iter()
            .position(|m| m.id == milestone.id)
            .unwrap_or(0);
        let Some(previous) = position.checked_sub(1).map(|p| milestones[p]) else {
            return Ok(true);
        };

        let result = self.quiz_result(&previous.language, &previous.id)?;
        Ok(result.is_some_and(|r| r.score >= self.pass_threshold))
    }

    fn ensure_unlocked(&self, milestone: &Milestone) -> Result<()> {
        if self.is_unlocked(milestone)? {
            Ok(())
        } else {
            Err(Error::MilestoneLocked {
                milestone_id: milestone.id.clone(),
            })
        }
    }

    // ==================== Quiz ====================

    pub fn can_start_quiz(&self, language: &str, milestone_id: &str) -> Result<bool> {
        let milestone = self.milestone(language, milestone_id)?;
        Ok(self.load_state(milestone)?.is_quiz_eligible())
    }

    pub fn start_quiz(&self, language: &str, milestone_id: &str) -> Result<AttemptId> {
        let milestone = self.milestone(language, milestone_id)?;
        self.ensure_unlocked(milestone)?;

        let state = self.load_state(milestone)?;
        if !state.is_quiz_eligible() {
            return Err(Error::QuizLocked {
                remaining: state.remaining(),
            });
        }

        let id = self.next_attempt_id.fetch_add(1, Ordering::Relaxed);
        let abandoned = self.lock_attempts().start(QuizAttempt::new(id, milestone));
        if abandoned > 0 {
            debug!("Abandoned {} open quiz attempt(s) for {}/{}", abandoned, language, milestone_id);
        }
        info!(
            "Started quiz attempt {} for {}/{} ({} questions)",
            id,
            language,
            milestone_id,
            milestone.total_words()
        );
        Ok(id)
    }

    /// Next unanswered question, `None` once all are answered.
    pub fn current_question(&self, attempt_id: AttemptId) -> Result<Option<QuestionView>> {
        self.lock_attempts().get(attempt_id)?.current_question()
    }

    /// Answer one question. Wrong answers go to the milestone's review log.
    pub fn submit_answer(&self, attempt_id: AttemptId, word_id: &str, answer: &str) -> Result<AnswerOutcome> {
        let (outcome, missed, language, milestone_id) = {
            let mut attempts = self.lock_attempts();
            let attempt = attempts.get_mut(attempt_id)?;
            let (outcome, missed) = attempt.submit(word_id, answer)?;
            (
                outcome,
                missed,
                attempt.language().to_string(),
                attempt.milestone_id().to_string(),
            )
        };

        if let Some(question) = missed {
            let key = keys::wrong_answers(&language, &milestone_id);
            let _guard = self.lock_progress();
            let mut log: Vec<WrongAnswer> = store::load(self.store.as_ref(), &key)?.unwrap_or_default();
            log.push(WrongAnswer {
                word_id: question.word_id,
                prompt: question.prompt,
                user_answer: answer.to_string(),
                correct_answer: question.correct_answer,
                answered_at: Utc::now(),
            });
            store::save(self.store.as_ref(), &key, &log)?;
        }
        Ok(outcome)
    }

    /// Score the attempt and record the milestone's best result.
    pub fn finish_quiz(&self, attempt_id: AttemptId) -> Result<ScoreReport> {
        let report = {
            let mut attempts = self.lock_attempts();
            let report = attempts.get_mut(attempt_id)?.finish(self.pass_threshold, Utc::now())?;
            attempts.close(attempt_id);
            report
        };

        let key = keys::quiz_result(&report.language, &report.milestone_id);
        let _guard = self.lock_progress();
        let previous: Option<QuizResult> = store::load(self.store.as_ref(), &key)?;
        if previous.as_ref().map_or(true, |p| report.score >= p.score) {
            store::save(
                self.store.as_ref(),
                &key,
                &QuizResult {
                    score: report.score,
                    passed: report.passed,
                    completed_at: report.completed_at,
                },
            )?;
        }

        info!(
            "Finished quiz attempt {} for {}/{}: {}/{} ({}%, passed: {})",
            attempt_id,
            report.language,
            report.milestone_id,
            report.correct,
            report.total,
            report.score,
            report.passed
        );
        Ok(report)
    }

    /// Number of quiz attempts still holding questions in memory.
    pub fn open_attempts(&self) -> usize {
        self.lock_attempts().open.len()
    }

    pub fn wrong_answers(&self, language: &str, milestone_id: &str) -> Result<Vec<WrongAnswer>> {
        self.milestone(language, milestone_id)?;
        Ok(store::load(self.store.as_ref(), &keys::wrong_answers(language, milestone_id))?
            .unwrap_or_default())
    }

    // ==================== Mini-games ====================

    /// Replay a pair-matching round in order and score it.
    pub fn score_match(&self, language: &str, milestone_id: &str, pairs: &[MatchPair]) -> Result<MatchSummary> {
        let milestone = self.milestone(language, milestone_id)?;
        self.ensure_unlocked(milestone)?;

        let mut game = MatchGame::new(&milestone.words);
        for pair in pairs {
            game.attempt(&pair.word_id, &pair.meaning)?;
        }
        let summary = game.summary(self.pass_threshold);
        debug!(
            "Match round for {}/{}: {}% ({} pairs)",
            language,
            milestone_id,
            summary.accuracy,
            pairs.len()
        );
        Ok(summary)
    }

    /// Count the distinct milestone words found in a find-all round.
    pub fn score_find(&self, language: &str, milestone_id: &str, word_ids: &[String]) -> Result<FindSummary> {
        let milestone = self.milestone(language, milestone_id)?;
        self.ensure_unlocked(milestone)?;

        let mut round = FoundSet::new(&milestone.words);
        for word_id in word_ids {
            round.find(word_id);
        }
        Ok(round.summary())
    }

    // ==================== Helpers ====================

    fn milestone(&self, language: &str, milestone_id: &str) -> Result<&Milestone> {
        Language::from_code(language)?;
        self.catalog
            .milestone(language, milestone_id)
            .ok_or_else(|| Error::not_found(format!("milestone {language}/{milestone_id}")))
    }

    fn position(milestone: &Milestone, word_id: &str) -> Result<usize> {
        milestone.position(word_id).ok_or_else(|| {
            Error::not_found(format!(
                "word '{}' in milestone {}/{}",
                word_id, milestone.language, milestone.id
            ))
        })
    }

    fn load_state(&self, milestone: &Milestone) -> Result<MilestoneState> {
        let key = keys::progress(&milestone.language, &milestone.id);
        let stored: StoredProgress = store::load(self.store.as_ref(), &key)
            .inspect_err(|e| warn!("Unreadable progress at {}: {}", key, e))?
            .unwrap_or_default();
        MilestoneState::from_stored(milestone, &stored, &key)
            .inspect_err(|e| warn!("Rejected stored progress: {}", e))
    }

    fn lock_progress(&self) -> MutexGuard<'_, ()> {
        self.progress_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_attempts(&self) -> MutexGuard<'_, Attempts> {
        self.attempts.lock().unwrap_or_else(|e| e.into_inner())
    }
}
