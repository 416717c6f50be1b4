//! Milestone quiz attempts and scoring.

use crate::catalog::{Milestone, Word};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type AttemptId = u64;

/// Wrong options offered per question
const MAX_DISTRACTORS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizQuestion {
    pub word_id: String,
    pub prompt: String,
    pub correct_answer: String,
    pub options: Vec<String>,
}

impl QuizQuestion {
    /// Build a question for `word`. Option order is deterministic: distractors
    /// in catalog order with the answer inserted at `order_index % (n + 1)`.
    pub fn for_word(word: &Word, milestone: &Milestone) -> Self {
        let mut options: Vec<String> = Vec::new();
        let candidates: Vec<&String> = if word.distractors.is_empty() {
            let position = milestone.position(&word.id).unwrap_or(0);
            let count = milestone.words.len();
            (1..count)
                .map(|offset| &milestone.words[(position + offset) % count].translated_text)
                .collect()
        } else {
            word.distractors.iter().collect()
        };

        for candidate in candidates {
            if options.len() == MAX_DISTRACTORS {
                break;
            }
            if *candidate != word.translated_text && !options.contains(candidate) {
                options.push(candidate.clone());
            }
        }

        let slot = word.order_index as usize % (options.len() + 1);
        options.insert(slot, word.translated_text.clone());

        Self {
            word_id: word.id.clone(),
            prompt: word.original_text.clone(),
            correct_answer: word.translated_text.clone(),
            options,
        }
    }
}

/// A question as shown to the learner, without its answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionView {
    pub attempt_id: AttemptId,
    pub index: usize,
    pub total: usize,
    pub word_id: String,
    pub prompt: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerOutcome {
    pub correct: bool,
    pub correct_answer: String,
    /// Questions left after this one
    pub remaining: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizRating {
    Perfect,
    Great,
    KeepPracticing,
}

impl QuizRating {
    pub fn from_counts(correct: usize, total: usize) -> Self {
        if correct == total {
            Self::Perfect
        } else if correct * 5 >= total * 4 {
            Self::Great
        } else {
            Self::KeepPracticing
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreReport {
    pub attempt_id: AttemptId,
    pub language: String,
    pub milestone_id: String,
    pub correct: usize,
    pub total: usize,
    pub score: u8,
    pub passed: bool,
    pub stars: u8,
    pub rating: QuizRating,
    pub completed_at: DateTime<Utc>,
}

/// Persisted per (language, milestone); the best score is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizResult {
    pub score: u8,
    pub passed: bool,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrongAnswer {
    pub word_id: String,
    pub prompt: String,
    pub user_answer: String,
    pub correct_answer: String,
    pub answered_at: DateTime<Utc>,
}

/// `round(100 * correct / total)`, half rounded up. Zero questions score 0.
pub fn score_percent(correct: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let correct = correct.min(total);
    ((200 * correct + total) / (2 * total)) as u8
}

/// One star per started 20 points.
pub fn stars(score: u8) -> u8 {
    score.min(100).div_ceil(20)
}

#[derive(Debug, Clone)]
pub struct QuizAttempt {
    id: AttemptId,
    language: String,
    milestone_id: String,
    questions: Vec<QuizQuestion>,
    current_index: usize,
    correct_count: usize,
    finished: bool,
}

impl QuizAttempt {
    /// One question per word, in unlock order.
    pub fn new(id: AttemptId, milestone: &Milestone) -> Self {
        let questions = milestone
            .words
            .iter()
            .map(|word| QuizQuestion::for_word(word, milestone))
            .collect();

        Self {
            id,
            language: milestone.language.clone(),
            milestone_id: milestone.id.clone(),
            questions,
            current_index: 0,
            correct_count: 0,
            finished: false,
        }
    }

    pub fn id(&self) -> AttemptId {
        self.id
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn milestone_id(&self) -> &str {
        &self.milestone_id
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    pub fn correct_count(&self) -> usize {
        self.correct_count
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn current_question(&self) -> Result<Option<QuestionView>> {
        if self.finished {
            return Err(Error::AttemptAlreadyFinished(self.id));
        }
        Ok(self.questions.get(self.current_index).map(|q| QuestionView {
            attempt_id: self.id,
            index: self.current_index,
            total: self.total(),
            word_id: q.word_id.clone(),
            prompt: q.prompt.clone(),
            options: q.options.clone(),
        }))
    }

    /// Answer the question for `word_id`. Exact, case-sensitive comparison.
    ///
    /// Answers are accepted in any order, but each word only once. Returns the
    /// outcome and, for wrong answers, the question that was missed.
    pub fn submit(&mut self, word_id: &str, answer: &str) -> Result<(AnswerOutcome, Option<QuizQuestion>)> {
        if self.finished {
            return Err(Error::AttemptAlreadyFinished(self.id));
        }
        let offset = self.questions[self.current_index..]
            .iter()
            .position(|q| q.word_id == word_id)
            .ok_or_else(|| {
                Error::not_found(format!(
                    "unanswered question for word '{word_id}' in attempt {}",
                    self.id
                ))
            })?;

        // Keep the answered question at `current_index` so the unanswered ones stay a suffix
        self.questions.swap(self.current_index, self.current_index + offset);
        let question = &self.questions[self.current_index];
        let correct = question.correct_answer == answer;
        let missed = (!correct).then(|| question.clone());
        let correct_answer = question.correct_answer.clone();

        if correct {
            self.correct_count += 1;
        }
        self.current_index += 1;

        Ok((
            AnswerOutcome {
                correct,
                correct_answer,
                remaining: self.total() - self.current_index,
            },
            missed,
        ))
    }

    /// Close the attempt and score it. Every question must be answered.
    pub fn finish(&mut self, pass_threshold: u8, now: DateTime<Utc>) -> Result<ScoreReport> {
        if self.finished {
            return Err(Error::AttemptAlreadyFinished(self.id));
        }
        let unanswered = self.total() - self.current_index;
        if unanswered > 0 {
            return Err(Error::invalid_transition(format!(
                "attempt {} has {unanswered} unanswered question(s)",
                self.id
            )));
        }

        self.finished = true;
        let score = score_percent(self.correct_count, self.total());
        Ok(ScoreReport {
            attempt_id: self.id,
            language: self.language.clone(),
            milestone_id: self.milestone_id.clone(),
            correct: self.correct_count,
            total: self.total(),
            score,
            passed: score >= pass_threshold,
            stars: stars(score),
            rating: QuizRating::from_counts(self.correct_count, self.total()),
            completed_at: now,
        })
    }
}
