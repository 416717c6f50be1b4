//! Catalog collaborator: immutable milestones and their words.
//!
//! One data-driven catalog replaces per-language word lists. Every milestone
//! names a registered language, and its words are kept sorted by
//! `order_index`, so a word's position in `words` is its unlock rank.

use crate::error::{Error, Result};
use crate::i18n::LanguageRegistry;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    pub id: String,
    /// Text in the language being learned
    pub original_text: String,
    /// Expected quiz answer
    pub translated_text: String,
    pub order_index: u32,
    /// Wrong options offered in quizzes; other words' translations are used when empty
    #[serde(default)]
    pub distractors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: String,
    pub language: String,
    pub name: String,
    pub order_index: u32,
    pub words: Vec<Word>,
}

impl Milestone {
    pub fn total_words(&self) -> usize {
        self.words.len()
    }

    /// Position of a word in unlock order.
    pub fn position(&self, word_id: &str) -> Option<usize> {
        self.words.iter().position(|w| w.id == word_id)
    }

    pub fn word(&self, word_id: &str) -> Option<&Word> {
        self.words.iter().find(|w| w.id == word_id)
    }
}

pub trait Catalog: Send + Sync {
    fn milestone(&self, language: &str, milestone_id: &str) -> Option<&Milestone>;

    /// Milestones of a language, in `order_index` order.
    fn milestones(&self, language: &str) -> Vec<&Milestone>;
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    milestones: Vec<Milestone>,
}

/// Catalog held entirely in memory.
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    milestones: Vec<Milestone>,
}

impl StaticCatalog {
    /// Validate and index milestones.
    pub fn new(mut milestones: Vec<Milestone>) -> Result<Self> {
        let registry = LanguageRegistry::get();
        let mut seen_milestones = HashSet::new();

        for milestone in &mut milestones {
            let key = format!("catalog/{}/{}", milestone.language, milestone.id);
            if !registry.contains(&milestone.language) {
                return Err(Error::UnknownLanguage(milestone.language.clone()));
            }
            if !seen_milestones.insert((milestone.language.clone(), milestone.id.clone())) {
                return Err(Error::corrupt(key, "duplicate milestone id"));
            }
            if milestone.words.is_empty() {
                return Err(Error::corrupt(key, "milestone has no words"));
            }

            milestone.words.sort_by_key(|w| w.order_index);
            let mut word_ids = HashSet::new();
            for pair in milestone.words.windows(2) {
                if pair[0].order_index == pair[1].order_index {
                    return Err(Error::corrupt(
                        key,
                        format!("duplicate order_index {}", pair[0].order_index),
                    ));
                }
            }
            for word in &milestone.words {
                if !word_ids.insert(word.id.as_str()) {
                    return Err(Error::corrupt(key, format!("duplicate word id '{}'", word.id)));
                }
            }
        }

        milestones.sort_by(|a, b| {
            (a.language.as_str(), a.order_index).cmp(&(b.language.as_str(), b.order_index))
        });
        Ok(Self { milestones })
    }

    /// Load `{ "milestones": [...] }` from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let file: CatalogFile = serde_json::from_str(&raw)
            .map_err(|e| Error::corrupt(path.display().to_string(), e))?;

        let catalog = Self::new(file.milestones)?;
        info!(
            "Loaded catalog from {} ({} milestones)",
            path.display(),
            catalog.milestones.len()
        );
        Ok(catalog)
    }
}

impl Catalog for StaticCatalog {
    fn milestone(&self, language: &str, milestone_id: &str) -> Option<&Milestone> {
        self.milestones
            .iter()
            .find(|m| m.language == language && m.id == milestone_id)
    }

    fn milestones(&self, language: &str) -> Vec<&Milestone> {
        self.milestones
            .iter()
            .filter(|m| m.language == language)
            .collect()
    }
}
