//! Translation resolver.
//!
//! Holds the learner's display and learning languages and resolves UI keys
//! through the fallback chain:
//!
//! 1. learning language (only for [`Translator::t_learn`], and only when it
//!    differs from the display language)
//! 2. display language
//! 3. source language
//! 4. the raw key
//!
//! Resolution is synchronous and never fails. Tables that have not been
//! loaded yet simply do not participate, so a freshly built translator
//! returns keys verbatim.

use crate::error::{Error, Result};
use crate::i18n::loader::TableCache;
use crate::i18n::metrics::{MetricsReport, ResolutionTier};
use crate::i18n::table::TranslationTable;
use crate::i18n::{Direction, Language, Notice};
use crate::store::{self, keys, Store};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

/// Persisted language choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub display_language: String,
    #[serde(default)]
    pub learning_language: Option<String>,
}

impl Preferences {
    fn new(display: Language, learning: Option<Language>) -> Self {
        Self {
            display_language: display.code().to_string(),
            learning_language: learning.map(|l| l.code().to_string()),
        }
    }
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            display_language: Language::source().code().to_string(),
            learning_language: None,
        }
    }
}

struct ActiveLanguages {
    display: Language,
    learning: Option<Language>,
    display_table: Option<Arc<TranslationTable>>,
    learning_table: Option<Arc<TranslationTable>>,
    source_table: Option<Arc<TranslationTable>>,
}

pub struct Translator {
    cache: Arc<TableCache>,
    store: Arc<dyn Store>,
    state: RwLock<ActiveLanguages>,
    rtl: AtomicBool,
    /// Serializes language changes so persisted and active choices agree
    update_lock: tokio::sync::Mutex<()>,
}

impl Translator {
    /// Create a translator displaying the source language, with no tables loaded.
    pub fn new(cache: Arc<TableCache>, store: Arc<dyn Store>) -> Self {
        let display = Language::source();
        Self {
            cache,
            store,
            rtl: AtomicBool::new(display.is_rtl()),
            update_lock: tokio::sync::Mutex::new(()),
            state: RwLock::new(ActiveLanguages {
                display,
                learning: None,
                display_table: None,
                learning_table: None,
                source_table: None,
            }),
        }
    }

    /// Restore persisted preferences and load the tables they need.
    ///
    /// Unknown saved codes fall back to the source language (display) or to
    /// no learning language. Undecodable preferences are logged and replaced
    /// by the defaults.
    pub async fn restore(&self) -> Result<()> {
        let saved = match store::load::<Preferences>(self.store.as_ref(), keys::PREFERENCES) {
            Ok(saved) => saved.unwrap_or_default(),
            Err(e @ Error::CorruptState { .. }) => {
                warn!("Ignoring saved language preferences: {}", e);
                Preferences::default()
            }
            Err(e) => return Err(e),
        };

        let display_language = Language::from_code(&saved.display_language).unwrap_or_else(|_| {
            warn!(
                "Saved display language '{}' is not supported, using source language",
                saved.display_language
            );
            Language::source()
        });
        let learning_language = saved
            .learning_language
            .as_deref()
            .and_then(|code| Language::from_code(code).ok())
            .filter(|learning| *learning != display_language);

        let source_table = self.cache.load(Language::source()).await;
        let display_table = self.cache.load(display_language).await;
        let learning_table = match learning_language {
            Some(learning) => Some(self.cache.load(learning).await),
            None => None,
        };

        {
            let mut state = self.write_state();
            state.display = display_language;
            state.learning = learning_language;
            state.source_table = Some(source_table);
            state.display_table = Some(display_table);
            state.learning_table = learning_table;
        }
        self.rtl.store(display_language.is_rtl(), Ordering::SeqCst);

        let display_code = display_language.code();
        let learning_code = learning_language.map(|l| l.code()).unwrap_or("none");
        info!(
            "Languages restored: display={}, learning={}",
            display_code, learning_code
        );
        Ok(())
    }

    /// Switch the UI language.
    ///
    /// Unknown codes are rejected and leave the state untouched. The choice is
    /// persisted before it takes effect, so a failed write changes nothing.
    /// On success the direction flag follows the new language.
    pub async fn set_display_language(&self, code: &str) -> Result<()> {
        let language = Language::from_code(code).inspect_err(|_| {
            warn!("Rejected unsupported display language '{}'", code);
        })?;
        let _update = self.update_lock.lock().await;
        let learning = {
            let state = self.read_state();
            if language == state.display && state.display_table.is_some() {
                return Ok(());
            }
            state.learning
        };

        let table = self.cache.load(language).await;
        let source_table = self.cache.load(Language::source()).await;
        self.persist(Preferences::new(language, learning)).await?;
        {
            let mut state = self.write_state();
            state.display = language;
            state.display_table = Some(table);
            state.source_table = Some(source_table);
        }
        self.rtl.store(language.is_rtl(), Ordering::SeqCst);

        info!("Display language set to {} ({})", language, language.direction().as_str());
        Ok(())
    }

    /// Choose (or clear, with `None`) the language being studied.
    ///
    /// The learning language must differ from the display language; an equal
    /// code is rejected with `SameAsDisplay` and changes nothing.
    pub async fn set_learning_language(&self, code: Option<&str>) -> Result<()> {
        let _update = self.update_lock.lock().await;
        let display = self.display_language();
        let Some(code) = code else {
            self.persist(Preferences::new(display, None)).await?;
            let mut state = self.write_state();
            state.learning = None;
            state.learning_table = None;
            return Ok(());
        };

        let language = Language::from_code(code).inspect_err(|_| {
            warn!("Rejected unsupported learning language '{}'", code);
        })?;
        if language == display {
            warn!("Rejected learning language {}: same as display language", language);
            return Err(Error::SameAsDisplay(language.code().to_string()));
        }

        let table = self.cache.load(language).await;
        self.persist(Preferences::new(display, Some(language))).await?;
        {
            let mut state = self.write_state();
            state.learning = Some(language);
            state.learning_table = Some(table);
        }

        info!("Learning language set to {}", language);
        Ok(())
    }

    /// Resolve UI text: display → source → key.
    pub fn t(&self, key: &str, namespace: &str) -> String {
        let state = self.read_state();
        let chain = [
            (ResolutionTier::Display, state.display_table.as_deref()),
            (ResolutionTier::Source, state.source_table.as_deref()),
        ];
        self.resolve(&chain, key, namespace)
    }

    /// Resolve learnable text: learning → display → source → key.
    pub fn t_learn(&self, key: &str, namespace: &str) -> String {
        let state = self.read_state();
        let learning_table = match state.learning {
            Some(learning) if learning != state.display => state.learning_table.as_deref(),
            _ => None,
        };
        let chain = [
            (ResolutionTier::Learning, learning_table),
            (ResolutionTier::Display, state.display_table.as_deref()),
            (ResolutionTier::Source, state.source_table.as_deref()),
        ];
        self.resolve(&chain, key, namespace)
    }

    /// Render a structured notice in the display language.
    pub fn render(&self, notice: &Notice) -> String {
        notice.interpolate(&self.t(notice.key, notice.namespace))
    }

    pub fn display_language(&self) -> Language {
        self.read_state().display
    }

    pub fn learning_language(&self) -> Option<Language> {
        self.read_state().learning
    }

    /// Direction of the current display language.
    pub fn is_rtl(&self) -> bool {
        self.rtl.load(Ordering::SeqCst)
    }

    pub fn direction(&self) -> Direction {
        if self.is_rtl() {
            Direction::Rtl
        } else {
            Direction::Ltr
        }
    }

    pub fn metrics(&self) -> MetricsReport {
        self.cache.metrics().report()
    }

    fn resolve(
        &self,
        chain: &[(ResolutionTier, Option<&TranslationTable>)],
        key: &str,
        namespace: &str,
    ) -> String {
        let metrics = self.cache.metrics();
        for (tier, table) in chain {
            if let Some(text) = table.and_then(|table| table.get(namespace, key)) {
                metrics.record_resolution(*tier);
                return text.to_string();
            }
        }
        metrics.record_resolution(ResolutionTier::Key);
        key.to_string()
    }

    /// Store writes are blocking file I/O; run them off the async workers.
    async fn persist(&self, preferences: Preferences) -> Result<()> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || {
            store::save(store.as_ref(), keys::PREFERENCES, &preferences)
        })
        .await
        .map_err(|e| Error::Storage(format!("preferences write task failed: {e}")))?
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, ActiveLanguages> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, ActiveLanguages> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::loader::MemoryTableSource;
    use crate::store::MemoryStore;

    fn test_source() -> MemoryTableSource {
        MemoryTableSource::new()
            .with_namespace(
                "en",
                "common",
                &[("welcome", "Welcome"), ("only_english", "Only in English")],
            )
            .with_namespace("en", "learn", &[("cat", "cat"), ("dog", "dog")])
            .with_namespace("he", "common", &[("welcome", "ברוכים הבאים")])
            .with_namespace("he", "learn", &[("cat", "חתול")])
            .with_namespace("fr", "common", &[("welcome", "Bienvenue")])
            .with_namespace("fr", "learn", &[("cat", "chat"), ("dog", "chien")])
    }

    fn create_translator() -> (Translator, MemoryStore) {
        let store = MemoryStore::new();
        let cache = Arc::new(TableCache::new(Arc::new(test_source())));
        (Translator::new(cache, Arc::new(store.clone())), store)
    }

    // ==================== Fallback Chain Tests ====================

    #[test]
    fn test_missing_key_without_tables_returns_key() {
        let (translator, _store) = create_translator();
        assert_eq!(translator.t("missing_key", "common"), "missing_key");
        assert_eq!(translator.t_learn("missing_key", "common"), "missing_key");
    }

    #[tokio::test]
    async fn test_display_language_first() {
        let (translator, _store) = create_translator();
        translator.restore().await.unwrap();
        translator.set_display_language("he").await.unwrap();

        assert_eq!(translator.t("welcome", "common"), "ברוכים הבאים");
    }

    #[tokio::test]
    async fn test_falls_back_to_source_then_key() {
        let (translator, _store) = create_translator();
        translator.restore().await.unwrap();
        translator.set_display_language("he").await.unwrap();

        assert_eq!(translator.t("only_english", "common"), "Only in English");
        assert_eq!(translator.t("nowhere", "common"), "nowhere");
        assert_eq!(translator.t("welcome", "no_such_namespace"), "welcome");
    }

    #[tokio::test]
    async fn test_t_learn_uses_learning_language_first() {
        let (translator, _store) = create_translator();
        translator.restore().await.unwrap();
        translator.set_display_language("he").await.unwrap();
        translator.set_learning_language(Some("fr")).await.unwrap();

        assert_eq!(translator.t_learn("cat", "learn"), "chat");
        // UI chrome stays in the display language
        assert_eq!(translator.t("cat", "learn"), "חתול");
        // Missing in French: display language, then source
        assert_eq!(translator.t_learn("welcome", "common"), "Bienvenue");
        assert_eq!(translator.t_learn("only_english", "common"), "Only in English");
    }

    #[tokio::test]
    async fn test_t_learn_without_learning_language_matches_t() {
        let (translator, _store) = create_translator();
        translator.restore().await.unwrap();
        translator.set_display_language("fr").await.unwrap();

        for key in ["cat", "dog", "welcome", "only_english", "missing"] {
            assert_eq!(translator.t_learn(key, "learn"), translator.t(key, "learn"));
            assert_eq!(translator.t_learn(key, "common"), translator.t(key, "common"));
        }
    }

    #[tokio::test]
    async fn test_t_learn_ignores_learning_equal_to_display() {
        let (translator, _store) = create_translator();
        translator.restore().await.unwrap();
        translator.set_learning_language(Some("fr")).await.unwrap();
        // Display moves onto the learning language; learning no longer applies
        translator.set_display_language("fr").await.unwrap();

        assert_eq!(translator.t_learn("dog", "learn"), "chien");
        assert_eq!(translator.t_learn("dog", "learn"), translator.t("dog", "learn"));
    }

    // ==================== Language Selection Tests ====================

    #[tokio::test]
    async fn test_set_display_language_unknown_is_rejected() {
        let (translator, store) = create_translator();
        translator.restore().await.unwrap();

        let result = translator.set_display_language("xx").await;

        assert!(matches!(result, Err(Error::UnknownLanguage(code)) if code == "xx"));
        assert_eq!(translator.display_language(), Language::ENGLISH);
        assert_eq!(store.get(keys::PREFERENCES).unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_display_language_updates_direction() {
        let (translator, _store) = create_translator();
        assert!(!translator.is_rtl());

        translator.set_display_language("he").await.unwrap();
        assert!(translator.is_rtl());
        assert_eq!(translator.direction(), Direction::Rtl);

        translator.set_display_language("ko").await.unwrap();
        assert!(!translator.is_rtl());
        assert_eq!(translator.direction().as_str(), "ltr");
    }

    #[tokio::test]
    async fn test_set_learning_language_same_as_display_rejected() {
        let (translator, _store) = create_translator();
        translator.set_display_language("fr").await.unwrap();

        let result = translator.set_learning_language(Some("fr")).await;

        assert!(matches!(result, Err(Error::SameAsDisplay(code)) if code == "fr"));
        assert_eq!(translator.learning_language(), None);
    }

    #[tokio::test]
    async fn test_set_learning_language_unknown_rejected() {
        let (translator, _store) = create_translator();
        let result = translator.set_learning_language(Some("es")).await;
        assert!(matches!(result, Err(Error::UnknownLanguage(_))));
    }

    #[tokio::test]
    async fn test_clear_learning_language() {
        let (translator, _store) = create_translator();
        translator.set_learning_language(Some("ko")).await.unwrap();
        assert_eq!(translator.learning_language(), Some(Language::KOREAN));

        translator.set_learning_language(None).await.unwrap();
        assert_eq!(translator.learning_language(), None);
    }

    // ==================== Persistence Tests ====================

    #[tokio::test]
    async fn test_preferences_are_persisted() {
        let (translator, store) = create_translator();
        translator.set_display_language("he").await.unwrap();
        translator.set_learning_language(Some("fr")).await.unwrap();

        let saved: Preferences = store::load(&store, keys::PREFERENCES).unwrap().unwrap();
        assert_eq!(
            saved,
            Preferences {
                display_language: "he".to_string(),
                learning_language: Some("fr".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_restore_from_saved_preferences() {
        let store = MemoryStore::new();
        store::save(
            &store,
            keys::PREFERENCES,
            &Preferences {
                display_language: "he".to_string(),
                learning_language: Some("fr".to_string()),
            },
        )
        .unwrap();
        let cache = Arc::new(TableCache::new(Arc::new(test_source())));
        let translator = Translator::new(cache, Arc::new(store));

        translator.restore().await.unwrap();

        assert_eq!(translator.display_language(), Language::HEBREW);
        assert_eq!(translator.learning_language(), Some(Language::FRENCH));
        assert!(translator.is_rtl());
        assert_eq!(translator.t_learn("cat", "learn"), "chat");
    }

    #[tokio::test]
    async fn test_restore_with_unknown_saved_codes_falls_back() {
        let store = MemoryStore::new();
        store
            .put(
                keys::PREFERENCES,
                serde_json::json!({"display_language": "xx", "learning_language": "yy"}),
            )
            .unwrap();
        let cache = Arc::new(TableCache::new(Arc::new(test_source())));
        let translator = Translator::new(cache, Arc::new(store));

        translator.restore().await.unwrap();

        assert_eq!(translator.display_language(), Language::ENGLISH);
        assert_eq!(translator.learning_language(), None);
    }

    #[tokio::test]
    async fn test_restore_with_corrupt_preferences_uses_defaults() {
        let store = MemoryStore::new();
        store.put(keys::PREFERENCES, serde_json::json!(42)).unwrap();
        let cache = Arc::new(TableCache::new(Arc::new(test_source())));
        let translator = Translator::new(cache, Arc::new(store));

        translator.restore().await.unwrap();
        assert_eq!(translator.display_language(), Language::ENGLISH);
    }

    struct ReadOnlyStore;

    impl Store for ReadOnlyStore {
        fn get(&self, _key: &str) -> Result<Option<serde_json::Value>> {
            Ok(None)
        }

        fn put(&self, _key: &str, _value: serde_json::Value) -> Result<()> {
            Err(Error::Storage("read-only".to_string()))
        }

        fn remove(&self, _key: &str) -> Result<()> {
            Err(Error::Storage("read-only".to_string()))
        }
    }

    #[tokio::test]
    async fn test_failed_persist_keeps_previous_languages() {
        let cache = Arc::new(TableCache::new(Arc::new(test_source())));
        let translator = Translator::new(cache, Arc::new(ReadOnlyStore));
        translator.restore().await.unwrap();

        let result = translator.set_display_language("he").await;
        assert!(matches!(result, Err(Error::Storage(_))));
        assert_eq!(translator.display_language(), Language::ENGLISH);
        assert!(!translator.is_rtl());
        assert_eq!(translator.t("welcome", "common"), "Welcome");

        let result = translator.set_learning_language(Some("fr")).await;
        assert!(matches!(result, Err(Error::Storage(_))));
        assert_eq!(translator.learning_language(), None);
        assert_eq!(translator.t_learn("cat", "learn"), "cat");
    }

    // ==================== Metrics Tests ====================

    #[tokio::test]
    async fn test_metrics_track_resolution_tiers() {
        let (translator, _store) = create_translator();
        translator.restore().await.unwrap();
        translator.set_display_language("fr").await.unwrap();

        translator.t("welcome", "common");
        translator.t("only_english", "common");
        translator.t("missing", "common");

        let report = translator.metrics();
        assert_eq!(report.resolved_display, 1);
        assert_eq!(report.resolved_source, 1);
        assert_eq!(report.resolved_key, 1);
    }
}
