//! Translation table loading with a load-once, single-flight cache.
//!
//! A [`TableSource`] knows how to fetch one namespace of one language. The
//! [`TableCache`] loads every registered namespace for a language exactly once
//! per process: concurrent requests for a language that is still loading await
//! the same shared future instead of starting another load.

use crate::error::{Error, Result};
use crate::i18n::table::{Namespace, TranslationTable};
use crate::i18n::{Language, LanguageRegistry, TranslationMetrics};
use futures::future::{join_all, BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Fetches raw translation namespaces.
pub trait TableSource: Send + Sync {
    fn load_namespace(&self, code: &str, namespace: &str) -> BoxFuture<'static, Result<Namespace>>;
}

/// Reads `{root}/{code}/{namespace}.json`, each a flat JSON object of strings.
#[derive(Debug, Clone)]
pub struct FsTableSource {
    root: PathBuf,
}

impl FsTableSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl TableSource for FsTableSource {
    fn load_namespace(&self, code: &str, namespace: &str) -> BoxFuture<'static, Result<Namespace>> {
        let path = self.root.join(code).join(format!("{namespace}.json"));
        let code = code.to_string();

        async move {
            let raw = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::LoadFailure {
                    code: code.clone(),
                    reason: format!("{}: {}", path.display(), e),
                })?;

            serde_json::from_str::<Namespace>(&raw).map_err(|e| Error::LoadFailure {
                code,
                reason: format!("{}: {}", path.display(), e),
            })
        }
        .boxed()
    }
}

/// In-memory source, used by tests and for embedding fixed tables.
#[derive(Debug, Default)]
pub struct MemoryTableSource {
    namespaces: HashMap<(String, String), Namespace>,
    delay: Option<Duration>,
    loads: Arc<AtomicUsize>,
}

impl MemoryTableSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(mut self, code: &str, namespace: &str, entries: &[(&str, &str)]) -> Self {
        let entries = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.namespaces
            .insert((code.to_string(), namespace.to_string()), entries);
        self
    }

    /// Delay every namespace load, to make overlapping requests observable.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of namespace loads issued so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl TableSource for MemoryTableSource {
    fn load_namespace(&self, code: &str, namespace: &str) -> BoxFuture<'static, Result<Namespace>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let found = self
            .namespaces
            .get(&(code.to_string(), namespace.to_string()))
            .cloned();
        let delay = self.delay;
        let code = code.to_string();
        let namespace = namespace.to_string();

        async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            found.ok_or_else(|| Error::LoadFailure {
                code,
                reason: format!("no '{namespace}' namespace"),
            })
        }
        .boxed()
    }
}

type PendingLoad = Shared<BoxFuture<'static, Arc<TranslationTable>>>;

enum Slot {
    Loading(PendingLoad),
    Ready(Arc<TranslationTable>),
}

/// Process-lifetime cache of translation tables, keyed by language.
pub struct TableCache {
    source: Arc<dyn TableSource>,
    slots: Mutex<HashMap<&'static str, Slot>>,
    metrics: Arc<TranslationMetrics>,
}

impl TableCache {
    pub fn new(source: Arc<dyn TableSource>) -> Self {
        Self::with_metrics(source, Arc::new(TranslationMetrics::new()))
    }

    pub fn with_metrics(source: Arc<dyn TableSource>, metrics: Arc<TranslationMetrics>) -> Self {
        Self {
            source,
            slots: Mutex::new(HashMap::new()),
            metrics,
        }
    }

    pub fn metrics(&self) -> &Arc<TranslationMetrics> {
        &self.metrics
    }

    /// Load (or return the cached) table for a language code.
    ///
    /// Unknown codes fail with `UnknownLanguage`. Namespace failures never
    /// fail the call: those namespaces are empty in the returned table.
    pub async fn load_code(&self, code: &str) -> Result<Arc<TranslationTable>> {
        let language = Language::from_code(code)?;
        Ok(self.load(language).await)
    }

    pub async fn load(&self, language: Language) -> Arc<TranslationTable> {
        let code = language.code();
        let pending = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            match slots.get(code) {
                Some(Slot::Ready(table)) => {
                    self.metrics.record_cache_hit();
                    return Arc::clone(table);
                }
                Some(Slot::Loading(pending)) => {
                    debug!("Joining in-flight translation load for {}", code);
                    self.metrics.record_cache_hit();
                    pending.clone()
                }
                None => {
                    self.metrics.record_cache_miss();
                    let pending =
                        load_all(Arc::clone(&self.source), code, Arc::clone(&self.metrics))
                            .boxed()
                            .shared();
                    slots.insert(code, Slot::Loading(pending.clone()));
                    pending
                }
            }
        };

        let table = pending.await;
        self.slots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(code, Slot::Ready(Arc::clone(&table)));
        table
    }

    /// The table for a language if its load has completed.
    pub fn cached(&self, language: Language) -> Option<Arc<TranslationTable>> {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        match slots.get(language.code()) {
            Some(Slot::Ready(table)) => Some(Arc::clone(table)),
            _ => None,
        }
    }
}

async fn load_all(
    source: Arc<dyn TableSource>,
    code: &'static str,
    metrics: Arc<TranslationMetrics>,
) -> Arc<TranslationTable> {
    let namespaces = LanguageRegistry::get().namespaces();
    let loads = namespaces.iter().map(|namespace| {
        let load = source.load_namespace(code, namespace);
        async move { (*namespace, load.await) }
    });

    let mut table = TranslationTable::new(code);
    for (namespace, result) in join_all(loads).await {
        match result {
            Ok(entries) => table.insert_namespace(namespace, entries),
            Err(e) => {
                warn!("Failed to load {} translations for {}: {}", namespace, code, e);
                metrics.record_namespace_failure();
                table.insert_failed(namespace);
            }
        }
    }

    info!(
        "Loaded {} translations for {} ({} namespace(s) failed)",
        table.len(),
        code,
        table.failed_namespaces().len()
    );
    Arc::new(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn french_source() -> MemoryTableSource {
        MemoryTableSource::new()
            .with_namespace("fr", "common", &[("hello", "Bonjour")])
            .with_namespace("fr", "learn", &[("cat", "Chat")])
    }

    // ==================== Load Tests ====================

    #[tokio::test]
    async fn test_load_collects_namespaces() {
        let cache = TableCache::new(Arc::new(french_source()));

        let table = cache.load(Language::FRENCH).await;

        assert_eq!(table.get("common", "hello"), Some("Bonjour"));
        assert_eq!(table.get("learn", "cat"), Some("Chat"));
    }

    #[tokio::test]
    async fn test_failed_namespaces_are_empty_not_fatal() {
        let cache = TableCache::new(Arc::new(french_source()));

        let table = cache.load(Language::FRENCH).await;

        // home, auth and navigation are missing from the source
        assert_eq!(table.failed_namespaces().len(), 3);
        assert!(table.namespace("auth").unwrap().is_empty());
        assert_eq!(table.get("common", "hello"), Some("Bonjour"));
        assert_eq!(cache.metrics().namespace_failures(), 3);
    }

    #[tokio::test]
    async fn test_load_code_unknown_language() {
        let cache = TableCache::new(Arc::new(MemoryTableSource::new()));

        let result = cache.load_code("xx").await;
        assert!(matches!(result, Err(Error::UnknownLanguage(code)) if code == "xx"));
    }

    // ==================== Cache Tests ====================

    #[tokio::test]
    async fn test_second_load_is_cached() {
        let source = Arc::new(french_source());
        let cache = TableCache::new(source.clone());

        let first = cache.load(Language::FRENCH).await;
        let loads_after_first = source.load_count();
        let second = cache.load(Language::FRENCH).await;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.load_count(), loads_after_first);
        assert_eq!(loads_after_first, LanguageRegistry::get().namespaces().len());
        assert_eq!(cache.metrics().cache_hits(), 1);
        assert_eq!(cache.metrics().cache_misses(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_loads_are_coalesced() {
        let source = Arc::new(french_source().with_delay(Duration::from_millis(20)));
        let cache = TableCache::new(source.clone());

        let (a, b, c) = tokio::join!(
            cache.load(Language::FRENCH),
            cache.load(Language::FRENCH),
            cache.load(Language::FRENCH)
        );

        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&b, &c));
        assert_eq!(source.load_count(), LanguageRegistry::get().namespaces().len());
        assert_eq!(cache.metrics().cache_misses(), 1);
    }

    #[tokio::test]
    async fn test_cached_only_after_completion() {
        let cache = TableCache::new(Arc::new(french_source()));

        assert!(cache.cached(Language::FRENCH).is_none());
        cache.load(Language::FRENCH).await;
        assert!(cache.cached(Language::FRENCH).is_some());
        assert!(cache.cached(Language::KOREAN).is_none());
    }

    // ==================== Filesystem Source Tests ====================

    #[tokio::test]
    async fn test_fs_source_reads_json_namespaces() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("he")).unwrap();
        std::fs::write(
            dir.path().join("he").join("common.json"),
            r#"{"hello": "שלום"}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("he").join("learn.json"), "not json").unwrap();

        let cache = TableCache::new(Arc::new(FsTableSource::new(dir.path())));
        let table = cache.load(Language::HEBREW).await;

        assert_eq!(table.get("common", "hello"), Some("שלום"));
        assert!(table.failed_namespaces().contains(&"learn".to_string()));
    }
}
