//! Translation metrics and observability module.
//!
//! Tracks table cache behaviour and which fallback tier answered each lookup.
//! One instance is shared (behind an `Arc`) by a table cache and the
//! translator built on top of it.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Which step of the fallback chain produced a resolved string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionTier {
    Learning,
    Display,
    Source,
    /// Nothing matched: the raw key was returned
    Key,
}

#[derive(Debug, Default)]
pub struct TranslationMetrics {
    /// Table requests answered from the cache (including coalesced in-flight loads)
    cache_hits: AtomicUsize,

    /// Table requests that started a new load
    cache_misses: AtomicUsize,

    /// Namespaces that failed to load and were replaced by an empty table
    namespace_failures: AtomicUsize,

    resolved_learning: AtomicUsize,
    resolved_display: AtomicUsize,
    resolved_source: AtomicUsize,
    resolved_key: AtomicUsize,
}

impl TranslationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_namespace_failure(&self) {
        self.namespace_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_resolution(&self, tier: ResolutionTier) {
        let counter = match tier {
            ResolutionTier::Learning => &self.resolved_learning,
            ResolutionTier::Display => &self.resolved_display,
            ResolutionTier::Source => &self.resolved_source,
            ResolutionTier::Key => &self.resolved_key,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_hits(&self) -> usize {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> usize {
        self.cache_misses.load(Ordering::Relaxed)
    }

    pub fn namespace_failures(&self) -> usize {
        self.namespace_failures.load(Ordering::Relaxed)
    }

    pub fn resolutions(&self, tier: ResolutionTier) -> usize {
        match tier {
            ResolutionTier::Learning => self.resolved_learning.load(Ordering::Relaxed),
            ResolutionTier::Display => self.resolved_display.load(Ordering::Relaxed),
            ResolutionTier::Source => self.resolved_source.load(Ordering::Relaxed),
            ResolutionTier::Key => self.resolved_key.load(Ordering::Relaxed),
        }
    }

    /// Generate a metrics report.
    pub fn report(&self) -> MetricsReport {
        let hits = self.cache_hits();
        let misses = self.cache_misses();
        let total_cache_queries = hits + misses;
        let cache_hit_rate = if total_cache_queries > 0 {
            (hits as f64 / total_cache_queries as f64) * 100.0
        } else {
            0.0
        };

        let learning = self.resolutions(ResolutionTier::Learning);
        let display = self.resolutions(ResolutionTier::Display);
        let source = self.resolutions(ResolutionTier::Source);
        let key = self.resolutions(ResolutionTier::Key);
        let total_lookups = learning + display + source + key;
        let key_fallback_rate = if total_lookups > 0 {
            (key as f64 / total_lookups as f64) * 100.0
        } else {
            0.0
        };

        MetricsReport {
            cache_hits: hits,
            cache_misses: misses,
            cache_hit_rate,
            namespace_failures: self.namespace_failures(),
            resolved_learning: learning,
            resolved_display: display,
            resolved_source: source,
            resolved_key: key,
            key_fallback_rate,
        }
    }
}

/// Snapshot of the translation counters.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub cache_hits: usize,
    pub cache_misses: usize,

    /// Cache hit rate as a percentage (0-100)
    pub cache_hit_rate: f64,

    pub namespace_failures: usize,
    pub resolved_learning: usize,
    pub resolved_display: usize,
    pub resolved_source: usize,
    pub resolved_key: usize,

    /// Share of lookups that fell through to the raw key (0-100)
    pub key_fallback_rate: f64,
}
