//! Internationalization (i18n) module.
//!
//! # Architecture
//!
//! - `registry`: Single source of truth for supported languages and their direction
//! - `language`: Validated `Language` handle onto a registry entry
//! - `table` / `loader`: Translation tables and the load-once, single-flight cache
//! - `resolver`: The `Translator` (display/learning fallback chain, preferences)
//! - `notice`: Structured, translatable user notices
//! - `validator`: Table completeness and placeholder checks
//! - `metrics`: Cache and fallback-tier counters
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vocab_quest::i18n::{FsTableSource, TableCache, Translator};
//!
//! let cache = Arc::new(TableCache::new(Arc::new(FsTableSource::new("locales"))));
//! let translator = Translator::new(cache, store);
//! translator.restore().await?;
//! translator.set_display_language("he").await?;
//! assert!(translator.is_rtl());
//! let title = translator.t("app_title", "common");
//! ```

mod language;
mod loader;
mod metrics;
mod notice;
mod registry;
mod resolver;
mod table;
mod validator;

pub use language::Language;
pub use loader::{FsTableSource, MemoryTableSource, TableCache, TableSource};
pub use metrics::{MetricsReport, ResolutionTier, TranslationMetrics};
pub use notice::{Notice, Severity};
pub use registry::{Direction, LanguageConfig, LanguageRegistry};
pub use resolver::{Preferences, Translator};
pub use table::{Namespace, TranslationTable};
pub use validator::{TranslationValidator, ValidationReport};
