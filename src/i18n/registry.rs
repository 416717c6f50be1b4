//! Language registry: Single source of truth for all supported languages.
//!
//! The registry is fixed at build time and initialized lazily through
//! `OnceLock`. Lookups never fail: unknown codes resolve to `None` (or `false`
//! for direction checks) and callers decide what absence means.

use serde::Serialize;
use std::sync::OnceLock;

/// Text direction of a language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ltr,
    Rtl,
}

impl Direction {
    /// Value for the HTML `dir` attribute.
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Ltr => "ltr",
            Direction::Rtl => "rtl",
        }
    }
}

/// Configuration for a supported language.
#[derive(Debug, Clone, Serialize)]
pub struct LanguageConfig {
    /// ISO 639-1 language code (e.g., "en", "he")
    pub code: &'static str,

    /// English name of the language (e.g., "Hebrew")
    pub name: &'static str,

    /// Native name of the language (e.g., "עברית")
    pub native_name: &'static str,

    /// Flag glyph shown in the language picker
    pub flag: &'static str,

    pub direction: Direction,

    /// Whether this is the source (and fallback) language. Exactly one is.
    pub is_source: bool,
}

impl LanguageConfig {
    pub fn is_rtl(&self) -> bool {
        self.direction == Direction::Rtl
    }
}

/// Global language registry singleton.
pub struct LanguageRegistry {
    languages: Vec<LanguageConfig>,
    namespaces: Vec<&'static str>,
}

static REGISTRY: OnceLock<LanguageRegistry> = OnceLock::new();

impl LanguageRegistry {
    /// Get the global language registry instance.
    pub fn get() -> &'static LanguageRegistry {
        REGISTRY.get_or_init(|| LanguageRegistry {
            languages: default_languages(),
            namespaces: vec!["common", "home", "learn", "auth", "navigation"],
        })
    }

    /// Get a language configuration by its code (exact match).
    pub fn get_by_code(&self, code: &str) -> Option<&LanguageConfig> {
        self.languages.iter().find(|lang| lang.code == code)
    }

    /// Get all languages in registry order.
    pub fn list_all(&self) -> Vec<&LanguageConfig> {
        self.languages.iter().collect()
    }

    /// Translation namespaces loaded for every language.
    pub fn namespaces(&self) -> &[&'static str] {
        &self.namespaces
    }

    /// Get the source language configuration.
    ///
    /// # Panics
    /// Panics if the static table does not define exactly one source language.
    pub fn source(&self) -> &LanguageConfig {
        let sources: Vec<_> = self.languages.iter().filter(|lang| lang.is_source).collect();

        match sources.len() {
            0 => panic!("No source language found in registry"),
            1 => sources[0],
            _ => panic!("Multiple source languages found in registry"),
        }
    }

    /// Check if a language code is supported.
    pub fn contains(&self, code: &str) -> bool {
        self.get_by_code(code).is_some()
    }

    /// Whether the language is written right-to-left. Unknown codes are `false`.
    pub fn is_rtl(&self, code: &str) -> bool {
        self.get_by_code(code)
            .map(LanguageConfig::is_rtl)
            .unwrap_or(false)
    }
}

fn default_languages() -> Vec<LanguageConfig> {
    vec![
        LanguageConfig {
            code: "en",
            name: "English",
            native_name: "English",
            flag: "🇺🇸",
            direction: Direction::Ltr,
            is_source: true,
        },
        LanguageConfig {
            code: "he",
            name: "Hebrew",
            native_name: "עברית",
            flag: "🇮🇱",
            direction: Direction::Rtl,
            is_source: false,
        },
        LanguageConfig {
            code: "fr",
            name: "French",
            native_name: "Français",
            flag: "🇫🇷",
            direction: Direction::Ltr,
            is_source: false,
        },
        LanguageConfig {
            code: "ko",
            name: "Korean",
            native_name: "한국어",
            flag: "🇰🇷",
            direction: Direction::Ltr,
            is_source: false,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_get_returns_singleton() {
        let registry1 = LanguageRegistry::get();
        let registry2 = LanguageRegistry::get();

        assert!(std::ptr::eq(registry1, registry2));
    }

    #[test]
    fn test_supports_required_languages() {
        let registry = LanguageRegistry::get();
        let codes: Vec<_> = registry.list_all().iter().map(|l| l.code).collect();

        assert_eq!(codes, vec!["en", "he", "fr", "ko"]);
    }

    #[test]
    fn test_get_by_code_hebrew() {
        let config = LanguageRegistry::get()
            .get_by_code("he")
            .expect("Hebrew should be registered");

        assert_eq!(config.name, "Hebrew");
        assert_eq!(config.native_name, "עברית");
        assert_eq!(config.direction, Direction::Rtl);
        assert!(config.is_rtl());
        assert!(!config.is_source);
    }

    #[test]
    fn test_get_by_code_is_exact_match() {
        let registry = LanguageRegistry::get();
        assert!(registry.get_by_code("EN").is_none());
        assert!(registry.get_by_code("en-US").is_none());
        assert!(registry.get_by_code("").is_none());
    }

    #[test]
    fn test_get_by_code_unknown() {
        assert!(LanguageRegistry::get().get_by_code("invalid").is_none());
    }

    #[test]
    fn test_is_rtl() {
        let registry = LanguageRegistry::get();
        assert!(registry.is_rtl("he"));
        assert!(!registry.is_rtl("en"));
        assert!(!registry.is_rtl("fr"));
        assert!(!registry.is_rtl("ko"));
        assert!(!registry.is_rtl("unknown"));
    }

    #[test]
    fn test_source_is_english() {
        let source = LanguageRegistry::get().source();
        assert_eq!(source.code, "en");
        assert_eq!(source.direction.as_str(), "ltr");
    }

    #[test]
    fn test_namespaces_include_common_and_learn() {
        let namespaces = LanguageRegistry::get().namespaces();
        assert!(namespaces.contains(&"common"));
        assert!(namespaces.contains(&"learn"));
        assert_eq!(namespaces.len(), 5);
    }

    #[test]
    fn test_every_language_has_flag_and_native_name() {
        for lang in LanguageRegistry::get().list_all() {
            assert!(!lang.flag.is_empty(), "{} has no flag", lang.code);
            assert!(!lang.native_name.is_empty(), "{} has no native name", lang.code);
        }
    }
}
