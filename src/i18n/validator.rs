//! Translation table validation.
//!
//! Compares a language's table against the source-language table so that
//! gaps show up before a learner meets them as raw keys. Missing and extra keys
//! are warnings (the fallback chain covers them); a translation that drops or
//! invents a `{placeholder}` is an error, because interpolation would then
//! render wrong text.

use crate::i18n::table::TranslationTable;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Validation report containing errors and warnings about a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// Critical errors that indicate translation issues
    pub errors: Vec<String>,

    /// Non-critical warnings about potential issues
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Check if the report is clean (no errors or warnings)
    pub fn is_clean(&self) -> bool {
        !self.has_errors() && !self.has_warnings()
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

pub struct TranslationValidator;

static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();

impl TranslationValidator {
    /// Validate `translated` against the `source` table, namespace by namespace.
    pub fn validate(source: &TranslationTable, translated: &TranslationTable) -> ValidationReport {
        let mut report = ValidationReport::new();

        for namespace in translated.failed_namespaces() {
            report.warnings.push(format!(
                "[{}] namespace '{}' failed to load",
                translated.code(),
                namespace
            ));
        }

        let mut namespaces: Vec<&str> = source.namespace_names().collect();
        namespaces.sort_unstable();

        for namespace in namespaces {
            let Some(source_entries) = source.namespace(namespace) else {
                continue;
            };
            let translated_entries = translated.namespace(namespace);

            let mut source_keys: Vec<&String> = source_entries.keys().collect();
            source_keys.sort();

            for key in source_keys {
                let original = &source_entries[key];
                match translated_entries.and_then(|entries| entries.get(key)) {
                    None => report.warnings.push(format!(
                        "[{}] missing key {}.{}",
                        translated.code(),
                        namespace,
                        key
                    )),
                    Some(text) if text.trim().is_empty() => report.warnings.push(format!(
                        "[{}] empty value for {}.{}",
                        translated.code(),
                        namespace,
                        key
                    )),
                    Some(text) => {
                        let expected = Self::extract_placeholders(original);
                        let found = Self::extract_placeholders(text);
                        if expected != found {
                            report.errors.push(format!(
                                "[{}] placeholder mismatch in {}.{}: source has {:?}, translation has {:?}",
                                translated.code(),
                                namespace,
                                key,
                                expected,
                                found
                            ));
                        }
                    }
                }
            }

            if let Some(entries) = translated_entries {
                let mut extra: Vec<&String> = entries
                    .keys()
                    .filter(|key| !source_entries.contains_key(*key))
                    .collect();
                extra.sort();
                for key in extra {
                    report.warnings.push(format!(
                        "[{}] key {}.{} does not exist in the source language",
                        translated.code(),
                        namespace,
                        key
                    ));
                }
            }
        }

        report
    }

    /// Extract the set of `{name}` placeholders from a template.
    fn extract_placeholders(text: &str) -> BTreeSet<String> {
        let regex = PLACEHOLDER_REGEX
            .get_or_init(|| Regex::new(r"\{([a-zA-Z_][a-zA-Z0-9_]*)\}").expect("valid regex"));

        regex
            .captures_iter(text)
            .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::table::Namespace;

    fn table(code: &str, namespace: &str, pairs: &[(&str, &str)]) -> TranslationTable {
        let entries: Namespace = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut table = TranslationTable::new(code);
        table.insert_namespace(namespace, entries);
        table
    }

    // ==================== Placeholder Extraction Tests ====================

    #[test]
    fn test_extract_placeholders_single() {
        let found = TranslationValidator::extract_placeholders("Complete {count} more words");
        assert_eq!(found, BTreeSet::from(["count".to_string()]));
    }

    #[test]
    fn test_extract_placeholders_multiple_and_repeated() {
        let found =
            TranslationValidator::extract_placeholders("{score} of {total}, {score} again");
        assert_eq!(
            found,
            BTreeSet::from(["score".to_string(), "total".to_string()])
        );
    }

    #[test]
    fn test_extract_placeholders_none() {
        assert!(TranslationValidator::extract_placeholders("No placeholders {}").is_empty());
    }

    // ==================== Validation Tests ====================

    #[test]
    fn test_validate_perfect_translation() {
        let source = table("en", "common", &[("quiz_locked", "Complete {count} more words")]);
        let translated = table("fr", "common", &[("quiz_locked", "Encore {count} mots")]);

        let report = TranslationValidator::validate(&source, &translated);
        assert!(report.is_clean(), "{report:?}");
    }

    #[test]
    fn test_validate_missing_key_is_warning() {
        let source = table("en", "common", &[("a", "A"), ("b", "B")]);
        let translated = table("ko", "common", &[("a", "에이")]);

        let report = TranslationValidator::validate(&source, &translated);
        assert!(!report.has_errors());
        assert_eq!(report.warnings, vec!["[ko] missing key common.b".to_string()]);
    }

    #[test]
    fn test_validate_placeholder_mismatch_is_error() {
        let source = table("en", "common", &[("quiz_locked", "Complete {count} more words")]);
        let translated = table("he", "common", &[("quiz_locked", "השלימו עוד מילים")]);

        let report = TranslationValidator::validate(&source, &translated);
        assert!(report.has_errors());
        assert!(report.errors[0].contains("common.quiz_locked"));
    }

    #[test]
    fn test_validate_extra_and_empty_keys_are_warnings() {
        let source = table("en", "common", &[("a", "A")]);
        let translated = table("fr", "common", &[("a", "  "), ("z", "Zed")]);

        let report = TranslationValidator::validate(&source, &translated);
        assert!(!report.has_errors());
        assert_eq!(report.warnings.len(), 2);
        assert!(report.warnings[0].contains("empty value"));
        assert!(report.warnings[1].contains("common.z"));
    }

    #[test]
    fn test_validate_reports_failed_namespaces() {
        let source = table("en", "common", &[("a", "A")]);
        let mut translated = table("fr", "common", &[("a", "A")]);
        translated.insert_failed("auth");

        let report = TranslationValidator::validate(&source, &translated);
        assert!(report.warnings[0].contains("'auth' failed to load"));
    }

    #[test]
    fn test_report_default_is_clean() {
        assert!(ValidationReport::default().is_clean());
    }
}
