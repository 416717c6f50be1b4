//! Locale checker - validates every translation table against the source language
//!
//! Usage:
//!   cargo run --bin check-locales
//!   cargo run --bin check-locales -- --strict   # Treat warnings as failures
//!
//! Optional:
//! - VOCABQUEST_LOCALES_DIR (defaults to locales)
//!
//! Exits non-zero when any table has placeholder errors (or warnings, with --strict).

use anyhow::{bail, Result};
use std::sync::Arc;
use tracing::info;
use vocab_quest::i18n::{FsTableSource, Language, LanguageRegistry, TableCache, TranslationValidator};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vocab_quest=info".parse()?),
        )
        .init();

    let strict = std::env::args().any(|arg| arg == "--strict");
    let locales_dir =
        std::env::var("VOCABQUEST_LOCALES_DIR").unwrap_or_else(|_| "locales".to_string());
    info!("Checking translation tables in {}", locales_dir);

    let cache = TableCache::new(Arc::new(FsTableSource::new(&locales_dir)));
    let source = cache.load(Language::source()).await;
    if !source.failed_namespaces().is_empty() {
        bail!(
            "Source language is missing namespaces: {}",
            source.failed_namespaces().join(", ")
        );
    }

    let mut errors = 0;
    let mut warnings = 0;
    for language in LanguageRegistry::get().list_all() {
        if language.is_source {
            continue;
        }
        let table = cache.load(Language::from_code(language.code)?).await;
        let report = TranslationValidator::validate(&source, &table);

        println!("{} {} ({})", language.flag, language.name, language.code);
        if report.is_clean() {
            println!("  ok ({} keys)", table.len());
        }
        for error in &report.errors {
            println!("  error: {error}");
        }
        for warning in &report.warnings {
            println!("  warning: {warning}");
        }

        errors += report.errors.len();
        warnings += report.warnings.len();
    }

    println!();
    println!("{errors} error(s), {warnings} warning(s)");

    if errors > 0 || (strict && warnings > 0) {
        bail!("Translation tables failed validation");
    }
    Ok(())
}
