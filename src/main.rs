use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use vocab_quest::api::{self, AppState};
use vocab_quest::catalog::StaticCatalog;
use vocab_quest::config::Config;
use vocab_quest::i18n::{FsTableSource, Language, LanguageRegistry, TableCache, TranslationValidator, Translator};
use vocab_quest::progress::ProgressionEngine;
use vocab_quest::store::FileStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vocab_quest=info".parse()?),
        )
        .init();

    info!("Starting VocabQuest");

    // Load configuration from environment
    let config = Config::from_env()?;

    let store = Arc::new(
        FileStore::open(&config.data_file)
            .with_context(|| format!("Failed to open store at {}", config.data_file.display()))?,
    );
    let catalog = Arc::new(
        StaticCatalog::from_json_file(&config.catalog_file)
            .with_context(|| format!("Failed to load catalog {}", config.catalog_file.display()))?,
    );

    let cache = Arc::new(TableCache::new(Arc::new(FsTableSource::new(&config.locales_dir))));
    let translator = Arc::new(Translator::new(cache.clone(), store.clone()));
    translator
        .restore()
        .await
        .context("Failed to restore language preferences")?;

    // Surface translation gaps at start-up; resolution falls back either way
    let source = cache.load(Language::source()).await;
    for language in LanguageRegistry::get().list_all() {
        if language.is_source {
            continue;
        }
        let table = cache.load(Language::from_code(language.code)?).await;
        let report = TranslationValidator::validate(&source, &table);
        for error in &report.errors {
            warn!("{}", error);
        }
        if report.has_warnings() {
            warn!(
                "{} translation warning(s) for '{}' (run check-locales for details)",
                report.warnings.len(),
                language.code
            );
        }
    }

    let engine = Arc::new(
        ProgressionEngine::new(catalog, store).with_pass_threshold(config.pass_threshold),
    );
    let app = api::create_router(AppState::new(engine, translator));

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
