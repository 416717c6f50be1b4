use anyhow::{bail, Context, Result};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    // Persistence
    pub data_file: PathBuf,

    // Content
    pub catalog_file: PathBuf,
    pub locales_dir: PathBuf,

    // Progression
    pub pass_threshold: u8,

    // HTTP
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let pass_threshold: u8 = match std::env::var("VOCABQUEST_PASS_THRESHOLD") {
            Ok(v) => v
                .trim()
                .parse()
                .with_context(|| format!("VOCABQUEST_PASS_THRESHOLD is not a number: '{v}'"))?,
            Err(_) => 80,
        };
        if pass_threshold > 100 {
            bail!("VOCABQUEST_PASS_THRESHOLD must be between 0 and 100, got {pass_threshold}");
        }

        Ok(Self {
            data_file: std::env::var("VOCABQUEST_DATA_FILE")
                .unwrap_or_else(|_| "data/progress.json".to_string())
                .into(),

            catalog_file: std::env::var("VOCABQUEST_CATALOG_FILE")
                .unwrap_or_else(|_| "data/catalog.json".to_string())
                .into(),
            locales_dir: std::env::var("VOCABQUEST_LOCALES_DIR")
                .unwrap_or_else(|_| "locales".to_string())
                .into(),

            pass_threshold,

            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
        })
    }
}
