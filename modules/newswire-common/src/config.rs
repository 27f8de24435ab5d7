use std::env;

use crate::error::NewswireError;

/// Application configuration loaded from environment variables.
///
/// Thresholds are validated up front: a threshold outside 0-100 is a fatal
/// configuration error surfaced before any matching work begins.
#[derive(Debug, Clone)]
pub struct Config {
    /// sqlx connection string, e.g. `sqlite:data/newswire.db`.
    pub database_url: String,

    // AI provider
    pub anthropic_api_key: String,
    pub model: String,

    // Dedup
    pub dedup_threshold: u32,
    pub borderline_low: u32,

    // Clustering
    pub group_threshold: u32,
    pub fuzzy_low: u32,
    pub fuzzy_high: u32,
    pub adjudication_batch_size: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, NewswireError> {
        let config = Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:data/newswire.db".to_string()),
            anthropic_api_key: required_env("ANTHROPIC_API_KEY")?,
            model: env::var("NEWSWIRE_MODEL")
                .unwrap_or_else(|_| "claude-sonnet-4-5-20250929".to_string()),
            dedup_threshold: threshold_env("DEDUP_THRESHOLD", 80)?,
            borderline_low: threshold_env("BORDERLINE_LOW", 50)?,
            group_threshold: threshold_env("GROUP_THRESHOLD", 60)?,
            fuzzy_low: threshold_env("FUZZY_LOW", 30)?,
            fuzzy_high: threshold_env("FUZZY_HIGH", 70)?,
            adjudication_batch_size: usize_env("ADJUDICATION_BATCH_SIZE", 15)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), NewswireError> {
        if self.borderline_low >= self.dedup_threshold {
            return Err(NewswireError::Config(format!(
                "BORDERLINE_LOW ({}) must be below DEDUP_THRESHOLD ({})",
                self.borderline_low, self.dedup_threshold
            )));
        }
        if self.fuzzy_low > self.fuzzy_high {
            return Err(NewswireError::Config(format!(
                "FUZZY_LOW ({}) must not exceed FUZZY_HIGH ({})",
                self.fuzzy_low, self.fuzzy_high
            )));
        }
        if self.adjudication_batch_size == 0 {
            return Err(NewswireError::Config(
                "ADJUDICATION_BATCH_SIZE must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn required_env(key: &str) -> Result<String, NewswireError> {
    env::var(key)
        .map_err(|_| NewswireError::Config(format!("{key} environment variable is required")))
}

fn threshold_env(key: &str, default: u32) -> Result<u32, NewswireError> {
    let value = match env::var(key) {
        Ok(raw) => raw
            .parse::<u32>()
            .map_err(|_| NewswireError::Config(format!("{key} must be a number, got {raw:?}")))?,
        Err(_) => default,
    };
    if value > 100 {
        return Err(NewswireError::Config(format!(
            "{key} must be within 0-100, got {value}"
        )));
    }
    Ok(value)
}

fn usize_env(key: &str, default: usize) -> Result<usize, NewswireError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse::<usize>()
            .map_err(|_| NewswireError::Config(format!("{key} must be a number, got {raw:?}"))),
        Err(_) => Ok(default),
    }
}
