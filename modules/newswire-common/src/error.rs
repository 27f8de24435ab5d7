use thiserror::Error;

#[derive(Error, Debug)]
pub enum NewswireError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Adjudicator error: {0}")]
    Adjudicator(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
