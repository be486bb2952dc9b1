//! Error types for the humorbench-core crate.

use thiserror::Error;

/// Top-level error type for HumorBench operations.
///
/// Only configuration and I/O problems surface as errors. Malformed transcript
/// blocks, unknown labels and a missing lexical database are absorbed into
/// placeholders, the `NA` bucket or identity transforms instead.
#[derive(Debug, Error)]
pub enum HumorError {
    #[error("Missing required columns in input TSV: {0:?}")]
    MissingColumns(Vec<String>),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Lexicon error: {0}")]
    Lexicon(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl HumorError {
    pub fn dataset(msg: impl Into<String>) -> Self {
        Self::Dataset(msg.into())
    }

    pub fn lexicon(msg: impl Into<String>) -> Self {
        Self::Lexicon(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
