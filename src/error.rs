use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum XeroError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("invalid search method: {0}")]
    InvalidSearchMethod(String),

    #[error("invalid differential expression filter: {0}")]
    InvalidDegFilter(String),

    #[error("invalid regulation direction: {0} (expected Activation, Repression or Unknown)")]
    InvalidDirection(String),

    #[error("species not found: {0}")]
    SpeciesNotFound(String),

    #[error("experiment not found: {0}")]
    ExperimentNotFound(String),

    #[error("gene not found: {0}")]
    GeneNotFound(String),

    #[error("{source_name} is missing required columns: {}", columns.join(", "))]
    MissingColumns {
        source_name: String,
        columns: Vec<String>,
    },

    #[error("failed to read table: {0}")]
    Csv(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl From<csv::Error> for XeroError {
    fn from(err: csv::Error) -> Self {
        XeroError::Csv(err.to_string())
    }
}
