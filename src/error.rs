use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnergyDataError {
    #[error("Argument 'dataset' should be one of 'generation_capacity' or 'time_series', got '{0}'")]
    InvalidDataset(String),

    #[error("Storage unavailable at {path}: {reason}")]
    StorageUnavailable { path: PathBuf, reason: String },

    #[error("Table '{table}' not found in {path}")]
    TableNotFound { table: String, path: PathBuf },

    #[error("Argument 'level' should be one of 'total', 'type' or 'fuel', got '{0}'")]
    InvalidLevel(String),

    #[error("Column '{0}' is missing from the table")]
    MissingColumn(String),

    #[error("Download of {url} failed with HTTP status {status}")]
    NetworkFetchFailure { url: String, status: u16 },

    #[error("In order to save the chart, it must have a title")]
    MissingTitle,

    #[error("Invalid configuration in {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to render chart: {0}")]
    Render(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EnergyDataError>;
