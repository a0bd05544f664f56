//! Ошибки конвейера оценки

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Статистику артефакта не удалось вывести из обучающего корпуса.
    /// Означает нарушенный порядок шагов построения признаков.
    #[error("Cannot derive statistic `{0}` from training corpus")]
    MissingStatistic(String),

    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("Artifact store error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Empty batch")]
    EmptyBatch,

    #[error("Model error: {0}")]
    Model(String),
}
