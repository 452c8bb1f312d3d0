use thiserror::Error;

use crate::pipeline::PipelineState;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Forecast fetch error: {0}")]
    UpstreamFetch(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("History store error: {0}")]
    Persistence(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Secret error: {0}")]
    Secret(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A run that reached `Failed`, tagged with the state it failed in.
    #[error("Run failed while {stage}: {source}")]
    Stage {
        stage: PipelineState,
        source: Box<AppError>,
    },
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// The state a failed run was in, if this error came out of the orchestrator.
    pub fn stage(&self) -> Option<PipelineState> {
        match self {
            AppError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The underlying failure with any stage wrapper removed.
    pub fn root(&self) -> &AppError {
        match self {
            AppError::Stage { source, .. } => source.root(),
            other => other,
        }
    }
}
