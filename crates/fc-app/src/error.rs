//! Error types for the fc-app service layer.

use fc_core::RunKey;

/// Unified error for the CLI and the desktop UI.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid submission: {0}")]
    Validation(String),

    #[error("Run already submitted: {key}")]
    DuplicateRun { key: RunKey },

    #[error("Run not found: {key}")]
    RunNotFound { key: RunKey },

    #[error("Unknown layer: {0}")]
    UnknownLayer(String),

    #[error("Unknown page preset: {0}")]
    UnknownPreset(String),

    #[error("No run selected")]
    NoSelection,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Results error: {0}")]
    Results(String),

    #[error("Overlay error: {0}")]
    Overlay(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<fc_config::ConfigError> for AppError {
    fn from(err: fc_config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<fc_backend::BackendError> for AppError {
    fn from(err: fc_backend::BackendError) -> Self {
        AppError::Backend(err.to_string())
    }
}

impl From<fc_results::ResultsError> for AppError {
    fn from(err: fc_results::ResultsError) -> Self {
        match err {
            fc_results::ResultsError::DuplicateRun { key } => AppError::DuplicateRun { key },
            other => AppError::Results(other.to_string()),
        }
    }
}

impl From<fc_overlay::OverlayError> for AppError {
    fn from(err: fc_overlay::OverlayError) -> Self {
        AppError::Overlay(err.to_string())
    }
}

impl From<fc_core::CoreError> for AppError {
    fn from(err: fc_core::CoreError) -> Self {
        AppError::Validation(err.to_string())
    }
}
