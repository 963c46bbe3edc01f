//! fc-results: run records, the client-held run registry, and the result archive cache.

pub mod hash;
pub mod registry;
pub mod store;
pub mod types;

pub use hash::archive_digest;
pub use registry::{ApplyOutcome, RegistryAction, RunRegistry};
pub use store::{ArchiveManifest, ResultStore};
pub use types::*;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Run already registered: {key}")]
    DuplicateRun { key: fc_core::RunKey },

    #[error("No cached archive for run: {key}")]
    ArchiveNotFound { key: fc_core::RunKey },

    #[error("Cached archive for {key} belongs to {found}")]
    ManifestMismatch {
        key: fc_core::RunKey,
        found: fc_core::RunKey,
    },

    #[error("Invalid hash: {0}")]
    InvalidHash(String),
}
