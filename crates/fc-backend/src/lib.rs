//! Client side of the catastrophe-model analysis backend.
//!
//! [`Backend`] is the seam between the dashboard and the REST service:
//! [`HttpBackend`] talks to the real endpoints, [`MemoryBackend`] keeps
//! everything in process for tests and offline demos.

pub mod command;
pub mod http;
pub mod memory;
pub mod payload;

pub use command::RunCommand;
pub use http::HttpBackend;
pub use memory::{CallLog, MemoryBackend};
pub use payload::{ResultStatus, parse_result_body};

use fc_core::RunKey;
use fc_results::RunRecord;

pub type BackendResult<T> = Result<T, BackendError>;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("could not reach backend ({operation}): {message}")]
    Transport {
        operation: &'static str,
        message: String,
    },

    #[error("backend returned HTTP {code} ({operation})")]
    Status { operation: &'static str, code: u16 },

    #[error("could not decode backend response ({operation}): {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Operations the dashboard needs from the analysis backend.
///
/// Implementations are shared between the owning session and its poller
/// threads, hence `Send + Sync`.
pub trait Backend: Send + Sync {
    /// The persisted run list.
    fn fetch_runs(&self) -> BackendResult<Vec<RunRecord>>;

    /// Start a run. The payload is an opaque command line for the model runner.
    fn create_run(&self, command: &RunCommand) -> BackendResult<()>;

    /// Whether the run's result exists yet.
    fn fetch_result(&self, key: &RunKey) -> BackendResult<ResultStatus>;

    /// Replace the persisted run list.
    fn persist_runs(&self, records: &[RunRecord]) -> BackendResult<()>;

    fn upload_property_file(&self, file_name: &str, contents: &[u8]) -> BackendResult<()>;

    /// The zipped shapefile bundle for a finished run.
    fn download_archive(&self, key: &RunKey) -> BackendResult<Vec<u8>>;
}
