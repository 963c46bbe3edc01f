//! In-process backend: scripted results, recorded calls.

use crate::payload::ResultStatus;
use crate::{Backend, BackendError, BackendResult, RunCommand};
use fc_core::RunKey;
use fc_results::RunRecord;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// How many times each endpoint was hit.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallLog {
    pub fetch_runs: usize,
    pub create_run: usize,
    pub fetch_result: usize,
    pub persist_runs: usize,
    pub upload_property_file: usize,
    pub download_archive: usize,
}

#[derive(Default)]
struct MemoryState {
    runs: Vec<RunRecord>,
    results: HashMap<RunKey, ResultStatus>,
    archives: HashMap<RunKey, Vec<u8>>,
    commands: Vec<RunCommand>,
    uploads: Vec<(String, Vec<u8>)>,
    calls: CallLog,
    offline: bool,
}

#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_runs(runs: Vec<RunRecord>) -> Self {
        let backend = Self::default();
        backend.lock().runs = runs;
        backend
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// What `fetch_result` reports for `key` from now on.
    pub fn set_result(&self, key: RunKey, status: ResultStatus) {
        self.lock().results.insert(key, status);
    }

    pub fn set_archive(&self, key: RunKey, bytes: Vec<u8>) {
        self.lock().archives.insert(key, bytes);
    }

    /// Every call fails with a transport error while offline.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    pub fn calls(&self) -> CallLog {
        self.lock().calls
    }

    pub fn runs(&self) -> Vec<RunRecord> {
        self.lock().runs.clone()
    }

    pub fn commands(&self) -> Vec<RunCommand> {
        self.lock().commands.clone()
    }

    pub fn uploads(&self) -> Vec<(String, Vec<u8>)> {
        self.lock().uploads.clone()
    }

    fn check_online(state: &MemoryState, operation: &'static str) -> BackendResult<()> {
        if state.offline {
            Err(BackendError::Transport {
                operation,
                message: "backend offline".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

impl Backend for MemoryBackend {
    fn fetch_runs(&self) -> BackendResult<Vec<RunRecord>> {
        let mut state = self.lock();
        state.calls.fetch_runs += 1;
        Self::check_online(&state, "fetch runs")?;
        Ok(state.runs.clone())
    }

    fn create_run(&self, command: &RunCommand) -> BackendResult<()> {
        let mut state = self.lock();
        state.calls.create_run += 1;
        Self::check_online(&state, "create run")?;
        state.commands.push(command.clone());
        Ok(())
    }

    fn fetch_result(&self, key: &RunKey) -> BackendResult<ResultStatus> {
        let mut state = self.lock();
        state.calls.fetch_result += 1;
        Self::check_online(&state, "fetch result")?;
        Ok(state
            .results
            .get(key)
            .cloned()
            .unwrap_or(ResultStatus::NotReady))
    }

    fn persist_runs(&self, records: &[RunRecord]) -> BackendResult<()> {
        let mut state = self.lock();
        state.calls.persist_runs += 1;
        Self::check_online(&state, "persist runs")?;
        state.runs = records.to_vec();
        Ok(())
    }

    fn upload_property_file(&self, file_name: &str, contents: &[u8]) -> BackendResult<()> {
        let mut state = self.lock();
        state.calls.upload_property_file += 1;
        Self::check_online(&state, "upload property file")?;
        state.uploads.push((file_name.to_string(), contents.to_vec()));
        Ok(())
    }

    fn download_archive(&self, key: &RunKey) -> BackendResult<Vec<u8>> {
        let mut state = self.lock();
        state.calls.download_archive += 1;
        Self::check_online(&state, "download archive")?;
        state
            .archives
            .get(key)
            .cloned()
            .ok_or(BackendError::Status {
                operation: "download archive",
                code: 404,
            })
    }
}
