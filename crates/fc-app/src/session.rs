//! The dashboard session: single owner of the run registry.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use fc_backend::{Backend, BackendResult, HttpBackend};
use fc_config::DashboardConfig;
use fc_core::RunKey;
use fc_overlay::Overlay;
use fc_results::{ApplyOutcome, RegistryAction, ResultStore, RunRecord, RunRegistry, RunStatus};
use tracing::{debug, info, warn};

use crate::poll::{PollEvent, PollHandle, PollPolicy, spawn_poll};
use crate::submit::{RunParams, ValidatedRun};
use crate::task::{BackgroundTask, TaskState};
use crate::{AppError, AppResult};

/// What selecting a run did to the overlay.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectOutcome {
    /// The run's overlay replaced the previous one.
    OverlayLoaded { features: usize },
    /// The run has no result yet (or failed); the overlay was cleared.
    NotCompleted(RunStatus),
    /// The archive could not be fetched or decoded; the previous overlay stays.
    LoadFailed(String),
    /// The archive decoded to zero features; the overlay was cleared.
    Empty,
}

/// First half of a selection.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectStart {
    /// Nothing to fetch; the selection is settled.
    Finished(SelectOutcome),
    /// The run completed; run [`DashboardSession::overlay_job`] and hand its
    /// result to [`DashboardSession::finish_select`].
    FetchArchive,
}

/// How run-list writes reach the backend after a registry change.
enum PersistMode {
    /// On the calling thread, before `apply_event` returns.
    Inline,
    /// One write at a time on a background thread; changes made while a
    /// write is in flight are sent as a single follow-up snapshot.
    Background {
        in_flight: Option<BackgroundTask<BackendResult<()>>>,
        dirty: bool,
    },
}

pub struct DashboardSession {
    backend: Arc<dyn Backend>,
    policy: PollPolicy,
    registry: RunRegistry,
    pollers: HashMap<RunKey, PollHandle>,
    events_tx: Sender<PollEvent>,
    events_rx: Receiver<PollEvent>,
    store: Option<ResultStore>,
    selection: Option<RunKey>,
    overlay: Option<Overlay>,
    persist: PersistMode,
}

impl DashboardSession {
    pub fn new(backend: Arc<dyn Backend>, policy: PollPolicy) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            backend,
            policy,
            registry: RunRegistry::new(),
            pollers: HashMap::new(),
            events_tx,
            events_rx,
            store: None,
            selection: None,
            overlay: None,
            persist: PersistMode::Inline,
        }
    }

    /// HTTP backend, poll policy and archive cache as configured.
    pub fn from_config(config: &DashboardConfig) -> AppResult<Self> {
        let backend = HttpBackend::new(
            &config.backend.base_url,
            Duration::from_secs(config.backend.timeout_s),
        );
        let mut session = Self::new(Arc::new(backend), PollPolicy::from_config(&config.poll));
        if let Some(dir) = &config.cache_dir {
            session = session.with_store(ResultStore::new(dir.clone())?);
        }
        Ok(session)
    }

    pub fn with_store(mut self, store: ResultStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Write the run list from a background thread instead of inside
    /// [`apply_event`](Self::apply_event). Writes are driven by [`pump`](Self::pump).
    pub fn with_background_persist(mut self) -> Self {
        self.persist = PersistMode::Background {
            in_flight: None,
            dirty: false,
        };
        self
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    pub fn registry(&self) -> &RunRegistry {
        &self.registry
    }

    pub fn records(&self) -> &[RunRecord] {
        self.registry.records()
    }

    pub fn selection(&self) -> Option<&RunKey> {
        self.selection.as_ref()
    }

    pub fn selected_record(&self) -> Option<&RunRecord> {
        self.selection.as_ref().and_then(|k| self.registry.get(k))
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlay.as_ref()
    }

    pub fn is_polling(&self, key: &RunKey) -> bool {
        self.pollers.contains_key(key)
    }

    pub fn active_pollers(&self) -> usize {
        self.pollers.len()
    }

    /// A background run-list write is in flight or queued.
    pub fn persist_pending(&self) -> bool {
        match &self.persist {
            PersistMode::Inline => false,
            PersistMode::Background { in_flight, dirty } => in_flight.is_some() || *dirty,
        }
    }

    /// Replace the registry with the backend's run list. Local submissions
    /// the backend has not listed yet are kept.
    pub fn refresh(&mut self) -> AppResult<usize> {
        let records = self.runs_job()()?;
        self.apply_run_list(records)
    }

    /// The run-list fetch, detached from the session.
    pub fn runs_job(
        &self,
    ) -> impl FnOnce() -> AppResult<Vec<RunRecord>> + Send + 'static + use<> {
        let backend = Arc::clone(&self.backend);
        move || -> AppResult<Vec<RunRecord>> {
            let records = backend.fetch_runs()?;
            info!(runs = records.len(), "fetched run list");
            Ok(records)
        }
    }

    pub fn apply_run_list(&mut self, records: Vec<RunRecord>) -> AppResult<usize> {
        self.registry.apply(RegistryAction::Load(records))?;
        Ok(self.registry.len())
    }

    /// Validate, upload the property file if any, register the run as
    /// Pending and start its poller. Returns before the backend acknowledges
    /// the run.
    pub fn submit(&mut self, params: &RunParams) -> AppResult<RunKey> {
        let run = self.prepare_submit(params)?;
        let (run, uploaded) = self.upload_job(run)();
        uploaded?;
        self.register(run)
    }

    /// Validation and the duplicate check, without touching the backend.
    pub fn prepare_submit(&self, params: &RunParams) -> AppResult<ValidatedRun> {
        let run = params.validate()?;
        if self.registry.contains(&run.key) {
            return Err(AppError::DuplicateRun { key: run.key });
        }
        Ok(run)
    }

    /// The property-file upload, detached from the session. Runs without a
    /// property file pass straight through.
    pub fn upload_job(
        &self,
        run: ValidatedRun,
    ) -> impl FnOnce() -> (ValidatedRun, AppResult<()>) + Send + 'static + use<> {
        let backend = Arc::clone(&self.backend);
        move || {
            let uploaded = match &run.property_file {
                Some(file) => backend
                    .upload_property_file(&file.name, &file.contents)
                    .map(|()| {
                        info!(file = %file.name, bytes = file.contents.len(), "uploaded property file");
                    })
                    .map_err(AppError::from),
                None => Ok(()),
            };
            (run, uploaded)
        }
    }

    /// Append the run as Pending and start its poller, which sends the
    /// create request.
    pub fn register(&mut self, run: ValidatedRun) -> AppResult<RunKey> {
        self.registry
            .apply(RegistryAction::Append(run.pending_record()))?;
        let handle = spawn_poll(
            Arc::clone(&self.backend),
            run.key.clone(),
            Some(run.command.clone()),
            self.policy,
            self.events_tx.clone(),
        );
        self.pollers.insert(run.key.clone(), handle);
        info!(owner = %run.key.owner, run_id = %run.key.run_id, "run registered");
        Ok(run.key)
    }

    /// Start pollers for Pending runs that have none, e.g. after a
    /// [`refresh`](Self::refresh) in a new session. No create request is sent.
    pub fn resume_pending(&mut self) -> usize {
        let mut started = 0;
        for key in self.registry.pending_keys() {
            if self.pollers.contains_key(&key) {
                continue;
            }
            let handle = spawn_poll(
                Arc::clone(&self.backend),
                key.clone(),
                None,
                self.policy,
                self.events_tx.clone(),
            );
            self.pollers.insert(key, handle);
            started += 1;
        }
        if started > 0 {
            debug!(started, "resumed pollers");
        }
        started
    }

    /// Apply every poll event that has arrived, in arrival order.
    pub fn pump(&mut self) -> Vec<(PollEvent, ApplyOutcome)> {
        let mut applied = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            let outcome = self.apply_event(event.clone());
            applied.push((event, outcome));
        }
        self.drive_persist();
        applied
    }

    /// Block up to `timeout` for the next poll event and apply it.
    pub fn wait_next(&mut self, timeout: Duration) -> Option<(PollEvent, ApplyOutcome)> {
        match self.events_rx.recv_timeout(timeout) {
            Ok(event) => {
                let outcome = self.apply_event(event.clone());
                Some((event, outcome))
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Route one terminal poll result through the registry reducer. The run
    /// list is persisted only when the registry actually changed.
    pub fn apply_event(&mut self, event: PollEvent) -> ApplyOutcome {
        self.pollers.remove(event.key());
        let key = event.key().clone();
        let outcome = match self.registry.apply(event.into_action()) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(owner = %key.owner, run_id = %key.run_id, error = %e, "poll event rejected");
                return ApplyOutcome::Unchanged;
            }
        };
        match outcome {
            ApplyOutcome::Changed => self.persist_runs(),
            ApplyOutcome::Unchanged => {
                debug!(owner = %key.owner, run_id = %key.run_id, "run already terminal");
            }
            ApplyOutcome::UnknownRun => {
                warn!(owner = %key.owner, run_id = %key.run_id, "poll event for unknown run");
            }
        }
        outcome
    }

    fn persist_runs(&mut self) {
        match &mut self.persist {
            PersistMode::Inline => {
                if let Err(e) = self.backend.persist_runs(self.registry.records()) {
                    warn!(error = %e, "could not persist run list");
                }
            }
            PersistMode::Background { in_flight, dirty } => {
                if in_flight.is_some() {
                    *dirty = true;
                } else {
                    *in_flight = Some(spawn_persist(&self.backend, self.registry.records()));
                }
            }
        }
    }

    /// Collect a finished background write and send the queued snapshot, if any.
    fn drive_persist(&mut self) {
        let PersistMode::Background { in_flight, dirty } = &mut self.persist else {
            return;
        };
        if let Some(task) = in_flight {
            match task.poll() {
                TaskState::Running => return,
                TaskState::Done(Ok(())) => debug!("run list persisted"),
                TaskState::Done(Err(e)) => warn!(error = %e, "could not persist run list"),
                TaskState::Lost => {}
            }
            *in_flight = None;
        }
        if *dirty {
            *dirty = false;
            *in_flight = Some(spawn_persist(&self.backend, self.registry.records()));
        }
    }

    /// Make `key` the selection and load its overlay if it has completed.
    pub fn select(&mut self, key: &RunKey) -> AppResult<SelectOutcome> {
        match self.begin_select(key)? {
            SelectStart::Finished(outcome) => Ok(outcome),
            SelectStart::FetchArchive => {
                let loaded = self.overlay_job(key)();
                Ok(self.apply_overlay(key, loaded))
            }
        }
    }

    /// Make `key` the selection. Runs without a result clear the overlay
    /// here; completed runs leave the current overlay until
    /// [`finish_select`](Self::finish_select).
    pub fn begin_select(&mut self, key: &RunKey) -> AppResult<SelectStart> {
        let status = self
            .registry
            .get(key)
            .map(|r| r.status)
            .ok_or_else(|| AppError::RunNotFound { key: key.clone() })?;
        self.selection = Some(key.clone());
        if status != RunStatus::Completed {
            self.overlay = None;
            return Ok(SelectStart::Finished(SelectOutcome::NotCompleted(status)));
        }
        Ok(SelectStart::FetchArchive)
    }

    /// Archive fetch (cache first) and decode, detached from the session.
    pub fn overlay_job(
        &self,
        key: &RunKey,
    ) -> impl FnOnce() -> AppResult<Overlay> + Send + 'static + use<> {
        let backend = Arc::clone(&self.backend);
        let store = self.store.clone();
        let key = key.clone();
        move || -> AppResult<Overlay> {
            let bytes = fetch_archive_with(backend.as_ref(), store.as_ref(), &key)?;
            Ok(Overlay::from_archive(&bytes)?)
        }
    }

    /// Apply a loaded overlay. Returns `None` and changes nothing when the
    /// selection has moved on to another run since `begin_select`.
    pub fn finish_select(
        &mut self,
        key: &RunKey,
        loaded: AppResult<Overlay>,
    ) -> Option<SelectOutcome> {
        if self.selection.as_ref() != Some(key) {
            debug!(owner = %key.owner, run_id = %key.run_id, "dropping overlay for stale selection");
            return None;
        }
        Some(self.apply_overlay(key, loaded))
    }

    fn apply_overlay(&mut self, key: &RunKey, loaded: AppResult<Overlay>) -> SelectOutcome {
        let overlay = match loaded {
            Ok(overlay) => overlay,
            Err(e) => {
                warn!(owner = %key.owner, run_id = %key.run_id, error = %e, "overlay load failed");
                return SelectOutcome::LoadFailed(e.to_string());
            }
        };
        if overlay.is_empty() {
            info!(owner = %key.owner, run_id = %key.run_id, "result archive has no features");
            self.overlay = None;
            return SelectOutcome::Empty;
        }
        let features = overlay.len();
        self.overlay = Some(overlay);
        SelectOutcome::OverlayLoaded { features }
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
        self.overlay = None;
    }

    /// The run's archive: from the local cache when present and intact,
    /// otherwise downloaded (and cached).
    pub fn fetch_archive(&self, key: &RunKey) -> AppResult<Vec<u8>> {
        fetch_archive_with(self.backend.as_ref(), self.store.as_ref(), key)
    }

    /// Save the selected run's archive as `dir/<owner><id>.zip`.
    pub fn download_selected(&self, dir: &Path) -> AppResult<PathBuf> {
        let key = self.selection.as_ref().ok_or(AppError::NoSelection)?;
        self.download_run(key, dir)
    }

    /// Save a completed run's archive as `dir/<owner><id>.zip` without
    /// decoding it.
    pub fn download_run(&self, key: &RunKey, dir: &Path) -> AppResult<PathBuf> {
        self.download_job(key, dir)?()
    }

    /// Checks the run can be downloaded, then returns the fetch-and-write
    /// step detached from the session.
    pub fn download_job(
        &self,
        key: &RunKey,
        dir: &Path,
    ) -> AppResult<impl FnOnce() -> AppResult<PathBuf> + Send + 'static + use<>> {
        let status = self
            .registry
            .get(key)
            .map(|r| r.status)
            .ok_or_else(|| AppError::RunNotFound { key: key.clone() })?;
        match status {
            RunStatus::Completed => {}
            RunStatus::Failed => {
                return Err(AppError::Validation(format!(
                    "run {key} failed; nothing to download"
                )));
            }
            RunStatus::Pending => {
                return Err(AppError::Validation(format!(
                    "run {key} is {}; nothing to download yet",
                    status.label()
                )));
            }
        }
        let file_name = key.archive_file_name();
        if Path::new(&file_name).file_name().and_then(|n| n.to_str()) != Some(file_name.as_str()) {
            return Err(AppError::Validation(format!(
                "run {key} cannot be saved as a file name"
            )));
        }
        let backend = Arc::clone(&self.backend);
        let store = self.store.clone();
        let key = key.clone();
        let path = dir.join(file_name);
        let dir = dir.to_path_buf();
        Ok(move || -> AppResult<PathBuf> {
            let bytes = fetch_archive_with(backend.as_ref(), store.as_ref(), &key)?;
            fs::create_dir_all(&dir)?;
            fs::write(&path, &bytes)?;
            info!(path = %path.display(), bytes = bytes.len(), "saved result archive");
            Ok(path)
        })
    }

    pub fn cancel_all(&mut self) {
        for (_, handle) in self.pollers.drain() {
            handle.cancel();
        }
    }

    /// Cancel every poller and wait for the threads to exit. A freshly
    /// submitted run's create request is always sent before its poller stops.
    pub fn shutdown(mut self) {
        for (_, handle) in self.pollers.drain() {
            handle.cancel_and_join();
        }
    }
}

impl Drop for DashboardSession {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

fn spawn_persist(
    backend: &Arc<dyn Backend>,
    records: &[RunRecord],
) -> BackgroundTask<BackendResult<()>> {
    let backend = Arc::clone(backend);
    let records = records.to_vec();
    BackgroundTask::spawn("persist runs", move || backend.persist_runs(&records))
}

fn fetch_archive_with(
    backend: &dyn Backend,
    store: Option<&ResultStore>,
    key: &RunKey,
) -> AppResult<Vec<u8>> {
    if let Some(store) = store {
        if store.has_archive(key) {
            match store.load_archive(key) {
                Ok(bytes) => {
                    debug!(owner = %key.owner, run_id = %key.run_id, "archive from cache");
                    return Ok(bytes);
                }
                Err(e) => {
                    warn!(owner = %key.owner, run_id = %key.run_id, error = %e, "ignoring cached archive");
                }
            }
        }
    }
    let bytes = backend.download_archive(key)?;
    if let Some(store) = store {
        if let Err(e) = store.save_archive(key, &bytes) {
            warn!(owner = %key.owner, run_id = %key.run_id, error = %e, "could not cache archive");
        }
    }
    Ok(bytes)
}
