//! Per-run result pollers.
//!
//! Each submitted run gets one background thread that fires the create-run
//! request and then asks the backend for the run's result on a fixed
//! cadence. Pollers never touch the registry: they report a single
//! terminal [`PollEvent`] over a channel and exit.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use fc_backend::{Backend, ResultStatus, RunCommand};
use fc_config::PollDef;
use fc_core::RunKey;
use fc_results::{RegistryAction, RunMetrics};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// `None` polls until cancelled.
    pub max_attempts: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from_config(&PollDef::default())
    }
}

impl PollPolicy {
    pub fn from_config(def: &PollDef) -> Self {
        Self {
            interval: Duration::from_millis(def.interval_ms),
            max_attempts: def.max_attempts,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    Completed { key: RunKey, metrics: RunMetrics },
    Failed { key: RunKey, reason: String },
}

impl PollEvent {
    pub fn key(&self) -> &RunKey {
        match self {
            PollEvent::Completed { key, .. } | PollEvent::Failed { key, .. } => key,
        }
    }

    pub fn into_action(self) -> RegistryAction {
        match self {
            PollEvent::Completed { key, metrics } => RegistryAction::Complete { key, metrics },
            PollEvent::Failed { key, reason } => RegistryAction::Fail { key, reason },
        }
    }
}

/// Owner of one poller thread. Cancelling or dropping it stops the thread
/// at its next wake-up.
pub struct PollHandle {
    key: RunKey,
    cancel_tx: Sender<()>,
    attempts: Arc<AtomicU32>,
    thread: Option<JoinHandle<()>>,
}

impl PollHandle {
    pub fn key(&self) -> &RunKey {
        &self.key
    }

    /// Status fetches issued so far.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(());
    }

    /// Cancel and wait for the thread to exit. Blocks for at most one
    /// in-flight backend call.
    pub fn cancel_and_join(mut self) {
        self.cancel();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!(owner = %self.key.owner, run_id = %self.key.run_id, "poller panicked");
            }
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Start polling `key`. When `create` is given it is sent first; a failed
/// create is logged and polling goes ahead regardless.
pub fn spawn_poll(
    backend: Arc<dyn Backend>,
    key: RunKey,
    create: Option<RunCommand>,
    policy: PollPolicy,
    events: Sender<PollEvent>,
) -> PollHandle {
    let (cancel_tx, cancel_rx) = mpsc::channel::<()>();
    let attempts = Arc::new(AtomicU32::new(0));
    let worker = Poller {
        backend,
        key: key.clone(),
        policy,
        events,
        attempts: Arc::clone(&attempts),
    };
    let thread = thread::spawn(move || {
        if let Some(command) = create {
            worker.create(&command);
        }
        loop {
            match cancel_rx.recv_timeout(worker.policy.interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    debug!(owner = %worker.key.owner, run_id = %worker.key.run_id, "poller cancelled");
                    return;
                }
            }
            if let Some(event) = worker.poll_once() {
                if worker.events.send(event).is_err() {
                    debug!(owner = %worker.key.owner, run_id = %worker.key.run_id, "session gone; poller exiting");
                }
                return;
            }
        }
    });
    PollHandle {
        key,
        cancel_tx,
        attempts,
        thread: Some(thread),
    }
}

struct Poller {
    backend: Arc<dyn Backend>,
    key: RunKey,
    policy: PollPolicy,
    events: Sender<PollEvent>,
    attempts: Arc<AtomicU32>,
}

impl Poller {
    fn create(&self, command: &RunCommand) {
        match self.backend.create_run(command) {
            Ok(()) => info!(owner = %self.key.owner, run_id = %self.key.run_id, "run submitted"),
            Err(e) => warn!(
                owner = %self.key.owner,
                run_id = %self.key.run_id,
                error = %e,
                "create-run request failed"
            ),
        }
    }

    /// One status fetch; `Some` once the run reached a terminal state.
    fn poll_once(&self) -> Option<PollEvent> {
        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
        let key = self.key.clone();
        match self.backend.fetch_result(&self.key) {
            Ok(ResultStatus::Ready(metrics)) => {
                info!(owner = %key.owner, run_id = %key.run_id, attempt, "run completed");
                return Some(PollEvent::Completed { key, metrics });
            }
            Ok(ResultStatus::Failed(reason)) => {
                warn!(owner = %key.owner, run_id = %key.run_id, attempt, reason = %reason, "run failed");
                return Some(PollEvent::Failed { key, reason });
            }
            Ok(ResultStatus::NotReady) => {
                debug!(owner = %key.owner, run_id = %key.run_id, attempt, "result not ready");
            }
            Err(e) => {
                warn!(owner = %key.owner, run_id = %key.run_id, attempt, error = %e, "poll failed");
            }
        }
        match self.policy.max_attempts {
            Some(max) if attempt >= max => Some(PollEvent::Failed {
                key,
                reason: format!("no result after {max} attempts"),
            }),
            _ => None,
        }
    }
}
