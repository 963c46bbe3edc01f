//! One-shot background jobs.
//!
//! A front end that must stay responsive hands a backend request to a
//! [`BackgroundTask`] and checks it once per frame; the result comes back
//! over a channel and is applied on the owner's thread.

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

#[derive(Debug)]
pub enum TaskState<T> {
    Running,
    Done(T),
    /// The job's thread ended without reporting (it panicked).
    Lost,
}

pub struct BackgroundTask<T> {
    label: &'static str,
    rx: Receiver<T>,
    _handle: JoinHandle<()>,
}

impl<T: Send + 'static> BackgroundTask<T> {
    pub fn spawn(label: &'static str, job: impl FnOnce() -> T + Send + 'static) -> Self {
        let (tx, rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            let _ = tx.send(job());
        });
        debug!(task = label, "background task started");
        Self {
            label,
            rx,
            _handle: handle,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Non-blocking check. `Done` is reported once; drop the task after it.
    pub fn poll(&self) -> TaskState<T> {
        match self.rx.try_recv() {
            Ok(value) => TaskState::Done(value),
            Err(TryRecvError::Empty) => TaskState::Running,
            Err(TryRecvError::Disconnected) => {
                warn!(task = self.label, "background task ended without a result");
                TaskState::Lost
            }
        }
    }

    /// Block until the job reports; `None` if it never will.
    pub fn wait(self) -> Option<T> {
        self.rx.recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn result_arrives_once() {
        let (go_tx, go_rx) = mpsc::channel::<()>();
        let task = BackgroundTask::spawn("gate", move || {
            let _ = go_rx.recv();
            7
        });
        assert!(matches!(task.poll(), TaskState::Running));
        go_tx.send(()).unwrap();
        let mut value = None;
        for _ in 0..500 {
            if let TaskState::Done(v) = task.poll() {
                value = Some(v);
                break;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(value, Some(7));
    }

    #[test]
    fn wait_blocks_for_result() {
        let task = BackgroundTask::spawn("sum", || (1..=4).sum::<i32>());
        assert_eq!(task.label(), "sum");
        assert_eq!(task.wait(), Some(10));
    }

    #[test]
    fn panicking_job_is_lost() {
        let task: BackgroundTask<i32> = BackgroundTask::spawn("boom", || panic!("job failed"));
        let mut state = task.poll();
        for _ in 0..500 {
            if !matches!(state, TaskState::Running) {
                break;
            }
            std::thread::sleep(Duration::from_millis(2));
            state = task.poll();
        }
        assert!(matches!(state, TaskState::Lost));
    }
}
