use fc_backend::*;
use fc_core::RunKey;
use fc_results::{RunMetrics, RunRecord};

#[test]
fn unknown_result_is_not_ready() {
    let backend = MemoryBackend::new();
    let status = backend.fetch_result(&RunKey::new("u", "r")).unwrap();
    assert_eq!(status, ResultStatus::NotReady);
    assert_eq!(backend.calls().fetch_result, 1);
}

#[test]
fn scripted_result_is_returned() {
    let backend = MemoryBackend::new();
    let key = RunKey::new("u", "r");
    let metrics = RunMetrics {
        average_annual_loss: 10.0,
        standard_deviation: 1.0,
    };
    backend.set_result(key.clone(), ResultStatus::Ready(metrics));
    assert_eq!(
        backend.fetch_result(&key).unwrap(),
        ResultStatus::Ready(metrics)
    );
}

#[test]
fn persist_replaces_listed_runs() {
    let backend = MemoryBackend::with_runs(vec![RunRecord::pending(
        &RunKey::new("u", "old"),
        "",
        "",
        1,
    )]);
    let new_list = vec![RunRecord::pending(&RunKey::new("u", "new"), "", "", 2)];
    backend.persist_runs(&new_list).unwrap();

    let runs = backend.fetch_runs().unwrap();
    assert_eq!(runs, new_list);
    assert_eq!(backend.calls().persist_runs, 1);
    assert_eq!(backend.calls().fetch_runs, 1);
}

#[test]
fn missing_archive_is_404() {
    let backend = MemoryBackend::new();
    let err = backend.download_archive(&RunKey::new("u", "r")).unwrap_err();
    assert!(matches!(err, BackendError::Status { code: 404, .. }));
}

#[test]
fn offline_backend_fails_every_call_but_counts_it() {
    let backend = MemoryBackend::new();
    backend.set_offline(true);
    let command = RunCommand::new(&RunKey::new("u", "r"), 1, None);
    assert!(matches!(
        backend.create_run(&command),
        Err(BackendError::Transport { .. })
    ));
    assert!(backend.commands().is_empty());
    assert_eq!(backend.calls().create_run, 1);

    backend.set_offline(false);
    backend.create_run(&command).unwrap();
    assert_eq!(backend.commands(), vec![command]);
}
