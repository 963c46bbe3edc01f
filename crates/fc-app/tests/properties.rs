use std::sync::Arc;
use std::time::Duration;

use fc_app::*;
use fc_backend::{Backend, MemoryBackend};
use fc_config::defaults::default_config;
use proptest::prelude::*;

fn idle_policy() -> PollPolicy {
    PollPolicy {
        interval: Duration::from_secs(60),
        max_attempts: None,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn each_accepted_submission_adds_one_record(
        ids in proptest::collection::vec("[a-z]{1,6}", 1..12),
    ) {
        let backend: Arc<dyn Backend> = Arc::new(MemoryBackend::new());
        let mut session = DashboardSession::new(backend, idle_policy());
        for id in ids {
            let before = session.records().len();
            match session.submit(&RunParams::new(id, "owner", 10)) {
                Ok(_) => prop_assert_eq!(session.records().len(), before + 1),
                Err(AppError::DuplicateRun { .. }) => prop_assert_eq!(session.records().len(), before),
                Err(other) => prop_assert!(false, "unexpected error {}", other),
            }
        }
    }

    #[test]
    fn toggling_twice_restores_visibility(
        picks in proptest::collection::vec(0usize..12, 1..20),
    ) {
        let config = default_config();
        let mut state = LayerState::from_config(&config);
        for pick in picks {
            let key = &config.layers[pick % config.layers.len()].key;
            let original = state.is_visible(key).unwrap();
            state.toggle(key).unwrap();
            prop_assert_eq!(state.is_visible(key).unwrap(), !original);
            state.toggle(key).unwrap();
            prop_assert_eq!(state.is_visible(key).unwrap(), original);
        }
    }
}
