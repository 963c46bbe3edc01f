use fc_core::RunKey;
use fc_results::*;
use proptest::prelude::*;

proptest! {
    #[test]
    fn each_submission_grows_registry_by_one(
        ids in proptest::collection::hash_set("[a-z0-9]{1,8}", 0..20),
    ) {
        let mut registry = RunRegistry::new();
        for (i, id) in ids.iter().enumerate() {
            let before = registry.len();
            let record = RunRecord::pending(&RunKey::new("owner", id.clone()), "", "", 1);
            registry.apply(RegistryAction::Append(record)).unwrap();
            prop_assert_eq!(registry.len(), before + 1);
            prop_assert_eq!(registry.len(), i + 1);
        }
    }

    #[test]
    fn terminal_transition_happens_at_most_once(
        completions in proptest::collection::vec(any::<bool>(), 1..10),
    ) {
        let key = RunKey::new("owner", "run");
        let mut registry = RunRegistry::from_records(vec![RunRecord::pending(&key, "", "", 1)]);
        let mut changed = 0;
        for complete in completions {
            let action = if complete {
                RegistryAction::Complete { key: key.clone(), metrics: RunMetrics::default() }
            } else {
                RegistryAction::Fail { key: key.clone(), reason: "x".to_string() }
            };
            if registry.apply(action).unwrap() == ApplyOutcome::Changed {
                changed += 1;
            }
        }
        prop_assert_eq!(changed, 1);
        prop_assert!(registry.get(&key).unwrap().status.is_terminal());
    }
}
