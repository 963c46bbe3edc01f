//! The client-held run registry.
//!
//! Every mutation goes through [`RunRegistry::apply`], so the order in which
//! submissions, poll results and list refreshes land is exactly the order the
//! owner applies them.

use crate::types::{RunMetrics, RunRecord, RunStatus};
use crate::{ResultsError, ResultsResult};
use fc_core::RunKey;
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Clone)]
pub enum RegistryAction {
    /// Replace the list with the backend's copy.
    Load(Vec<RunRecord>),
    /// Register a new submission.
    Append(RunRecord),
    Complete { key: RunKey, metrics: RunMetrics },
    Fail { key: RunKey, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Changed,
    /// The action was valid but the registry already reflected it.
    Unchanged,
    UnknownRun,
}

#[derive(Debug, Clone, Default)]
pub struct RunRegistry {
    records: Vec<RunRecord>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<RunRecord>) -> Self {
        Self { records }
    }

    pub fn apply(&mut self, action: RegistryAction) -> ResultsResult<ApplyOutcome> {
        match action {
            RegistryAction::Load(records) => Ok(self.load(records)),
            RegistryAction::Append(record) => {
                let key = record.key();
                if self.contains(&key) {
                    return Err(ResultsError::DuplicateRun { key });
                }
                debug!(owner = %key.owner, run_id = %key.run_id, "registry append");
                self.records.push(record);
                Ok(ApplyOutcome::Changed)
            }
            RegistryAction::Complete { key, metrics } => {
                Ok(self.finish(&key, |record| {
                    record.average_annual_loss = metrics.average_annual_loss;
                    record.standard_deviation = metrics.standard_deviation;
                    record.status = RunStatus::Completed;
                }))
            }
            RegistryAction::Fail { key, reason } => Ok(self.finish(&key, |record| {
                record.status = RunStatus::Failed;
                record.failure = Some(reason);
            })),
        }
    }

    /// Local Pending submissions the backend has not listed yet survive a reload,
    /// appended after the backend's records in their original order. A run that
    /// already finished locally keeps its terminal record when the backend's copy
    /// is still Pending.
    fn load(&mut self, mut records: Vec<RunRecord>) -> ApplyOutcome {
        let incoming: HashSet<RunKey> = records.iter().map(RunRecord::key).collect();
        let mut kept = 0;
        for record in records.iter_mut().filter(|r| r.status == RunStatus::Pending) {
            let key = record.key();
            if let Some(local) = self.get(&key).filter(|l| l.status.is_terminal()) {
                *record = local.clone();
                kept += 1;
            }
        }
        let carried: Vec<RunRecord> = self
            .records
            .drain(..)
            .filter(|r| r.status == RunStatus::Pending && !incoming.contains(&r.key()))
            .collect();
        debug!(
            loaded = records.len(),
            carried = carried.len(),
            kept_terminal = kept,
            "registry load"
        );
        self.records = records;
        self.records.extend(carried);
        ApplyOutcome::Changed
    }

    /// Apply the single terminal transition to the most recent record with `key`.
    fn finish(&mut self, key: &RunKey, update: impl FnOnce(&mut RunRecord)) -> ApplyOutcome {
        let Some(record) = self.records.iter_mut().rev().find(|r| r.matches(key)) else {
            return ApplyOutcome::UnknownRun;
        };
        if record.status.is_terminal() {
            return ApplyOutcome::Unchanged;
        }
        update(&mut *record);
        debug!(owner = %key.owner, run_id = %key.run_id, status = record.status.label(), "registry transition");
        ApplyOutcome::Changed
    }

    pub fn get(&self, key: &RunKey) -> Option<&RunRecord> {
        self.records.iter().rev().find(|r| r.matches(key))
    }

    pub fn contains(&self, key: &RunKey) -> bool {
        self.records.iter().any(|r| r.matches(key))
    }

    pub fn records(&self) -> &[RunRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &RunRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn pending_keys(&self) -> Vec<RunKey> {
        self.records
            .iter()
            .filter(|r| r.status == RunStatus::Pending)
            .map(RunRecord::key)
            .collect()
    }

    pub fn count_by_status(&self, status: RunStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(owner: &str, id: &str) -> RunRecord {
        RunRecord::pending(&RunKey::new(owner, id), "2024-01-01", "2024-12-31", 100)
    }

    fn metrics(aal: f64) -> RunMetrics {
        RunMetrics {
            average_annual_loss: aal,
            standard_deviation: aal / 10.0,
        }
    }

    #[test]
    fn append_rejects_duplicate_key() {
        let mut registry = RunRegistry::new();
        registry
            .apply(RegistryAction::Append(pending("u", "r1")))
            .unwrap();
        let err = registry
            .apply(RegistryAction::Append(pending("u", "r1")))
            .unwrap_err();
        assert!(matches!(err, ResultsError::DuplicateRun { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn same_id_for_other_owner_is_allowed() {
        let mut registry = RunRegistry::new();
        registry
            .apply(RegistryAction::Append(pending("a", "r1")))
            .unwrap();
        registry
            .apply(RegistryAction::Append(pending("b", "r1")))
            .unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn complete_is_applied_once() {
        let key = RunKey::new("u", "r1");
        let mut registry = RunRegistry::from_records(vec![pending("u", "r1")]);

        let first = registry
            .apply(RegistryAction::Complete {
                key: key.clone(),
                metrics: metrics(500.0),
            })
            .unwrap();
        let second = registry
            .apply(RegistryAction::Complete {
                key: key.clone(),
                metrics: metrics(900.0),
            })
            .unwrap();

        assert_eq!(first, ApplyOutcome::Changed);
        assert_eq!(second, ApplyOutcome::Unchanged);
        let record = registry.get(&key).unwrap();
        assert_eq!(record.status, RunStatus::Completed);
        assert_eq!(record.average_annual_loss, 500.0);
        assert_eq!(record.standard_deviation, 50.0);
    }

    #[test]
    fn fail_after_complete_is_ignored() {
        let key = RunKey::new("u", "r1");
        let mut registry = RunRegistry::from_records(vec![pending("u", "r1")]);
        registry
            .apply(RegistryAction::Complete {
                key: key.clone(),
                metrics: metrics(1.0),
            })
            .unwrap();
        let outcome = registry
            .apply(RegistryAction::Fail {
                key: key.clone(),
                reason: "late".to_string(),
            })
            .unwrap();
        assert_eq!(outcome, ApplyOutcome::Unchanged);
        assert_eq!(registry.get(&key).unwrap().status, RunStatus::Completed);
    }

    #[test]
    fn fail_records_reason() {
        let key = RunKey::new("u", "r1");
        let mut registry = RunRegistry::from_records(vec![pending("u", "r1")]);
        registry
            .apply(RegistryAction::Fail {
                key: key.clone(),
                reason: "model crashed".to_string(),
            })
            .unwrap();
        let record = registry.get(&key).unwrap();
        assert_eq!(record.status, RunStatus::Failed);
        assert_eq!(record.failure.as_deref(), Some("model crashed"));
    }

    #[test]
    fn complete_unknown_run() {
        let mut registry = RunRegistry::new();
        let outcome = registry
            .apply(RegistryAction::Complete {
                key: RunKey::new("u", "missing"),
                metrics: metrics(1.0),
            })
            .unwrap();
        assert_eq!(outcome, ApplyOutcome::UnknownRun);
    }

    #[test]
    fn complete_targets_matching_record_not_last() {
        let mut registry =
            RunRegistry::from_records(vec![pending("u", "r1"), pending("u", "r2")]);
        registry
            .apply(RegistryAction::Complete {
                key: RunKey::new("u", "r1"),
                metrics: metrics(7.0),
            })
            .unwrap();
        assert_eq!(registry.records()[0].status, RunStatus::Completed);
        assert_eq!(registry.records()[1].status, RunStatus::Pending);
    }

    #[test]
    fn load_keeps_unlisted_local_pending() {
        let mut registry = RunRegistry::new();
        registry
            .apply(RegistryAction::Append(pending("u", "local")))
            .unwrap();

        let mut listed = pending("u", "old");
        listed.status = RunStatus::Completed;
        registry.apply(RegistryAction::Load(vec![listed])).unwrap();

        let ids: Vec<&str> = registry.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["old", "local"]);
    }

    #[test]
    fn load_prefers_backend_copy_of_known_run() {
        let mut registry = RunRegistry::new();
        registry
            .apply(RegistryAction::Append(pending("u", "r1")))
            .unwrap();

        let mut listed = pending("u", "r1");
        listed.status = RunStatus::Completed;
        listed.average_annual_loss = 42.0;
        registry.apply(RegistryAction::Load(vec![listed])).unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.records()[0].average_annual_loss, 42.0);
    }

    #[test]
    fn stale_pending_copy_does_not_reopen_finished_run() {
        let key = RunKey::new("u", "r1");
        let mut registry = RunRegistry::from_records(vec![pending("u", "r1")]);
        let first = registry
            .apply(RegistryAction::Complete {
                key: key.clone(),
                metrics: metrics(500.0),
            })
            .unwrap();
        assert_eq!(first, ApplyOutcome::Changed);

        registry
            .apply(RegistryAction::Load(vec![pending("u", "r1")]))
            .unwrap();
        let record = registry.get(&key).unwrap();
        assert_eq!(record.status, RunStatus::Completed);
        assert_eq!(record.average_annual_loss, 500.0);
        assert!(registry.pending_keys().is_empty());

        let again = registry
            .apply(RegistryAction::Complete {
                key: key.clone(),
                metrics: metrics(900.0),
            })
            .unwrap();
        assert_eq!(again, ApplyOutcome::Unchanged);
    }

    #[test]
    fn pending_keys_and_counts() {
        let mut done = pending("u", "done");
        done.status = RunStatus::Completed;
        let registry = RunRegistry::from_records(vec![pending("u", "a"), done, pending("v", "b")]);
        assert_eq!(
            registry.pending_keys(),
            vec![RunKey::new("u", "a"), RunKey::new("v", "b")]
        );
        assert_eq!(registry.count_by_status(RunStatus::Completed), 1);
        assert_eq!(registry.count_by_status(RunStatus::Failed), 0);
    }
}
