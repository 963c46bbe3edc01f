//! Run record types, serialized with the analysis backend's field names.

use fc_core::RunKey;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RunStatus {
    /// Submitted, no result yet. The backend's list calls this `Loading`.
    #[default]
    #[serde(rename = "Loading", alias = "Pending")]
    Pending,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RunStatus::Pending)
    }

    pub fn label(self) -> &'static str {
        match self {
            RunStatus::Pending => "Loading",
            RunStatus::Completed => "Completed",
            RunStatus::Failed => "Failed",
        }
    }
}

/// The two loss statistics a finished run reports.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RunMetrics {
    pub average_annual_loss: f64,
    pub standard_deviation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: String,
    #[serde(rename = "userName")]
    pub owner: String,
    #[serde(rename = "startTime", default)]
    pub start_time: String,
    #[serde(rename = "endTime", default)]
    pub end_time: String,
    #[serde(rename = "years", default)]
    pub sample_years: u32,
    #[serde(rename = "annualTotalLoss", default)]
    pub average_annual_loss: f64,
    #[serde(rename = "standDerivation", default)]
    pub standard_deviation: f64,
    #[serde(default)]
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl RunRecord {
    /// A freshly submitted run: Pending with zero metrics.
    pub fn pending(
        key: &RunKey,
        start_time: impl Into<String>,
        end_time: impl Into<String>,
        sample_years: u32,
    ) -> Self {
        Self {
            id: key.run_id.clone(),
            owner: key.owner.clone(),
            start_time: start_time.into(),
            end_time: end_time.into(),
            sample_years,
            average_annual_loss: 0.0,
            standard_deviation: 0.0,
            status: RunStatus::Pending,
            failure: None,
        }
    }

    pub fn key(&self) -> RunKey {
        RunKey::new(self.owner.clone(), self.id.clone())
    }

    pub fn matches(&self, key: &RunKey) -> bool {
        self.owner == key.owner && self.id == key.run_id
    }

    pub fn metrics(&self) -> RunMetrics {
        RunMetrics {
            average_annual_loss: self.average_annual_loss,
            standard_deviation: self.standard_deviation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_backend_list_entry() {
        let json = r#"{
            "id": "demo",
            "userName": "user1",
            "startTime": "2024-01-01",
            "endTime": "2024-12-31",
            "years": 10000,
            "annualTotalLoss": 1523.75,
            "standDerivation": 88.5,
            "status": "Completed"
        }"#;
        let record: RunRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.key(), RunKey::new("user1", "demo"));
        assert_eq!(record.sample_years, 10000);
        assert_eq!(record.status, RunStatus::Completed);
        assert_eq!(record.metrics().average_annual_loss, 1523.75);
        assert!(record.failure.is_none());
    }

    #[test]
    fn pending_serializes_as_loading() {
        let record = RunRecord::pending(&RunKey::new("u", "r"), "", "", 1);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["status"], "Loading");
        assert_eq!(value["userName"], "u");
        assert!(value.get("failure").is_none());
    }

    #[test]
    fn pending_alias_accepted() {
        let record: RunRecord =
            serde_json::from_str(r#"{"id":"r","userName":"u","status":"Pending"}"#).unwrap();
        assert_eq!(record.status, RunStatus::Pending);
        assert_eq!(record.average_annual_loss, 0.0);
    }

    #[test]
    fn terminal_statuses() {
        assert!(!RunStatus::Pending.is_terminal());
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
    }
}
