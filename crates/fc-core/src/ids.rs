use core::fmt;

/// Addresses one run on the analysis backend.
///
/// Run ids are chosen by the submitter and are only unique per owner, so the
/// backend (and every client-side lookup) keys runs by the pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunKey {
    pub owner: String,
    pub run_id: String,
}

impl RunKey {
    pub fn new(owner: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            run_id: run_id.into(),
        }
    }

    /// File name the backend uses for a run's result bundle.
    pub fn archive_file_name(&self) -> String {
        format!("{}{}.zip", self.owner, self.run_id)
    }
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.run_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_owner_and_run() {
        let key = RunKey::new("alice", "hk-2024");
        assert_eq!(key.to_string(), "alice/hk-2024");
    }

    #[test]
    fn archive_name_concatenates_without_separator() {
        let key = RunKey::new("user1", "demo");
        assert_eq!(key.archive_file_name(), "user1demo.zip");
    }

    #[test]
    fn same_run_id_different_owner_is_distinct() {
        assert_ne!(RunKey::new("a", "r1"), RunKey::new("b", "r1"));
    }
}
