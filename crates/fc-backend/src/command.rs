//! The create-run command line understood by the backend's model runner.

use fc_core::RunKey;
use std::fmt;

pub const DEFAULT_PROPERTY_FILE: &str = "input_table.csv";
pub const DEFAULT_DESCRIPTION: &str = "demofile";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunCommand {
    pub project_id: String,
    pub owner: String,
    pub description: String,
    pub property_file: String,
    pub num_random_samples: u32,
}

impl RunCommand {
    pub fn new(key: &RunKey, num_random_samples: u32, property_file: Option<&str>) -> Self {
        Self {
            project_id: key.run_id.clone(),
            owner: key.owner.clone(),
            description: DEFAULT_DESCRIPTION.to_string(),
            property_file: property_file.unwrap_or(DEFAULT_PROPERTY_FILE).to_string(),
            num_random_samples,
        }
    }

    pub fn key(&self) -> RunKey {
        RunKey::new(self.owner.clone(), self.project_id.clone())
    }

    /// Arguments are space separated without quoting; callers must keep
    /// whitespace out of every value.
    pub fn to_command_line(&self) -> String {
        format!(
            "--project_id {} --user_name {} --project_description {} --property_file {} --num_random_samples {}",
            self.project_id,
            self.owner,
            self.description,
            self.property_file,
            self.num_random_samples
        )
    }
}

impl fmt::Display for RunCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_command_line())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_matches_runner_flags() {
        let command = RunCommand::new(&RunKey::new("user1", "demo"), 10000, None);
        assert_eq!(
            command.to_command_line(),
            "--project_id demo --user_name user1 --project_description demofile \
             --property_file input_table.csv --num_random_samples 10000"
        );
    }

    #[test]
    fn uploaded_file_name_replaces_default() {
        let command = RunCommand::new(&RunKey::new("u", "r"), 5, Some("hk_portfolio.csv"));
        assert!(command.to_command_line().contains("--property_file hk_portfolio.csv"));
        assert_eq!(command.key(), RunKey::new("u", "r"));
    }
}
