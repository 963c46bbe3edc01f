//! Run submission parameters and their validation.

use chrono::NaiveDate;
use fc_backend::RunCommand;
use fc_core::RunKey;
use fc_results::RunRecord;

use crate::{AppError, AppResult};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A property CSV to upload before the run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyFile {
    pub name: String,
    pub contents: Vec<u8>,
}

/// What the submission form collects.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunParams {
    pub project_id: String,
    pub owner: String,
    pub sample_years: u32,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub property_file: Option<PropertyFile>,
}

/// Parameters that passed validation, ready to register and send.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRun {
    pub key: RunKey,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub command: RunCommand,
    pub property_file: Option<PropertyFile>,
}

impl ValidatedRun {
    /// The Pending record appended to the registry on submission.
    pub fn pending_record(&self) -> RunRecord {
        let fmt = |d: Option<NaiveDate>| {
            d.map(|d| d.format(DATE_FORMAT).to_string())
                .unwrap_or_default()
        };
        RunRecord::pending(
            &self.key,
            fmt(self.start_date),
            fmt(self.end_date),
            self.command.num_random_samples,
        )
    }
}

impl RunParams {
    pub fn new(project_id: impl Into<String>, owner: impl Into<String>, sample_years: u32) -> Self {
        Self {
            project_id: project_id.into(),
            owner: owner.into(),
            sample_years,
            ..Self::default()
        }
    }

    pub fn with_dates(mut self, start: Option<&str>, end: Option<&str>) -> Self {
        self.start_date = start.map(str::to_string);
        self.end_date = end.map(str::to_string);
        self
    }

    pub fn with_property_file(mut self, name: impl Into<String>, contents: Vec<u8>) -> Self {
        self.property_file = Some(PropertyFile {
            name: name.into(),
            contents,
        });
        self
    }

    /// Check every field; the first problem found is returned.
    pub fn validate(&self) -> AppResult<ValidatedRun> {
        let project_id = required_token("project id", &self.project_id)?;
        let owner = required_token("user name", &self.owner)?;
        if self.sample_years == 0 {
            return Err(AppError::Validation(
                "sample years must be at least 1".to_string(),
            ));
        }
        let start_date = optional_date("start date", self.start_date.as_deref())?;
        let end_date = optional_date("end date", self.end_date.as_deref())?;
        if let (Some(start), Some(end)) = (start_date, end_date) {
            if end < start {
                return Err(AppError::Validation(format!(
                    "end date {end} is before start date {start}"
                )));
            }
        }
        let property_file = match &self.property_file {
            Some(file) => {
                let name = required_token("property file name", &file.name)?;
                Some(PropertyFile {
                    name,
                    contents: file.contents.clone(),
                })
            }
            None => None,
        };

        let key = RunKey::new(owner, project_id);
        let command = RunCommand::new(
            &key,
            self.sample_years,
            property_file.as_ref().map(|f| f.name.as_str()),
        );
        Ok(ValidatedRun {
            key,
            start_date,
            end_date,
            command,
            property_file,
        })
    }
}

/// Trimmed, non-empty and free of inner whitespace, since the command line
/// is split on spaces.
fn required_token(what: &str, value: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{what} is required")));
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(AppError::Validation(format!(
            "{what} may not contain whitespace: {trimmed:?}"
        )));
    }
    Ok(trimmed.to_string())
}

fn optional_date(what: &str, value: Option<&str>) -> AppResult<Option<NaiveDate>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => NaiveDate::parse_from_str(text, DATE_FORMAT)
            .map(Some)
            .map_err(|_| AppError::Validation(format!("{what} must be YYYY-MM-DD, got {text:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validation_message(params: &RunParams) -> String {
        match params.validate() {
            Err(AppError::Validation(msg)) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn trims_and_builds_command() {
        let run = RunParams::new(" flood-2024 ", "alice ", 10_000).validate().unwrap();
        assert_eq!(run.key, RunKey::new("alice", "flood-2024"));
        assert_eq!(
            run.command.to_command_line(),
            "--project_id flood-2024 --user_name alice --project_description demofile \
             --property_file input_table.csv --num_random_samples 10000"
        );
    }

    #[test]
    fn requires_id_owner_and_samples() {
        assert!(validation_message(&RunParams::new("  ", "alice", 1)).contains("project id"));
        assert!(validation_message(&RunParams::new("p", "", 1)).contains("user name"));
        assert!(validation_message(&RunParams::new("p", "alice", 0)).contains("sample years"));
    }

    #[test]
    fn rejects_inner_whitespace() {
        let msg = validation_message(&RunParams::new("my run", "alice", 5));
        assert!(msg.contains("whitespace"));
    }

    #[test]
    fn dates_are_optional_but_ordered() {
        let ok = RunParams::new("p", "a", 5)
            .with_dates(Some("2024-01-01"), Some("2024-12-31"))
            .validate()
            .unwrap();
        let record = ok.pending_record();
        assert_eq!(record.start_time, "2024-01-01");
        assert_eq!(record.end_time, "2024-12-31");
        assert_eq!(record.sample_years, 5);

        let open = RunParams::new("p", "a", 5)
            .with_dates(Some("2024-01-01"), None)
            .validate()
            .unwrap();
        assert_eq!(open.pending_record().end_time, "");

        let inverted = RunParams::new("p", "a", 5).with_dates(Some("2024-06-01"), Some("2024-01-01"));
        assert!(validation_message(&inverted).contains("before"));

        let garbled = RunParams::new("p", "a", 5).with_dates(Some("01/06/2024"), None);
        assert!(validation_message(&garbled).contains("YYYY-MM-DD"));
    }

    #[test]
    fn property_file_name_goes_into_command() {
        let run = RunParams::new("p", "a", 5)
            .with_property_file("portfolio.csv", b"id,value\n".to_vec())
            .validate()
            .unwrap();
        assert!(run.command.to_command_line().contains("--property_file portfolio.csv"));
        assert_eq!(run.property_file.unwrap().contents, b"id,value\n");
    }
}
