//! Blocking HTTP client for the analysis backend.

use crate::payload::{ResultStatus, parse_result_body};
use crate::{Backend, BackendError, BackendResult, RunCommand};
use fc_core::RunKey;
use fc_results::RunRecord;
use std::time::Duration;
use tracing::debug;

/// Result bundles carry full shapefiles; allow more than ureq's default body cap.
const MAX_ARCHIVE_BYTES: u64 = 256 * 1024 * 1024;

const MULTIPART_BOUNDARY: &str = "floodcat-boundary-7d1e4b2a";

pub struct HttpBackend {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: config.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Backend for HttpBackend {
    fn fetch_runs(&self) -> BackendResult<Vec<RunRecord>> {
        let operation = "fetch runs";
        let response = self
            .agent
            .get(&self.url("/api/projectData"))
            .call()
            .map_err(|e| classify(e, operation))?;
        response
            .into_body()
            .read_json::<Vec<RunRecord>>()
            .map_err(|e| decode(e, operation))
    }

    fn create_run(&self, command: &RunCommand) -> BackendResult<()> {
        let operation = "create run";
        let body = serde_json::json!({ "data": command.to_command_line() });
        debug!(command = %command, "POST /api/submit");
        self.agent
            .post(&self.url("/api/submit"))
            .send_json(&body)
            .map_err(|e| classify(e, operation))?;
        Ok(())
    }

    fn fetch_result(&self, key: &RunKey) -> BackendResult<ResultStatus> {
        let operation = "fetch result";
        let response = self
            .agent
            .get(&self.url("/api/getresultdata"))
            .query("userName", &key.owner)
            .query("projectName", &key.run_id)
            .call()
            .map_err(|e| classify(e, operation))?;
        let body = response
            .into_body()
            .read_to_string()
            .map_err(|e| decode(e, operation))?;
        parse_result_body(&body)
    }

    fn persist_runs(&self, records: &[RunRecord]) -> BackendResult<()> {
        let operation = "persist runs";
        self.agent
            .post(&self.url("/api/projectData"))
            .send_json(records)
            .map_err(|e| classify(e, operation))?;
        Ok(())
    }

    fn upload_property_file(&self, file_name: &str, contents: &[u8]) -> BackendResult<()> {
        let operation = "upload property file";
        let body = multipart_file_body(file_name, contents);
        let content_type = format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}");
        self.agent
            .post(&self.url("/api/upload"))
            .header("Content-Type", &content_type)
            .send(&body[..])
            .map_err(|e| classify(e, operation))?;
        Ok(())
    }

    fn download_archive(&self, key: &RunKey) -> BackendResult<Vec<u8>> {
        let operation = "download archive";
        let response = self
            .agent
            .get(&self.url("/api/download"))
            .query("userName", &key.owner)
            .query("projectName", &key.run_id)
            .call()
            .map_err(|e| classify(e, operation))?;
        response
            .into_body()
            .with_config()
            .limit(MAX_ARCHIVE_BYTES)
            .read_to_vec()
            .map_err(|e| decode(e, operation))
    }
}

/// ureq v3 has no multipart support, so the single-file form is built by hand.
fn multipart_file_body(file_name: &str, contents: &[u8]) -> Vec<u8> {
    let file_name = quoted_param(file_name);
    let mut body: Vec<u8> = Vec::with_capacity(contents.len() + 256);
    body.extend_from_slice(
        format!(
            "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: text/csv\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(contents);
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
    body
}

/// Escape a header parameter value for use inside double quotes: quotes and
/// line breaks are percent-encoded as browsers do, backslashes are doubled.
fn quoted_param(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '"' => out.push_str("%22"),
            '\r' => out.push_str("%0D"),
            '\n' => out.push_str("%0A"),
            '\\' => out.push_str("\\\\"),
            other => out.push(other),
        }
    }
    out
}

fn classify(err: ureq::Error, operation: &'static str) -> BackendError {
    match err {
        ureq::Error::StatusCode(code) => BackendError::Status { operation, code },
        other => BackendError::Transport {
            operation,
            message: other.to_string(),
        },
    }
}

fn decode(err: ureq::Error, operation: &'static str) -> BackendError {
    BackendError::Decode {
        operation,
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let backend = HttpBackend::new("http://localhost:3001/", Duration::from_secs(1));
        assert_eq!(backend.url("/api/projectData"), "http://localhost:3001/api/projectData");
    }

    #[test]
    fn multipart_body_wraps_file() {
        let body = multipart_file_body("input_table.csv", b"id,value\n1,2\n");
        let text = String::from_utf8(body).unwrap();
        assert!(text.starts_with(&format!("--{MULTIPART_BOUNDARY}\r\n")));
        assert!(text.contains("name=\"file\"; filename=\"input_table.csv\""));
        assert!(text.contains("\r\n\r\nid,value\n1,2\n\r\n"));
        assert!(text.ends_with(&format!("--{MULTIPART_BOUNDARY}--\r\n")));
    }

    #[test]
    fn multipart_file_name_is_escaped() {
        let body = multipart_file_body("a\"b\\c\r\nX-Evil: 1.csv", b"x");
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains("filename=\"a%22b\\\\c%0D%0AX-Evil: 1.csv\"\r\n"));
        assert_eq!(text.matches("\r\n").count(), 6);
    }

    #[test]
    fn status_errors_keep_code() {
        let err = classify(ureq::Error::StatusCode(404), "download archive");
        assert!(matches!(
            err,
            BackendError::Status {
                code: 404,
                operation: "download archive"
            }
        ));
    }

    #[test]
    fn unreachable_backend_is_transport_error() {
        let backend = HttpBackend::new("http://127.0.0.1:9", Duration::from_millis(500));
        let err = backend.fetch_runs().unwrap_err();
        assert!(matches!(
            err,
            BackendError::Transport { .. } | BackendError::Status { .. }
        ));
    }
}
