//! Interpretation of the result-status endpoint's body.
//!
//! The endpoint answers with an empty body until the model runner has
//! written its summary, then with an object carrying the two loss figures.
//! Failure objects (`{"error": ..}` or `{"status": "failed"}`) end polling.

use crate::{BackendError, BackendResult};
use fc_results::RunMetrics;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum ResultStatus {
    NotReady,
    Ready(RunMetrics),
    Failed(String),
}

impl ResultStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ResultStatus::NotReady)
    }
}

const OPERATION: &str = "fetch result";

pub fn parse_result_body(body: &str) -> BackendResult<ResultStatus> {
    let body = body.trim();
    if body.is_empty() {
        return Ok(ResultStatus::NotReady);
    }
    let value: Value = serde_json::from_str(body).map_err(|e| decode(e.to_string()))?;
    parse_result_value(&value)
}

pub fn parse_result_value(value: &Value) -> BackendResult<ResultStatus> {
    match value {
        Value::Null | Value::Bool(false) => Ok(ResultStatus::NotReady),
        Value::String(s) if s.is_empty() => Ok(ResultStatus::NotReady),
        Value::Object(map) if map.is_empty() => Ok(ResultStatus::NotReady),
        Value::Object(map) => parse_object(map),
        other => Err(decode(format!("unexpected result payload: {other}"))),
    }
}

fn parse_object(map: &Map<String, Value>) -> BackendResult<ResultStatus> {
    if let Some(error) = map.get("error").filter(|v| !v.is_null()) {
        return Ok(ResultStatus::Failed(describe(error)));
    }
    let failed = map
        .get("status")
        .and_then(Value::as_str)
        .is_some_and(|s| s.eq_ignore_ascii_case("failed"));
    if failed {
        let reason = map
            .get("message")
            .map(describe)
            .unwrap_or_else(|| "backend reported failure".to_string());
        return Ok(ResultStatus::Failed(reason));
    }

    let average_annual_loss = number_field(map, "annualTotalLoss")?;
    let standard_deviation = number_field(map, "standDerivation")?;
    Ok(ResultStatus::Ready(RunMetrics {
        average_annual_loss,
        standard_deviation,
    }))
}

/// The runner writes its figures either as JSON numbers or as numeric strings.
fn number_field(map: &Map<String, Value>, field: &str) -> BackendResult<f64> {
    let value = map
        .get(field)
        .ok_or_else(|| decode(format!("missing field '{field}'")))?;
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match number {
        Some(n) if n.is_finite() => Ok(n),
        _ => Err(decode(format!("field '{field}' is not a number: {value}"))),
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn decode(message: String) -> BackendError {
    BackendError::Decode {
        operation: OPERATION,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_is_not_ready() {
        for body in ["", "  \n", "null", "{}", "\"\"", "false"] {
            assert_eq!(
                parse_result_body(body).unwrap(),
                ResultStatus::NotReady,
                "{body:?}"
            );
        }
    }

    #[test]
    fn numeric_fields_are_ready() {
        let status =
            parse_result_body(r#"{"annualTotalLoss": 1523.5, "standDerivation": 12}"#).unwrap();
        assert_eq!(
            status,
            ResultStatus::Ready(RunMetrics {
                average_annual_loss: 1523.5,
                standard_deviation: 12.0,
            })
        );
    }

    #[test]
    fn string_fields_are_ready() {
        let status =
            parse_result_body(r#"{"annualTotalLoss": " 88.25", "standDerivation": "3.5"}"#)
                .unwrap();
        assert!(matches!(status, ResultStatus::Ready(m) if m.average_annual_loss == 88.25));
    }

    #[test]
    fn error_field_is_failure() {
        let status = parse_result_body(r#"{"error": "hazard file missing"}"#).unwrap();
        assert_eq!(
            status,
            ResultStatus::Failed("hazard file missing".to_string())
        );
    }

    #[test]
    fn failed_status_is_failure() {
        let status = parse_result_body(r#"{"status": "FAILED"}"#).unwrap();
        assert_eq!(
            status,
            ResultStatus::Failed("backend reported failure".to_string())
        );
    }

    #[test]
    fn missing_metric_is_decode_error() {
        let err = parse_result_body(r#"{"annualTotalLoss": 1}"#).unwrap_err();
        assert!(matches!(err, BackendError::Decode { .. }));
    }

    #[test]
    fn garbage_is_decode_error() {
        assert!(parse_result_body("<html>").is_err());
        assert!(parse_result_body("42").is_err());
        assert!(parse_result_body(r#"{"annualTotalLoss": "abc", "standDerivation": 1}"#).is_err());
    }
}
