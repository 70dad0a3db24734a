//! Caller-facing result types
//!
//! An evaluation always terminates in an [`EvaluationResult`]. Submission
//! faults (mismatches, compile errors, timeouts) become [`FailureRecord`]s;
//! infrastructure faults set `infra_error` instead of being thrown.

use serde::{Deserialize, Serialize};

/// One failing test, identified by the adapter's test identifier
/// (case index for stdin/stdout exercises, `Class:method()` for
/// framework-tested ones).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub test: String,
    pub message: String,
}

impl FailureRecord {
    pub fn new(test: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            test: test.into(),
            message: message.into(),
        }
    }
}

/// Raw output captured from one command executed inside the sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawExecutionOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i64,
}

impl RawExecutionOutput {
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    /// Stdout and stderr joined, for diagnostics that need the combined text.
    pub fn combined(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Terminal value of one evaluation. The engine holds no further state
/// after returning it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub passed: bool,
    pub failures: Vec<FailureRecord>,
    pub infra_error: bool,
    /// Human-readable description of the infrastructure fault, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub infra_message: Option<String>,
}

impl EvaluationResult {
    /// All test cases passed.
    pub fn passed() -> Self {
        Self {
            passed: true,
            failures: vec![],
            infra_error: false,
            infra_message: None,
        }
    }

    /// The submission was graded and found wanting.
    pub fn failed(failures: Vec<FailureRecord>) -> Self {
        Self {
            passed: false,
            failures,
            infra_error: false,
            infra_message: None,
        }
    }

    /// The evaluation could not be carried out; the caller may retry.
    pub fn infra(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            failures: vec![],
            infra_error: true,
            infra_message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_without_infra_message_when_absent() {
        let json = serde_json::to_string(&EvaluationResult::passed()).unwrap();
        assert_eq!(
            json,
            r#"{"passed":true,"failures":[],"infra_error":false}"#
        );
    }

    #[test]
    fn serializes_failures_as_test_message_pairs() {
        let result =
            EvaluationResult::failed(vec![FailureRecord::new("case 1", "expected 2 got 3")]);
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains(r#""test":"case 1""#));
        assert!(json.contains(r#""message":"expected 2 got 3""#));
    }

    #[test]
    fn combined_output_joins_both_streams() {
        let raw = RawExecutionOutput {
            stdout: "out".into(),
            stderr: "err".into(),
            exit_code: 1,
        };
        assert_eq!(raw.combined(), "out\nerr");
        assert!(!raw.is_success());
    }
}
