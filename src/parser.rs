//! Result parsing - raw tool output to structured failure records
//!
//! Each execution protocol has its own strategy: exact-string comparison of
//! trimmed stdout for stdin/stdout exercises, and extraction of the JUnit
//! console launcher's failure summary for framework-tested ones. Parsing is
//! tolerant by rule: when a failing run produces nothing the strategy
//! recognizes (tool crash, bare stack trace), one synthetic record carrying
//! the raw output is emitted instead. The engine never answers "no
//! information" for a run that plainly did not pass.

use std::sync::OnceLock;

use regex::Regex;

use crate::catalog::TestCase;
use crate::report::{FailureRecord, RawExecutionOutput};

/// Cap on raw output carried inside a failure message.
const MAX_MESSAGE_CHARS: usize = 4096;

/// One failure block in the JUnit console summary:
///
/// ```text
/// Failures (1):
///   JUnit Jupiter:SolutionTests:returnsEvenNumbers()
///     MethodSource [className = 'SolutionTests', ...]
///     => org.opentest4j.AssertionFailedError: expected: <[2, 4, 6]> but was: <[]>
/// ```
fn failure_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?m)^\s{2}JUnit (?:Jupiter|Vintage|Platform):(?P<class>[^:\n]+):(?P<test>[^\n]+)\n(?:.*\n)*?\s*=> (?P<message>[^\n]+)$",
        )
        .unwrap()
    })
}

/// Leading exception class in an assertion message, e.g.
/// `org.opentest4j.AssertionFailedError: `.
fn exception_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$.]*(?:Error|Exception):\s+").unwrap())
}

fn truncated(text: &str) -> String {
    text.chars().take(MAX_MESSAGE_CHARS).collect()
}

/// Identifier for the n-th stdin/stdout case (1-based, matching the order
/// the catalog declares them in).
pub fn case_identifier(index: usize) -> String {
    format!("case {}", index + 1)
}

/// Grade one stdin/stdout invocation against its test case. `None` means
/// the case passed.
pub fn check_case(
    index: usize,
    case: &TestCase,
    raw: &RawExecutionOutput,
) -> Option<FailureRecord> {
    let test = case_identifier(index);

    if !raw.is_success() {
        // A crash in submitted code is a graded failure; carry the raw
        // output so the submitter sees the interpreter's own message.
        return Some(FailureRecord::new(
            test,
            format!(
                "input {:?}: process exited with code {}: {}",
                case.input,
                raw.exit_code,
                truncated(raw.combined().trim())
            ),
        ));
    }

    let actual = raw.stdout.trim();
    let expected = case.expected.trim();
    if actual == expected {
        return None;
    }

    Some(FailureRecord::new(
        test,
        format!(
            "input {:?}: expected {:?} got {:?}",
            case.input, expected, actual
        ),
    ))
}

/// Failure record for a build that completed with a nonzero status
/// (compile error in submitted code, broken base image, ...).
pub fn build_failure(log: &str) -> FailureRecord {
    FailureRecord::new("build", truncated(log.trim()))
}

/// Failure record for an exec that exceeded the configured wall-clock bound.
pub fn timeout_failure(test: impl Into<String>) -> FailureRecord {
    FailureRecord::new(test, "execution timed out")
}

/// Extract structured failures from one framework run. An empty result for
/// a zero exit code means every case passed; a nonzero exit with no
/// recognizable failure block degrades to a single record carrying the raw
/// output.
pub fn parse_framework_run(raw: &RawExecutionOutput) -> Vec<FailureRecord> {
    let combined = raw.combined();

    let mut failures: Vec<FailureRecord> = failure_block_re()
        .captures_iter(&combined)
        .map(|caps| {
            let class = caps["class"].trim();
            let test = caps["test"].trim();
            let message = exception_prefix_re()
                .replace(caps["message"].trim(), "")
                .into_owned();
            FailureRecord::new(format!("{}:{}", class, test), message)
        })
        .collect();

    if failures.is_empty() && !raw.is_success() {
        failures.push(FailureRecord::new(
            "test run",
            format!(
                "test runner exited with code {}: {}",
                raw.exit_code,
                truncated(combined.trim())
            ),
        ));
    }

    failures
}
