//! Language adapters
//!
//! An adapter is the per-language strategy behind the grading engine: it
//! stages a submission + harness into a [`WorkspacePlan`], declares how the
//! staged workspace becomes a runnable image ([`BuildDescriptor`]) and which
//! [`ExecutionProtocol`] drives the test run. The protocol variant also
//! selects the parse strategy applied to the captured output (see
//! [`crate::parser`]).
//!
//! Adapters are pure: `plan` performs no I/O and has no side effects.
//! Submitted source is always written to its own file, never spliced into
//! harness text.

pub mod java;
pub mod python;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog::LanguageExercise;
use crate::error::AdapterError;
use crate::evaluator::Submission;

pub use java::JavaAdapter;
pub use python::PythonAdapter;

/// Supported source languages. New languages add a variant and an adapter,
/// never a conditional in the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Java,
}

impl Language {
    /// Framework-tested languages embed their test cases in the harness
    /// source; stdin/stdout languages carry them as catalog data.
    pub fn tests_embedded_in_harness(&self) -> bool {
        matches!(self, Language::Java)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Language::Python => "python",
            Language::Java => "java",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Language {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "python" | "python3" | "py" => Ok(Language::Python),
            "java" => Ok(Language::Java),
            other => Err(AdapterError::UnknownLanguage(other.to_string())),
        }
    }
}

/// One file to write into the workspace, path relative to its root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanFile {
    pub path: String,
    pub content: String,
}

impl PlanFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// A binary dependency resolved through the artifact provider at
/// materialization time and copied to `path` inside the workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRequest {
    /// Logical artifact name, resolved by the provider.
    pub name: String,
    /// Destination path relative to the workspace root.
    pub path: String,
}

/// How the staged workspace becomes a runnable image. Expressed as data and
/// rendered into a Dockerfile by the workspace builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDescriptor {
    /// Base image the workspace is layered onto.
    pub base_image: String,
    /// Compile command executed at image build time. `None` for interpreted
    /// languages. A nonzero status here is a submission fault (compile
    /// error), reported with the build diagnostics.
    pub compile: Option<Vec<String>>,
}

/// How test cases are driven once the sandbox is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionProtocol {
    /// One exec per test case: feed `TestCase::input` on stdin, compare the
    /// trimmed stdout against `TestCase::expected` literally.
    StdinStdout { command: Vec<String> },
    /// One exec of the test-framework console runner; its combined output
    /// is the sole artifact to parse.
    TestFramework { command: Vec<String> },
}

/// Everything the workspace builder needs to stage one evaluation.
/// Produced by an adapter, consumed exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspacePlan {
    /// Files written verbatim, in order. Paths must be unique.
    pub files: Vec<PlanFile>,
    /// Artifacts copied in from the provider's local cache.
    pub artifacts: Vec<ArtifactRequest>,
    pub build: BuildDescriptor,
}

/// Per-language grading strategy.
pub trait LanguageAdapter: Send + Sync {
    fn language(&self) -> Language;

    /// Stage submission + harness into a workspace plan. Deterministic,
    /// no I/O.
    fn plan(
        &self,
        submission: &Submission,
        exercise: &LanguageExercise,
    ) -> Result<WorkspacePlan, AdapterError>;

    fn build_descriptor(&self) -> BuildDescriptor;

    fn protocol(&self) -> ExecutionProtocol;
}

static PYTHON: PythonAdapter = PythonAdapter;
static JAVA: JavaAdapter = JavaAdapter;

/// Adapter lookup. Total over [`Language`]: every variant has an adapter.
pub fn adapter_for(language: Language) -> &'static dyn LanguageAdapter {
    match language {
        Language::Python => &PYTHON,
        Language::Java => &JAVA,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_language_names_and_aliases() {
        assert_eq!("python".parse::<Language>().unwrap(), Language::Python);
        assert_eq!("py".parse::<Language>().unwrap(), Language::Python);
        assert_eq!("Java".parse::<Language>().unwrap(), Language::Java);
        assert!(matches!(
            "cobol".parse::<Language>(),
            Err(AdapterError::UnknownLanguage(_))
        ));
    }

    #[test]
    fn every_language_has_an_adapter() {
        for language in [Language::Python, Language::Java] {
            assert_eq!(adapter_for(language).language(), language);
        }
    }
}
