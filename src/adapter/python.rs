//! Interpreted-script adapter (Python)
//!
//! Stages `solution.py` (the submission, verbatim) next to `main.py` (the
//! exercise harness, which reads stdin, calls the entry point and prints the
//! result in Python's native literal representation). No compile step; test
//! cases are driven one exec at a time over stdin/stdout.

use crate::catalog::LanguageExercise;
use crate::error::AdapterError;
use crate::evaluator::Submission;

use super::{
    BuildDescriptor, ExecutionProtocol, Language, LanguageAdapter, PlanFile, WorkspacePlan,
};

const BASE_IMAGE: &str = "python:3.12-slim";
const SOLUTION_FILE: &str = "solution.py";
const HARNESS_FILE: &str = "main.py";

pub struct PythonAdapter;

impl LanguageAdapter for PythonAdapter {
    fn language(&self) -> Language {
        Language::Python
    }

    fn plan(
        &self,
        submission: &Submission,
        exercise: &LanguageExercise,
    ) -> Result<WorkspacePlan, AdapterError> {
        // The harness imports the entry point from solution.py; a template
        // that never names it cannot exercise the submission.
        if !exercise.harness.contains(&exercise.entry_point) {
            return Err(AdapterError::MalformedHarness(format!(
                "python harness does not reference entry point {}",
                exercise.entry_point
            )));
        }

        Ok(WorkspacePlan {
            files: vec![
                PlanFile::new(SOLUTION_FILE, submission.source.clone()),
                PlanFile::new(HARNESS_FILE, exercise.harness.clone()),
            ],
            artifacts: vec![],
            build: self.build_descriptor(),
        })
    }

    fn build_descriptor(&self) -> BuildDescriptor {
        BuildDescriptor {
            base_image: BASE_IMAGE.to_string(),
            compile: None,
        }
    }

    fn protocol(&self) -> ExecutionProtocol {
        ExecutionProtocol::StdinStdout {
            command: vec!["python".to_string(), HARNESS_FILE.to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TestCase;

    fn exercise() -> LanguageExercise {
        LanguageExercise {
            entry_point: "get_even_numbers".to_string(),
            harness: "from solution import get_even_numbers\nprint(get_even_numbers([]))\n"
                .to_string(),
            cases: vec![TestCase {
                input: "1 2".to_string(),
                expected: "[2]".to_string(),
            }],
        }
    }

    fn submission() -> Submission {
        Submission::new(
            "even-numbers",
            Language::Python,
            "def get_even_numbers(arr):\n    return [x for x in arr if x % 2 == 0]\n",
        )
    }

    #[test]
    fn stages_solution_and_harness_as_separate_files() {
        let plan = PythonAdapter.plan(&submission(), &exercise()).unwrap();

        assert_eq!(plan.files.len(), 2);
        assert_eq!(plan.files[0].path, "solution.py");
        assert!(plan.files[0].content.starts_with("def get_even_numbers"));
        assert_eq!(plan.files[1].path, "main.py");
        assert!(plan.artifacts.is_empty());
        assert_eq!(plan.build.base_image, "python:3.12-slim");
        assert!(plan.build.compile.is_none());
    }

    #[test]
    fn rejects_harness_missing_the_entry_point() {
        let mut ex = exercise();
        ex.harness = "print('hello')".to_string();

        let err = PythonAdapter.plan(&submission(), &ex).unwrap_err();
        assert!(matches!(err, AdapterError::MalformedHarness(_)));
    }

    #[test]
    fn protocol_runs_the_harness_per_case() {
        match PythonAdapter.protocol() {
            ExecutionProtocol::StdinStdout { command } => {
                assert_eq!(command, vec!["python", "main.py"]);
            }
            other => panic!("unexpected protocol: {:?}", other),
        }
    }
}
