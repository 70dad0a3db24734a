//! Compiled, framework-tested adapter (Java + JUnit)
//!
//! Stages `Solution.java` (the submission, verbatim) next to
//! `SolutionTests.java` (the exercise harness, a JUnit 5 test class) and the
//! JUnit console standalone jar. Compilation happens at image build time, so
//! a compile error surfaces as a failed build carrying the javac
//! diagnostics. The run step invokes the console launcher once; all cases
//! are evaluated by the framework inside that single process.

use crate::artifacts::JUNIT_CONSOLE_JAR;
use crate::catalog::LanguageExercise;
use crate::error::AdapterError;
use crate::evaluator::Submission;

use super::{
    ArtifactRequest, BuildDescriptor, ExecutionProtocol, Language, LanguageAdapter, PlanFile,
    WorkspacePlan,
};

const BASE_IMAGE: &str = "openjdk:21-slim";
const SOLUTION_FILE: &str = "Solution.java";
const TESTS_FILE: &str = "SolutionTests.java";
const TESTS_CLASS: &str = "SolutionTests";
const JAR_PATH: &str = "lib/junit-platform-console-standalone.jar";

pub struct JavaAdapter;

impl LanguageAdapter for JavaAdapter {
    fn language(&self) -> Language {
        Language::Java
    }

    fn plan(
        &self,
        submission: &Submission,
        exercise: &LanguageExercise,
    ) -> Result<WorkspacePlan, AdapterError> {
        if !exercise.harness.contains(&exercise.entry_point) {
            return Err(AdapterError::MalformedHarness(format!(
                "java harness does not reference entry point {}",
                exercise.entry_point
            )));
        }
        // The harness is staged as SolutionTests.java; javac requires the
        // class name to match.
        if !exercise.harness.contains(&format!("class {}", TESTS_CLASS)) {
            return Err(AdapterError::MalformedHarness(format!(
                "java harness must declare class {}",
                TESTS_CLASS
            )));
        }

        Ok(WorkspacePlan {
            files: vec![
                PlanFile::new(SOLUTION_FILE, submission.source.clone()),
                PlanFile::new(TESTS_FILE, exercise.harness.clone()),
            ],
            artifacts: vec![ArtifactRequest {
                name: JUNIT_CONSOLE_JAR.to_string(),
                path: JAR_PATH.to_string(),
            }],
            build: self.build_descriptor(),
        })
    }

    fn build_descriptor(&self) -> BuildDescriptor {
        BuildDescriptor {
            base_image: BASE_IMAGE.to_string(),
            compile: Some(vec![
                "javac".to_string(),
                "-cp".to_string(),
                JAR_PATH.to_string(),
                SOLUTION_FILE.to_string(),
                TESTS_FILE.to_string(),
            ]),
        }
    }

    fn protocol(&self) -> ExecutionProtocol {
        ExecutionProtocol::TestFramework {
            command: vec![
                "java".to_string(),
                "-jar".to_string(),
                JAR_PATH.to_string(),
                "execute".to_string(),
                "--class-path".to_string(),
                ".".to_string(),
                "--scan-class-path".to_string(),
                "--disable-banner".to_string(),
                "--disable-ansi-colors".to_string(),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise() -> LanguageExercise {
        LanguageExercise {
            entry_point: "getEvenNumbers".to_string(),
            harness: concat!(
                "import org.junit.jupiter.api.Test;\n",
                "class SolutionTests {\n",
                "    @Test void works() { new Solution().getEvenNumbers(new int[] {}); }\n",
                "}\n"
            )
            .to_string(),
            cases: vec![],
        }
    }

    fn submission() -> Submission {
        Submission::new(
            "even-numbers",
            Language::Java,
            "class Solution { int[] getEvenNumbers(int[] a) { return a; } }",
        )
    }

    #[test]
    fn stages_sources_and_requests_the_junit_jar() {
        let plan = JavaAdapter.plan(&submission(), &exercise()).unwrap();

        let paths: Vec<&str> = plan.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["Solution.java", "SolutionTests.java"]);
        assert_eq!(plan.artifacts.len(), 1);
        assert_eq!(plan.artifacts[0].name, JUNIT_CONSOLE_JAR);
        assert_eq!(
            plan.artifacts[0].path,
            "lib/junit-platform-console-standalone.jar"
        );
    }

    #[test]
    fn compiles_both_sources_against_the_jar_at_build_time() {
        let build = JavaAdapter.build_descriptor();
        let compile = build.compile.unwrap();
        assert_eq!(compile[0], "javac");
        assert!(compile.contains(&"Solution.java".to_string()));
        assert!(compile.contains(&"SolutionTests.java".to_string()));
    }

    #[test]
    fn rejects_harness_with_wrong_test_class_name() {
        let mut ex = exercise();
        // Entry point stays referenced; only the class name is off.
        ex.harness = ex.harness.replace("SolutionTests", "MyTests");

        let err = JavaAdapter.plan(&submission(), &ex).unwrap_err();
        assert!(matches!(err, AdapterError::MalformedHarness(_)));
    }

    #[test]
    fn protocol_is_a_single_framework_run() {
        match JavaAdapter.protocol() {
            ExecutionProtocol::TestFramework { command } => {
                assert_eq!(command[0], "java");
                assert!(command.contains(&"--scan-class-path".to_string()));
            }
            other => panic!("unexpected protocol: {:?}", other),
        }
    }
}
