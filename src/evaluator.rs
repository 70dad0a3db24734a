//! Evaluation orchestrator
//!
//! Sequences one submission through the whole pipeline: catalog lookup,
//! adapter planning, workspace staging, sandbox build/run, output parsing.
//! Owns the lifecycle guarantee: exactly one sandbox is created per
//! evaluation and it is destroyed before `evaluate` returns, on every exit
//! path.
//!
//! Fault classification follows the three disjoint classes: adapter/
//! configuration bugs fail fast as [`AdapterError`], infrastructure faults
//! come back as `EvaluationResult { infra_error: true, .. }` so the caller
//! may retry, and submission faults are ordinary failure records inside a
//! graded result.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::adapter::{adapter_for, ExecutionProtocol, Language};
use crate::artifacts::ArtifactProvider;
use crate::catalog::{ExerciseCatalog, LanguageExercise};
use crate::config::GraderConfig;
use crate::error::{AdapterError, InfraError, StageError};
use crate::parser;
use crate::report::EvaluationResult;
use crate::sandbox::{ExecOutcome, IsolationSubstrate, Sandbox};
use crate::workspace::Workspace;

/// One user-submitted solution. Immutable; never persisted by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub exercise_id: String,
    pub language: Language,
    pub source: String,
}

impl Submission {
    pub fn new(
        exercise_id: impl Into<String>,
        language: Language,
        source: impl Into<String>,
    ) -> Self {
        Self {
            exercise_id: exercise_id.into(),
            language,
            source: source.into(),
        }
    }
}

/// Grades submissions. One instance may serve many evaluations; each
/// evaluation owns its own workspace and sandbox and shares no mutable
/// state with the others.
pub struct Evaluator {
    catalog: Arc<dyn ExerciseCatalog>,
    substrate: Arc<dyn IsolationSubstrate>,
    artifacts: Arc<dyn ArtifactProvider>,
    config: GraderConfig,
}

impl Evaluator {
    pub fn new(
        catalog: Arc<dyn ExerciseCatalog>,
        substrate: Arc<dyn IsolationSubstrate>,
        artifacts: Arc<dyn ArtifactProvider>,
        config: GraderConfig,
    ) -> Self {
        Self {
            catalog,
            substrate,
            artifacts,
            config,
        }
    }

    /// Grade one submission. `Err` means a configuration/programmer fault;
    /// everything else, including infrastructure trouble, terminates in an
    /// [`EvaluationResult`].
    pub async fn evaluate(
        &self,
        submission: &Submission,
    ) -> Result<EvaluationResult, AdapterError> {
        info!(
            "Evaluating submission: exercise={}, language={}",
            submission.exercise_id, submission.language
        );

        let exercise = self
            .catalog
            .get(&submission.exercise_id, submission.language)
            .ok_or_else(|| {
                if self.catalog.contains(&submission.exercise_id) {
                    AdapterError::MissingLanguage {
                        exercise_id: submission.exercise_id.clone(),
                        language: submission.language.to_string(),
                    }
                } else {
                    AdapterError::UnknownExercise(submission.exercise_id.clone())
                }
            })?;

        let adapter = adapter_for(submission.language);
        let plan = adapter.plan(submission, exercise)?;

        let workspace = match Workspace::materialize(plan, self.artifacts.as_ref()).await {
            Ok(workspace) => workspace,
            Err(StageError::Adapter(e)) => return Err(e),
            Err(StageError::Infra(e)) => {
                warn!("Workspace staging failed: {}", e);
                return Ok(EvaluationResult::infra(e.to_string()));
            }
        };

        // Scoped acquisition: the sandbox is destroyed after the run on
        // every path, and its drop hook backstops a cancelled future.
        let mut sandbox = Sandbox::create(Arc::clone(&self.substrate), self.config.exec_timeout);
        let outcome = self
            .run_in_sandbox(&mut sandbox, &workspace, exercise, adapter.protocol())
            .await;
        sandbox.destroy().await;

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                warn!("Evaluation hit an infrastructure fault: {}", e);
                EvaluationResult::infra(e.to_string())
            }
        };

        info!(
            "Evaluation finished: exercise={}, passed={}, failures={}, infra_error={}",
            submission.exercise_id,
            result.passed,
            result.failures.len(),
            result.infra_error
        );
        Ok(result)
    }

    async fn run_in_sandbox(
        &self,
        sandbox: &mut Sandbox,
        workspace: &Workspace,
        exercise: &LanguageExercise,
        protocol: ExecutionProtocol,
    ) -> Result<EvaluationResult, InfraError> {
        let build = sandbox.build(workspace.path()).await?;
        if !build.success {
            // Compile errors in submitted code land here: a graded outcome
            // carrying the tool diagnostics, not a fault.
            info!("Sandbox build failed; grading as submission fault");
            return Ok(EvaluationResult::failed(vec![parser::build_failure(
                &build.log,
            )]));
        }

        sandbox.start().await?;

        let failures = match protocol {
            ExecutionProtocol::StdinStdout { command } => {
                let mut failures = Vec::new();
                for (index, case) in exercise.cases.iter().enumerate() {
                    match sandbox.exec(&command, Some(&case.input)).await? {
                        ExecOutcome::Completed(raw) => {
                            failures.extend(parser::check_case(index, case, &raw));
                        }
                        ExecOutcome::TimedOut => {
                            // Remaining cases are skipped: the sandbox must
                            // be destroyed now, not left running.
                            failures
                                .push(parser::timeout_failure(parser::case_identifier(index)));
                            break;
                        }
                    }
                }
                failures
            }
            ExecutionProtocol::TestFramework { command } => {
                match sandbox.exec(&command, None).await? {
                    ExecOutcome::Completed(raw) => parser::parse_framework_run(&raw),
                    ExecOutcome::TimedOut => vec![parser::timeout_failure("test run")],
                }
            }
        };

        if failures.is_empty() {
            Ok(EvaluationResult::passed())
        } else {
            Ok(EvaluationResult::failed(failures))
        }
    }
}
