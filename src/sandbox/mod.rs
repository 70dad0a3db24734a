//! Sandbox lifecycle on top of the isolation substrate
//!
//! The engine never isolates anything itself; it drives an external
//! substrate through the [`IsolationSubstrate`] trait (build an image from a
//! directory, run a container, execute commands inside it, remove it).
//! [`Sandbox`] is the per-evaluation state machine layered on that trait:
//!
//! ```text
//! Created -> (build) -> Built -> (start) -> Running -> (exec xN) -> Exited -> Destroyed
//!                    \-> BuildFailed (compile error: a graded outcome, not a fault)
//! ```
//!
//! A sandbox is exclusively owned by one evaluation. Image tag and container
//! name are derived from a fresh UUID, so concurrent evaluations never
//! collide and nothing is ever reused across submissions.

pub mod docker;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::InfraError;
use crate::report::RawExecutionOutput;

pub use docker::DockerSubstrate;

/// Outcome of an image build. A nonzero tool status (e.g. a compile error in
/// submitted code) is a *successful* substrate call whose payload is the
/// diagnostic log; only transport/daemon problems are errors.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub success: bool,
    pub log: String,
}

/// External isolation boundary (Docker or a stand-in).
#[async_trait]
pub trait IsolationSubstrate: Send + Sync {
    /// Build an image from the staged directory under the given tag.
    async fn build_image(&self, context_dir: &Path, tag: &str) -> Result<BuildOutput, InfraError>;

    /// Start one container from the image; returns the container id.
    async fn start_container(&self, image_tag: &str, name: &str) -> Result<String, InfraError>;

    /// Run one command inside the running container.
    async fn exec(
        &self,
        container_id: &str,
        command: &[String],
        stdin: Option<&str>,
    ) -> Result<RawExecutionOutput, InfraError>;

    async fn remove_container(&self, container_id: &str) -> Result<(), InfraError>;

    async fn remove_image(&self, tag: &str) -> Result<(), InfraError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SandboxState {
    Created,
    Built,
    BuildFailed,
    Running,
    Exited,
    Destroyed,
}

/// Result of one exec step. A timeout is a submission fault the caller
/// turns into a failure record; the sandbox must be destroyed right after.
#[derive(Debug)]
pub enum ExecOutcome {
    Completed(RawExecutionOutput),
    TimedOut,
}

/// One ephemeral build+run environment, driven through the substrate.
pub struct Sandbox {
    substrate: Arc<dyn IsolationSubstrate>,
    image_tag: String,
    container_name: String,
    container_id: Option<String>,
    image_built: bool,
    state: SandboxState,
    exec_timeout: Duration,
}

impl Sandbox {
    pub fn create(substrate: Arc<dyn IsolationSubstrate>, exec_timeout: Duration) -> Self {
        let run_id = Uuid::new_v4().simple().to_string();
        Self {
            substrate,
            image_tag: format!("grader-{}", run_id),
            container_name: format!("grader-run-{}", run_id),
            container_id: None,
            image_built: false,
            state: SandboxState::Created,
            exec_timeout,
        }
    }

    pub fn state(&self) -> SandboxState {
        self.state
    }

    /// Build the image from the workspace. A failed build transitions to
    /// `BuildFailed` and hands the diagnostics back; it is not an error.
    pub async fn build(&mut self, workspace: &Path) -> Result<BuildOutput, InfraError> {
        debug!("Building sandbox image {}", self.image_tag);
        let output = self.substrate.build_image(workspace, &self.image_tag).await?;

        if output.success {
            self.image_built = true;
            self.state = SandboxState::Built;
        } else {
            // Layers built before the failing step may linger; only a
            // successfully tagged image is ours to remove.
            self.image_built = false;
            self.state = SandboxState::BuildFailed;
        }
        Ok(output)
    }

    pub async fn start(&mut self) -> Result<(), InfraError> {
        debug!("Starting sandbox container {}", self.container_name);
        let id = self
            .substrate
            .start_container(&self.image_tag, &self.container_name)
            .await?;
        self.container_id = Some(id);
        self.state = SandboxState::Running;
        Ok(())
    }

    /// Run one command inside the sandbox, bounded by the configured
    /// wall-clock timeout.
    pub async fn exec(
        &mut self,
        command: &[String],
        stdin: Option<&str>,
    ) -> Result<ExecOutcome, InfraError> {
        let id = self
            .container_id
            .as_deref()
            .ok_or_else(|| InfraError::Substrate("exec before container start".to_string()))?;

        match tokio::time::timeout(self.exec_timeout, self.substrate.exec(id, command, stdin))
            .await
        {
            Ok(result) => Ok(ExecOutcome::Completed(result?)),
            Err(_) => {
                warn!(
                    "Exec in {} exceeded {:?}; sandbox will be destroyed",
                    self.container_name, self.exec_timeout
                );
                Ok(ExecOutcome::TimedOut)
            }
        }
    }

    /// Tear the sandbox down. Idempotent; invoked on every exit path.
    /// Removal failures are logged and never raised, so they cannot mask a
    /// result that has already been determined.
    pub async fn destroy(&mut self) {
        if self.state == SandboxState::Destroyed {
            return;
        }
        if self.state == SandboxState::Running {
            self.state = SandboxState::Exited;
        }

        if let Some(id) = self.container_id.take() {
            if let Err(e) = self.substrate.remove_container(&id).await {
                warn!("Failed to remove container {}: {}", self.container_name, e);
            }
        }
        if self.image_built {
            if let Err(e) = self.substrate.remove_image(&self.image_tag).await {
                warn!("Failed to remove image {}: {}", self.image_tag, e);
            }
            self.image_built = false;
        }
        self.state = SandboxState::Destroyed;
    }
}

impl Drop for Sandbox {
    /// Backstop for cancelled evaluations: if the owning future was dropped
    /// before `destroy`, spawn a forced removal so nothing is left running.
    fn drop(&mut self) {
        if self.state == SandboxState::Destroyed {
            return;
        }
        let container = self.container_id.take();
        let image = self.image_built.then(|| self.image_tag.clone());
        if container.is_none() && image.is_none() {
            return;
        }

        warn!(
            "Sandbox {} dropped before destroy; spawning forced removal",
            self.container_name
        );
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let substrate = Arc::clone(&self.substrate);
            handle.spawn(async move {
                if let Some(id) = container {
                    let _ = substrate.remove_container(&id).await;
                }
                if let Some(tag) = image {
                    let _ = substrate.remove_image(&tag).await;
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Substrate whose exec never finishes, for exercising the timeout path.
    struct StuckSubstrate {
        removals: AtomicUsize,
    }

    #[async_trait]
    impl IsolationSubstrate for StuckSubstrate {
        async fn build_image(
            &self,
            _context_dir: &Path,
            _tag: &str,
        ) -> Result<BuildOutput, InfraError> {
            Ok(BuildOutput {
                success: true,
                log: String::new(),
            })
        }

        async fn start_container(
            &self,
            _image_tag: &str,
            name: &str,
        ) -> Result<String, InfraError> {
            Ok(name.to_string())
        }

        async fn exec(
            &self,
            _container_id: &str,
            _command: &[String],
            _stdin: Option<&str>,
        ) -> Result<RawExecutionOutput, InfraError> {
            std::future::pending().await
        }

        async fn remove_container(&self, _container_id: &str) -> Result<(), InfraError> {
            self.removals.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn remove_image(&self, _tag: &str) -> Result<(), InfraError> {
            Ok(())
        }
    }

    fn stuck() -> Arc<StuckSubstrate> {
        Arc::new(StuckSubstrate {
            removals: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn walks_the_lifecycle_states() {
        let substrate = stuck();
        let mut sandbox = Sandbox::create(substrate.clone(), Duration::from_secs(1));
        assert_eq!(sandbox.state(), SandboxState::Created);

        sandbox.build(Path::new("/tmp")).await.unwrap();
        assert_eq!(sandbox.state(), SandboxState::Built);

        sandbox.start().await.unwrap();
        assert_eq!(sandbox.state(), SandboxState::Running);

        sandbox.destroy().await;
        assert_eq!(sandbox.state(), SandboxState::Destroyed);
        assert_eq!(substrate.removals.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exec_times_out_without_erroring() {
        let substrate = stuck();
        let mut sandbox = Sandbox::create(substrate.clone(), Duration::from_millis(20));
        sandbox.build(Path::new("/tmp")).await.unwrap();
        sandbox.start().await.unwrap();

        let outcome = sandbox.exec(&["run".to_string()], None).await.unwrap();
        assert!(matches!(outcome, ExecOutcome::TimedOut));

        sandbox.destroy().await;
        assert_eq!(substrate.removals.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn destroy_is_idempotent() {
        let substrate = stuck();
        let mut sandbox = Sandbox::create(substrate.clone(), Duration::from_secs(1));
        sandbox.build(Path::new("/tmp")).await.unwrap();
        sandbox.start().await.unwrap();

        sandbox.destroy().await;
        sandbox.destroy().await;
        assert_eq!(substrate.removals.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exec_before_start_is_a_substrate_fault() {
        let mut sandbox = Sandbox::create(stuck(), Duration::from_secs(1));
        let err = sandbox.exec(&["run".to_string()], None).await.unwrap_err();
        assert!(matches!(err, InfraError::Substrate(_)));
    }

    #[test]
    fn names_are_unique_per_sandbox() {
        let substrate = stuck();
        let a = Sandbox::create(substrate.clone(), Duration::from_secs(1));
        let b = Sandbox::create(substrate, Duration::from_secs(1));
        assert_ne!(a.image_tag, b.image_tag);
        assert_ne!(a.container_name, b.container_name);
    }
}
