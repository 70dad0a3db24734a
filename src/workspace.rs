//! Ephemeral workspace staging
//!
//! Materializes one [`WorkspacePlan`] into a uniquely-named temporary
//! directory: plan files verbatim, provider-resolved artifacts, and the
//! build descriptor rendered into a generated `Dockerfile`. The directory
//! and all contents are removed when the [`Workspace`] is dropped, however
//! its scope ends.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::adapter::{BuildDescriptor, WorkspacePlan};
use crate::artifacts::ArtifactProvider;
use crate::error::{AdapterError, StageError};

/// Filename of the generated build descriptor consumed by the substrate.
const BUILD_FILE: &str = "Dockerfile";

/// Handle to one staged evaluation directory. Removal on drop.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Stage a plan on disk. The plan is consumed: it is valid for exactly
    /// one materialization.
    pub async fn materialize(
        plan: WorkspacePlan,
        artifacts: &dyn ArtifactProvider,
    ) -> Result<Self, StageError> {
        // Validate every destination before touching the filesystem, so a
        // bad plan fails fast with no partial staging.
        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut claim = |raw: &str| -> Result<PathBuf, AdapterError> {
            let path = validated_relative(raw)?;
            if !seen.insert(path.clone()) {
                return Err(AdapterError::DuplicateFile(raw.to_string()));
            }
            Ok(path)
        };

        let mut file_paths = Vec::with_capacity(plan.files.len());
        for file in &plan.files {
            file_paths.push(claim(&file.path)?);
        }
        let mut artifact_paths = Vec::with_capacity(plan.artifacts.len());
        for request in &plan.artifacts {
            artifact_paths.push(claim(&request.path)?);
        }
        if seen.contains(Path::new(BUILD_FILE)) {
            return Err(AdapterError::DuplicateFile(BUILD_FILE.to_string()).into());
        }

        let dir = tempfile::Builder::new().prefix("grader-").tempdir()?;
        debug!("Staging workspace at {}", dir.path().display());

        for (file, rel_path) in plan.files.iter().zip(&file_paths) {
            let dest = dir.path().join(rel_path);
            if let Some(parent) = dest.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&dest, &file.content).await?;
        }

        for (request, rel_path) in plan.artifacts.iter().zip(&artifact_paths) {
            let source = artifacts.fetch(&request.name).await.map_err(StageError::Infra)?;
            let dest = dir.path().join(rel_path);
            if let Some(parent) = dest.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::copy(&source, &dest).await?;
        }

        tokio::fs::write(dir.path().join(BUILD_FILE), render_dockerfile(&plan.build)).await?;

        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// Render the build descriptor into the Dockerfile the substrate consumes.
/// The keepalive CMD keeps the container running so commands can be
/// executed against it after start.
fn render_dockerfile(build: &BuildDescriptor) -> String {
    let mut dockerfile = format!("FROM {}\nWORKDIR /app\nCOPY . /app\n", build.base_image);
    if let Some(compile) = &build.compile {
        dockerfile.push_str("RUN ");
        dockerfile.push_str(&compile.join(" "));
        dockerfile.push('\n');
    }
    dockerfile.push_str("CMD [\"tail\", \"-f\", \"/dev/null\"]\n");
    dockerfile
}

/// Accept only plain relative paths that stay inside the workspace.
fn validated_relative(raw: &str) -> Result<PathBuf, AdapterError> {
    let path = Path::new(raw);
    let plain = !raw.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if !plain {
        return Err(AdapterError::InvalidPath(raw.to_string()));
    }
    Ok(path.to_path_buf())
}
