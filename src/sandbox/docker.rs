//! Docker-backed isolation substrate
//!
//! Drives the Docker Engine API through bollard: the staged workspace is
//! tarred in memory and streamed to the daemon as the build context, the
//! container is created from the resulting image, and commands run through
//! the exec API with stdin attached. Connectivity problems surface as
//! [`InfraError::Substrate`]; a failed build (compile error in submitted
//! code) is reported through [`BuildOutput`] with the daemon's diagnostic
//! log.

use std::fmt::Display;
use std::path::Path;

use async_trait::async_trait;
use bollard::container::{
    Config as ContainerConfig, CreateContainerOptions, LogOutput, RemoveContainerOptions,
};
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::image::{BuildImageOptions, RemoveImageOptions};
use bollard::Docker;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::InfraError;
use crate::report::RawExecutionOutput;

use super::{BuildOutput, IsolationSubstrate};

fn substrate_err(e: impl Display) -> InfraError {
    InfraError::Substrate(e.to_string())
}

/// Production substrate backed by the local Docker daemon.
pub struct DockerSubstrate {
    docker: Docker,
}

impl DockerSubstrate {
    /// Connect to the local daemon and verify it responds.
    pub async fn connect() -> Result<Self, InfraError> {
        let docker = Docker::connect_with_local_defaults().map_err(substrate_err)?;
        docker.ping().await.map_err(substrate_err)?;
        info!("Connected to Docker daemon");
        Ok(Self { docker })
    }
}

/// Tar a staged workspace into an in-memory build context.
fn tar_directory(dir: &Path) -> std::io::Result<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());
    builder.append_dir_all(".", dir)?;
    builder.into_inner()
}

#[async_trait]
impl IsolationSubstrate for DockerSubstrate {
    async fn build_image(&self, context_dir: &Path, tag: &str) -> Result<BuildOutput, InfraError> {
        let context = tar_directory(context_dir)?;
        debug!(
            "Building image {} from {} ({} byte context)",
            tag,
            context_dir.display(),
            context.len()
        );

        let options = BuildImageOptions {
            dockerfile: "Dockerfile".to_string(),
            t: tag.to_string(),
            rm: true,
            forcerm: true,
            ..Default::default()
        };

        let mut stream =
            self.docker
                .build_image(options, None, Some(context.into()));

        let mut log = String::new();
        let mut success = true;
        while let Some(item) = stream.next().await {
            match item {
                Ok(progress) => {
                    if let Some(line) = progress.stream {
                        log.push_str(&line);
                    }
                    if let Some(error) = progress.error {
                        success = false;
                        log.push_str(&error);
                        log.push('\n');
                    }
                }
                Err(e) => {
                    // The daemon reports a failing RUN step (a compile error)
                    // as a stream error; the tool diagnostics are already in
                    // the accumulated log.
                    success = false;
                    log.push_str(&e.to_string());
                    log.push('\n');
                    break;
                }
            }
        }

        Ok(BuildOutput { success, log })
    }

    async fn start_container(&self, image_tag: &str, name: &str) -> Result<String, InfraError> {
        let config = ContainerConfig::<String> {
            image: Some(image_tag.to_string()),
            ..Default::default()
        };

        let created = self
            .docker
            .create_container(
                Some(CreateContainerOptions {
                    name: name.to_string(),
                    platform: None,
                }),
                config,
            )
            .await
            .map_err(substrate_err)?;

        self.docker
            .start_container::<String>(&created.id, None)
            .await
            .map_err(substrate_err)?;

        Ok(created.id)
    }

    async fn exec(
        &self,
        container_id: &str,
        command: &[String],
        stdin: Option<&str>,
    ) -> Result<RawExecutionOutput, InfraError> {
        let exec = self
            .docker
            .create_exec(
                container_id,
                CreateExecOptions {
                    cmd: Some(command.to_vec()),
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    attach_stdin: Some(stdin.is_some()),
                    ..Default::default()
                },
            )
            .await
            .map_err(substrate_err)?;

        let mut stdout = String::new();
        let mut stderr = String::new();

        if let StartExecResults::Attached {
            mut output,
            mut input,
        } = self
            .docker
            .start_exec(&exec.id, None)
            .await
            .map_err(substrate_err)?
        {
            if let Some(payload) = stdin {
                input.write_all(payload.as_bytes()).await?;
                input.shutdown().await?;
            }

            while let Some(chunk) = output.next().await {
                match chunk.map_err(substrate_err)? {
                    LogOutput::StdOut { message } => {
                        stdout.push_str(&String::from_utf8_lossy(&message));
                    }
                    LogOutput::StdErr { message } => {
                        stderr.push_str(&String::from_utf8_lossy(&message));
                    }
                    _ => {}
                }
            }
        }

        let inspect = self
            .docker
            .inspect_exec(&exec.id)
            .await
            .map_err(substrate_err)?;
        let exit_code = inspect.exit_code.unwrap_or(-1);

        Ok(RawExecutionOutput {
            stdout,
            stderr,
            exit_code,
        })
    }

    async fn remove_container(&self, container_id: &str) -> Result<(), InfraError> {
        self.docker
            .remove_container(
                container_id,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await
            .map_err(substrate_err)
    }

    async fn remove_image(&self, tag: &str) -> Result<(), InfraError> {
        self.docker
            .remove_image(
                tag,
                Some(RemoveImageOptions {
                    force: true,
                    ..Default::default()
                }),
                None,
            )
            .await
            .map(|_| ())
            .map_err(substrate_err)
    }
}
