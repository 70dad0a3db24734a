//! Artifact provider for third-party test-framework dependencies
//!
//! The framework adapter needs the JUnit console standalone jar inside its
//! workspace. [`HttpArtifactStore`] downloads it once into a local cache
//! directory and serves every later evaluation from disk; a cache hit
//! performs no network round trip. Fetch failures are infrastructure
//! faults, never submission faults.

use std::path::PathBuf;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::config::GraderConfig;
use crate::error::InfraError;

/// Logical name of the JUnit Platform console launcher artifact.
pub const JUNIT_CONSOLE_JAR: &str = "junit-platform-console-standalone.jar";

/// Supplies build artifacts by logical name. Idempotent: fetching the same
/// name twice yields the same local path.
#[async_trait]
pub trait ArtifactProvider: Send + Sync {
    async fn fetch(&self, name: &str) -> Result<PathBuf, InfraError>;
}

/// HTTP-backed artifact store with an on-disk cache. Cache entries are keyed
/// by a hash of the source URL, so a config change to a new artifact
/// version never serves a stale file.
pub struct HttpArtifactStore {
    client: reqwest::Client,
    cache_dir: PathBuf,
    junit_console_url: String,
}

impl HttpArtifactStore {
    pub fn new(config: &GraderConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            cache_dir: config.artifact_cache_dir.clone(),
            junit_console_url: config.junit_console_url.clone(),
        }
    }

    fn url_for(&self, name: &str) -> Option<&str> {
        match name {
            JUNIT_CONSOLE_JAR => Some(&self.junit_console_url),
            _ => None,
        }
    }

    fn cache_path(&self, url: &str, name: &str) -> PathBuf {
        let key = format!("{:x}", Sha256::digest(url.as_bytes()));
        self.cache_dir.join(format!("{}-{}", &key[..16], name))
    }
}

#[async_trait]
impl ArtifactProvider for HttpArtifactStore {
    async fn fetch(&self, name: &str) -> Result<PathBuf, InfraError> {
        let url = self
            .url_for(name)
            .ok_or_else(|| InfraError::Artifact {
                name: name.to_string(),
                reason: "no source URL configured".to_string(),
            })?
            .to_string();

        let path = self.cache_path(&url, name);
        if tokio::fs::metadata(&path).await.is_ok() {
            debug!("Artifact cache hit: {} -> {}", name, path.display());
            return Ok(path);
        }

        info!("Fetching artifact {} from {}", name, url);
        tokio::fs::create_dir_all(&self.cache_dir).await?;

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| InfraError::Artifact {
                name: name.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(InfraError::Artifact {
                name: name.to_string(),
                reason: format!("server returned {}", response.status()),
            });
        }

        let bytes = response.bytes().await.map_err(|e| InfraError::Artifact {
            name: name.to_string(),
            reason: e.to_string(),
        })?;

        tokio::fs::write(&path, &bytes).await?;
        info!(
            "Cached artifact {} ({} bytes) at {}",
            name,
            bytes.len(),
            path.display()
        );

        Ok(path)
    }
}
