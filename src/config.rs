//! Engine configuration, loaded from environment or set explicitly.

use std::path::PathBuf;
use std::time::Duration;

/// Default wall-clock bound for a single command inside the sandbox.
const DEFAULT_EXEC_TIMEOUT_SECS: u64 = 10;

/// JUnit Platform console launcher, the framework adapter's only artifact.
const DEFAULT_JUNIT_CONSOLE_URL: &str = "https://repo1.maven.org/maven2/org/junit/platform/junit-platform-console-standalone/1.10.2/junit-platform-console-standalone-1.10.2.jar";

/// Engine configuration
#[derive(Debug, Clone)]
pub struct GraderConfig {
    /// Wall-clock limit for one exec inside the sandbox. Exceeding it is a
    /// submission fault ("execution timed out"), not an infra fault.
    pub exec_timeout: Duration,
    /// Directory where fetched artifacts are cached across evaluations.
    pub artifact_cache_dir: PathBuf,
    /// Download URL for the JUnit console standalone jar.
    pub junit_console_url: String,
}

impl Default for GraderConfig {
    fn default() -> Self {
        Self {
            exec_timeout: Duration::from_secs(DEFAULT_EXEC_TIMEOUT_SECS),
            artifact_cache_dir: std::env::temp_dir().join("grader-artifacts"),
            junit_console_url: DEFAULT_JUNIT_CONSOLE_URL.to_string(),
        }
    }
}

impl GraderConfig {
    /// Build a config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let exec_timeout = std::env::var("GRADER_EXEC_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.exec_timeout);

        let artifact_cache_dir = std::env::var("GRADER_ARTIFACT_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.artifact_cache_dir);

        let junit_console_url =
            std::env::var("GRADER_JUNIT_CONSOLE_URL").unwrap_or(defaults.junit_console_url);

        Self {
            exec_timeout,
            artifact_cache_dir,
            junit_console_url,
        }
    }
}
