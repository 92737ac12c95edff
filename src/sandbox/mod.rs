//! Ephemeral sandbox lifecycle
//!
//! One sandbox per pipeline run: provision, install dependencies, upload the
//! script, render, download the artifact, destroy. The orchestrator owns the
//! lifecycle policy; the provider trait hides the wire protocol.

mod daytona;

pub use daytona::DaytonaClient;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::generator::GeneratedScript;

/// Working directory inside the sandbox
pub const SANDBOX_HOME: &str = "/home/daytona";

/// Fixed dependency install command, bounded by the stage timeout
const INSTALL_COMMAND: &str = "pip install manim && manim-latex-downloader";

/// Render quality flags and the media directory Manim derives from them.
///
/// These two constants MUST change together: `-pql` makes Manim write into a
/// `480p15` subdirectory, and the artifact path is reconstructed from that
/// convention rather than reported by the render command.
const RENDER_QUALITY_FLAGS: &str = "-pql";
const RENDER_RESOLUTION_DIR: &str = "480p15";

/// Handle to one provisioned ephemeral environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxHandle {
    /// Provider-assigned identifier
    pub id: String,
}

/// Outcome of one remote command
#[derive(Debug, Clone)]
pub struct ExecResult {
    /// Process exit code
    pub exit_code: i64,
    /// Captured combined output
    pub output: String,
}

/// Rendered video bytes plus where they came from
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Raw MP4 content
    pub bytes: Vec<u8>,
    /// Path inside the sandbox the bytes were read from
    pub source_path: String,
}

/// Seam over the sandbox provider's wire protocol.
///
/// The orchestrator and pipeline are tested against fakes of this trait.
#[async_trait]
pub trait SandboxProvider: Send + Sync {
    /// Request a new environment configured for the target runtime
    async fn provision(&self) -> Result<SandboxHandle>;

    /// Run a command, bounded by `timeout` on the remote side
    async fn exec(
        &self,
        handle: &SandboxHandle,
        command: &str,
        timeout: Duration,
    ) -> Result<ExecResult>;

    /// Write bytes to a file inside the environment
    async fn upload_file(&self, handle: &SandboxHandle, path: &str, bytes: Vec<u8>) -> Result<()>;

    /// Read a file's bytes out of the environment
    async fn download_file(&self, handle: &SandboxHandle, path: &str) -> Result<Vec<u8>>;

    /// Release the environment
    async fn destroy(&self, handle: &SandboxHandle) -> Result<()>;
}

/// Drives the full lifecycle of one ephemeral environment
pub struct SandboxOrchestrator {
    /// Provider seam
    provider: Arc<dyn SandboxProvider>,
    /// Upper bound for install and render commands
    exec_timeout: Duration,
}

impl SandboxOrchestrator {
    /// Create a new orchestrator over the given provider
    pub fn new(provider: Arc<dyn SandboxProvider>, exec_timeout: Duration) -> Self {
        SandboxOrchestrator {
            provider,
            exec_timeout,
        }
    }

    /// Provision a fresh environment
    pub async fn provision(&self) -> Result<SandboxHandle> {
        self.provider.provision().await
    }

    /// Install the rendering toolchain inside the environment
    pub async fn install_dependencies(&self, handle: &SandboxHandle) -> Result<ExecResult> {
        let result = self
            .provider
            .exec(handle, INSTALL_COMMAND, self.exec_timeout)
            .await?;

        if result.exit_code != 0 {
            return Err(Error::DependencyInstall(result.output));
        }
        Ok(result)
    }

    /// Upload the generated script into the working directory
    pub async fn upload_script(&self, handle: &SandboxHandle, script: &GeneratedScript) -> Result<()> {
        let path = format!("{}/{}", SANDBOX_HOME, script.filename);
        self.provider
            .upload_file(handle, &path, script.source.clone().into_bytes())
            .await
    }

    /// Render the uploaded script's scene
    pub async fn render(&self, handle: &SandboxHandle, script: &GeneratedScript) -> Result<ExecResult> {
        let command = format!(
            "manim {} {}/{} {}",
            RENDER_QUALITY_FLAGS, SANDBOX_HOME, script.filename, script.scene
        );
        let result = self.provider.exec(handle, &command, self.exec_timeout).await?;

        if result.exit_code != 0 {
            return Err(Error::Execution(result.output));
        }
        Ok(result)
    }

    /// Download the rendered video from its derived path
    pub async fn download_artifact(
        &self,
        handle: &SandboxHandle,
        script: &GeneratedScript,
    ) -> Result<Artifact> {
        let path = artifact_path(script);
        let bytes = self.provider.download_file(handle, &path).await?;
        Ok(Artifact {
            bytes,
            source_path: path,
        })
    }

    /// Arm a teardown guard for a provisioned handle.
    ///
    /// The guard releases the environment on every exit path: consumed
    /// normally via [`TeardownGuard::teardown`], or, if the owning future is
    /// dropped mid-run, by spawning the teardown onto the runtime from its
    /// `Drop` impl.
    pub fn guard(&self, handle: SandboxHandle) -> TeardownGuard {
        TeardownGuard {
            provider: self.provider.clone(),
            handle: Some(handle),
        }
    }
}

/// Releases one provisioned sandbox exactly once.
///
/// Holds the handle until either the explicit teardown runs or the guard is
/// dropped while still armed (the run future was cancelled).
pub struct TeardownGuard {
    /// Provider seam
    provider: Arc<dyn SandboxProvider>,
    /// Armed while `Some`; taken by whichever release path runs first
    handle: Option<SandboxHandle>,
}

impl TeardownGuard {
    /// Destroy the sandbox now, consuming the guard.
    ///
    /// Never returns an error: a failed teardown must not mask an earlier
    /// failure nor turn a delivered artifact into an error response.
    pub async fn teardown(mut self) {
        if let Some(handle) = self.handle.take() {
            destroy_logged(self.provider.clone(), handle).await;
        }
    }
}

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        // The owning future was dropped before teardown ran. Spawn the
        // release so the environment is still destroyed.
        let provider = self.provider.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(rt) => {
                rt.spawn(async move {
                    destroy_logged(provider, handle).await;
                });
            }
            Err(_) => {
                warn!(sandbox_id = %handle.id, "No runtime available, sandbox not destroyed");
            }
        }
    }
}

/// Destroy a sandbox, recovering from teardown failure locally.
async fn destroy_logged(provider: Arc<dyn SandboxProvider>, handle: SandboxHandle) {
    match provider.destroy(&handle).await {
        Ok(()) => info!(sandbox_id = %handle.id, "Sandbox destroyed"),
        Err(e) => warn!(sandbox_id = %handle.id, error = %e, "Sandbox teardown failed"),
    }
}

/// Derive the path Manim writes the rendered scene to.
///
/// Manim places output under `media/videos/<script stem>/<resolution>/` next
/// to the working directory. The path is a convention of the tool, not a
/// value the render step reports; this function is the single place that
/// encodes it.
fn artifact_path(script: &GeneratedScript) -> String {
    format!(
        "{}/media/videos/{}/{}/{}.mp4",
        SANDBOX_HOME,
        script.file_stem(),
        RENDER_RESOLUTION_DIR,
        script.scene
    )
}
