//! Pipeline controller
//!
//! Sequences script generation and the sandbox lifecycle for one request.
//! Stages run strictly in order, the first failure short-circuits the rest,
//! and a provisioned sandbox is destroyed exactly once on every exit path.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::error::Result;
use crate::generator::{GeneratedScript, ScriptGenerator, TextGenerator};
use crate::sandbox::{Artifact, SandboxHandle, SandboxOrchestrator, SandboxProvider};

/// One caller request: the equation and what to say about it
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationRequest {
    /// Equation in LaTeX
    #[serde(default)]
    pub latex: String,
    /// Natural-language explanations of its variables and terms
    #[serde(default)]
    pub explanations: String,
}

/// Stage of one pipeline run, used for structured logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    GeneratingScript,
    Provisioning,
    InstallingDeps,
    Uploading,
    Rendering,
    Downloading,
    Destroying,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineStage::GeneratingScript => write!(f, "generating_script"),
            PipelineStage::Provisioning => write!(f, "provisioning"),
            PipelineStage::InstallingDeps => write!(f, "installing_deps"),
            PipelineStage::Uploading => write!(f, "uploading"),
            PipelineStage::Rendering => write!(f, "rendering"),
            PipelineStage::Downloading => write!(f, "downloading"),
            PipelineStage::Destroying => write!(f, "destroying"),
        }
    }
}

/// Runs one request end to end
pub struct Pipeline {
    /// Script synthesis
    generator: ScriptGenerator,
    /// Sandbox lifecycle
    sandbox: SandboxOrchestrator,
}

impl Pipeline {
    /// Create a pipeline over the given model and sandbox provider
    pub fn new(
        model: Arc<dyn TextGenerator>,
        provider: Arc<dyn SandboxProvider>,
        exec_timeout: Duration,
    ) -> Self {
        Pipeline {
            generator: ScriptGenerator::new(model),
            sandbox: SandboxOrchestrator::new(provider, exec_timeout),
        }
    }

    /// Run the full pipeline for one request.
    ///
    /// The sandbox is destroyed exactly once if and only if provisioning
    /// succeeded, regardless of which later stage failed — including when
    /// this future is dropped before finishing (caller disconnect). Teardown
    /// failure never changes the reported outcome.
    pub async fn run(&self, request: &GenerationRequest) -> Result<Artifact> {
        info!(stage = %PipelineStage::GeneratingScript, "Synthesizing animation script");
        let script = self
            .generator
            .generate(&request.latex, &request.explanations)
            .await?;

        info!(stage = %PipelineStage::Provisioning, "Provisioning sandbox");
        let handle = self.sandbox.provision().await?;

        // From here on the handle must be released no matter what happens,
        // including this future being dropped mid-run: the guard spawns the
        // teardown if it is still armed when it goes out of scope.
        let guard = self.sandbox.guard(handle.clone());

        let outcome = self.run_provisioned(&handle, &script).await;

        info!(stage = %PipelineStage::Destroying, sandbox_id = %handle.id, "Releasing sandbox");
        guard.teardown().await;

        outcome
    }

    /// Stages that run while a sandbox is held
    async fn run_provisioned(
        &self,
        handle: &SandboxHandle,
        script: &GeneratedScript,
    ) -> Result<Artifact> {
        info!(stage = %PipelineStage::InstallingDeps, sandbox_id = %handle.id, "Installing dependencies");
        self.sandbox.install_dependencies(handle).await?;

        info!(stage = %PipelineStage::Uploading, filename = %script.filename, "Uploading script");
        self.sandbox.upload_script(handle, script).await?;

        info!(stage = %PipelineStage::Rendering, scene = %script.scene, "Rendering scene");
        self.sandbox.render(handle, script).await?;

        info!(stage = %PipelineStage::Downloading, "Downloading artifact");
        self.sandbox.download_artifact(handle, script).await
    }
}
