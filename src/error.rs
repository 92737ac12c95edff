//! Error types for MathMotion

use thiserror::Error;

/// Result type alias using MathMotion's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for MathMotion
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Required credential or setting is absent
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generative model call failed or returned no usable script
    #[error("Model generation failed: {0}")]
    ModelGeneration(String),

    /// Sandbox could not be provisioned or prepared
    #[error("Sandbox provisioning failed: {0}")]
    SandboxProvisioning(String),

    /// Dependency installation inside the sandbox failed
    #[error("Failed to install Manim: {0}")]
    DependencyInstall(String),

    /// Rendering command inside the sandbox failed
    #[error("Manim rendering failed: {0}")]
    Execution(String),

    /// Rendered artifact was not found at the expected path
    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    /// Sandbox teardown failed (recovered locally, never surfaced)
    #[error("Cleanup failed: {0}")]
    Cleanup(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Check if error is a client error (user's fault)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput(_) | Error::MissingConfiguration(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(Error::InvalidInput("missing field".into()).is_client_error());
        assert!(Error::MissingConfiguration("GEMINI_API_KEY".into()).is_client_error());
        assert!(!Error::ModelGeneration("empty response".into()).is_client_error());
        assert!(!Error::SandboxProvisioning("quota".into()).is_client_error());
        assert!(!Error::Execution("exit 1".into()).is_client_error());
    }

    #[test]
    fn test_error_messages_carry_detail() {
        let err = Error::DependencyInstall("pip exited with code 1".into());
        assert!(err.to_string().contains("pip exited with code 1"));

        let err = Error::ArtifactNotFound("/home/daytona/media/out.mp4".into());
        assert!(err.to_string().contains("out.mp4"));
    }
}
