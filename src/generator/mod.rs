//! Animation script synthesis
//!
//! Turns an equation and its explanations into an executable Manim script by
//! prompting a generative model once and extracting the code from its reply.

mod client;
mod prompts;

pub use client::{GeminiClient, TextGenerator};
pub use prompts::SCENE_NAME;

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};

/// A synthesized animation script, ready for upload into a sandbox
#[derive(Debug, Clone)]
pub struct GeneratedScript {
    /// Python source text
    pub source: String,
    /// Per-run unique filename, e.g. `manim_script_<uuid>.py`
    pub filename: String,
    /// Scene the render command targets
    pub scene: String,
}

impl GeneratedScript {
    /// Filename without the `.py` extension.
    ///
    /// Manim names its media output directory after this stem.
    pub fn file_stem(&self) -> &str {
        self.filename
            .strip_suffix(".py")
            .unwrap_or(&self.filename)
    }
}

/// Synthesizes animation scripts via a generative model
pub struct ScriptGenerator {
    /// Model seam; injected so tests can use a canned generator
    model: Arc<dyn TextGenerator>,
}

impl ScriptGenerator {
    /// Create a new script generator backed by the given model
    pub fn new(model: Arc<dyn TextGenerator>) -> Self {
        ScriptGenerator { model }
    }

    /// Generate a Manim script for the given equation and explanations.
    ///
    /// One model call, no retry. The returned script carries a filename
    /// unique to this run so reused environments never collide.
    pub async fn generate(&self, equation: &str, explanations: &str) -> Result<GeneratedScript> {
        let prompt = prompts::script_prompt(equation, explanations)?;
        let response = self.model.generate_content(&prompt).await?;

        let source = extract_code(&response).ok_or_else(|| {
            Error::ModelGeneration("response contained no extractable code".to_string())
        })?;

        let filename = format!("manim_script_{}.py", Uuid::new_v4());
        debug!(%filename, bytes = source.len(), "Generated animation script");

        Ok(GeneratedScript {
            source,
            filename,
            scene: SCENE_NAME.to_string(),
        })
    }
}

/// Extract source code from a model reply, stripping markdown fences.
///
/// Returns `None` when nothing remains after stripping.
fn extract_code(response: &str) -> Option<String> {
    let cleaned = response.replace("```python", "").replace("```", "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}
