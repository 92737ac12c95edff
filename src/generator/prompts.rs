//! Prompt templates for script synthesis

use handlebars::Handlebars;
use serde::Serialize;

use crate::error::{Error, Result};

/// Name of the single Manim scene every generated script must define.
///
/// The render command and the artifact path both reference this name, so it
/// is fixed rather than model-chosen.
pub const SCENE_NAME: &str = "EquationExplanation";

/// Template for the script-synthesis prompt.
///
/// The instructions pin down the video structure so the model output is
/// renderable without post-editing: full equation first, per-term highlights
/// with their explanation text, full equation again, one named scene.
const SCRIPT_PROMPT: &str = r#"Create a Python script for Manim Community Edition that generates a video based on the following mathematical equation and explanations.

**Equation (LaTeX):**
{{equation}}

**Explanations:**
{{explanations}}

**Instructions:**
1. The video should start by displaying the full equation.
2. Then, for each variable or term mentioned in the explanations, highlight it in the equation while displaying the corresponding explanation text on the screen.
3. The final scene should show the complete, non-highlighted equation again.
4. The script should define a single Manim scene named '{{scene}}'.
5. Ensure the script is self-contained and ready to be executed by `manim`.
"#;

/// A prompt template using Handlebars syntax
pub struct PromptTemplate {
    /// Template name
    name: String,
    /// Handlebars registry
    registry: Handlebars<'static>,
}

impl PromptTemplate {
    /// Create a new prompt template
    pub fn new(name: impl Into<String>, template: &str) -> Result<Self> {
        let name = name.into();
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);

        registry
            .register_template_string(&name, template)
            .map_err(|e| Error::Internal(format!("Invalid template: {}", e)))?;

        Ok(PromptTemplate { name, registry })
    }

    /// Render the template with given data
    pub fn render<T: Serialize>(&self, data: &T) -> Result<String> {
        self.registry
            .render(&self.name, data)
            .map_err(|e| Error::Internal(format!("Template render error: {}", e)))
    }
}

/// Data for the script-synthesis prompt
#[derive(Serialize)]
struct ScriptPromptData<'a> {
    equation: &'a str,
    explanations: &'a str,
    scene: &'a str,
}

/// Render the script-synthesis prompt for one request.
pub fn script_prompt(equation: &str, explanations: &str) -> Result<String> {
    let template = PromptTemplate::new("script", SCRIPT_PROMPT)?;
    template.render(&ScriptPromptData {
        equation,
        explanations,
        scene: SCENE_NAME,
    })
}
