//! Gemini API client
//!
//! Thin wrapper over the `generateContent` endpoint. One call per pipeline
//! run, no retries, no streaming.

use async_trait::async_trait;
use reqwest::{header, Client};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ModelConfig;
use crate::error::{Error, Result};

/// Text-in/text-out seam for the generative model.
///
/// The pipeline only needs a single completion per run; keeping the seam this
/// narrow lets tests substitute a canned model.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for a single prompt
    async fn generate_content(&self, prompt: &str) -> Result<String>;
}

/// Gemini API client
#[derive(Clone)]
pub struct GeminiClient {
    /// HTTP client
    client: Client,
    /// Configuration
    config: ModelConfig,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(config: ModelConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();

        let mut key_value = header::HeaderValue::from_str(config.api_key.expose_secret())
            .map_err(|e| Error::Config(format!("Invalid API key format: {}", e)))?;
        key_value.set_sensitive(true);
        headers.insert("x-goog-api-key", key_value);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(GeminiClient { client, config })
    }

    /// Get the configured model identifier
    pub fn model(&self) -> &str {
        &self.config.model
    }
}

// ---- Wire types ----

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<ContentPayload>,
}

#[derive(Debug, Serialize)]
struct ContentPayload {
    parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
struct TextPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate_content(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url, self.config.model
        );

        debug!(model = %self.config.model, "Sending generateContent request");

        let request = GenerateContentRequest {
            contents: vec![ContentPayload {
                parts: vec![TextPart {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::ModelGeneration(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ModelGeneration(format!(
                "API returned {}: {}",
                status, body
            )));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| Error::ModelGeneration(format!("invalid response body: {}", e)))?;

        let text: String = body
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(Error::ModelGeneration(
                "response contained no candidates".to_string(),
            ));
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn test_config(base_url: String) -> ModelConfig {
        ModelConfig {
            api_key: SecretString::from("test-key".to_string()),
            base_url,
            ..Default::default()
        }
    }

    #[test]
    fn test_client_rejects_unprintable_key() {
        let mut config = test_config("http://localhost".to_string());
        config.api_key = SecretString::from("bad\nkey".to_string());
        assert!(GeminiClient::new(config).is_err());
    }

    #[tokio::test]
    async fn test_generate_content_extracts_candidate_text() {
        use wiremock::matchers::{header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-1.5-flash:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "from manim import *" }] }
                }]
            })))
            .mount(&server)
            .await;

        let client = GeminiClient::new(test_config(server.uri())).unwrap();
        let text = client.generate_content("write a script").await.unwrap();
        assert_eq!(text, "from manim import *");
    }

    #[tokio::test]
    async fn test_generate_content_empty_candidates_is_error() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-1.5-flash:generateContent"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "candidates": [] })),
            )
            .mount(&server)
            .await;

        let client = GeminiClient::new(test_config(server.uri())).unwrap();
        let err = client.generate_content("prompt").await.unwrap_err();
        assert!(matches!(err, Error::ModelGeneration(_)));
    }

    #[tokio::test]
    async fn test_generate_content_api_error_is_surfaced() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-1.5-flash:generateContent"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let client = GeminiClient::new(test_config(server.uri())).unwrap();
        let err = client.generate_content("prompt").await.unwrap_err();
        assert!(err.to_string().contains("429"));
    }
}
