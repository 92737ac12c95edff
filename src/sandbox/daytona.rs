//! Daytona sandbox provider client
//!
//! REST client for provisioning, driving, and destroying ephemeral sandboxes.
//! Transport-level failures are reported as provisioning failures: if the
//! provider API is unreachable the environment is unusable regardless of
//! which operation was in flight.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SandboxProviderConfig;
use crate::error::{Error, Result};
use crate::sandbox::{ExecResult, SandboxHandle, SandboxProvider};

/// Extra wall-clock allowance over the remote command timeout, so the remote
/// side times out first and we still receive its captured output.
const REQUEST_TIMEOUT_MARGIN: Duration = Duration::from_secs(15);

/// Daytona API client
#[derive(Clone)]
pub struct DaytonaClient {
    /// HTTP client
    client: Client,
    /// Configuration
    config: SandboxProviderConfig,
}

impl DaytonaClient {
    /// Create a new Daytona client
    pub fn new(config: SandboxProviderConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();

        let mut auth_value = header::HeaderValue::from_str(&format!(
            "Bearer {}",
            config.api_key.expose_secret()
        ))
        .map_err(|e| Error::Config(format!("Invalid API key format: {}", e)))?;
        auth_value.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth_value);

        let client = Client::builder().default_headers(headers).build()?;

        Ok(DaytonaClient { client, config })
    }
}

// ---- Wire types ----

#[derive(Debug, Serialize)]
struct CreateSandboxRequest {
    language: String,
}

#[derive(Debug, Deserialize)]
struct CreateSandboxResponse {
    id: String,
}

#[derive(Debug, Serialize)]
struct ExecuteRequest {
    command: String,
    /// Remote-side timeout in seconds
    timeout: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteResponse {
    exit_code: i64,
    #[serde(default)]
    result: String,
}

#[async_trait]
impl SandboxProvider for DaytonaClient {
    async fn provision(&self) -> Result<SandboxHandle> {
        let url = format!("{}/sandbox", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .json(&CreateSandboxRequest {
                language: "python".to_string(),
            })
            .send()
            .await
            .map_err(|e| Error::SandboxProvisioning(format!("create request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::SandboxProvisioning(format!(
                "API returned {}: {}",
                status, body
            )));
        }

        let body: CreateSandboxResponse = response
            .json()
            .await
            .map_err(|e| Error::SandboxProvisioning(format!("invalid response body: {}", e)))?;

        debug!(sandbox_id = %body.id, "Provisioned sandbox");
        Ok(SandboxHandle { id: body.id })
    }

    async fn exec(
        &self,
        handle: &SandboxHandle,
        command: &str,
        timeout: Duration,
    ) -> Result<ExecResult> {
        let url = format!(
            "{}/toolbox/{}/process/execute",
            self.config.base_url, handle.id
        );

        debug!(sandbox_id = %handle.id, %command, "Executing command");

        let response = self
            .client
            .post(&url)
            .timeout(timeout + REQUEST_TIMEOUT_MARGIN)
            .json(&ExecuteRequest {
                command: command.to_string(),
                timeout: timeout.as_secs(),
            })
            .send()
            .await
            .map_err(|e| Error::SandboxProvisioning(format!("exec request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::SandboxProvisioning(format!(
                "exec API returned {}: {}",
                status, body
            )));
        }

        let body: ExecuteResponse = response
            .json()
            .await
            .map_err(|e| Error::SandboxProvisioning(format!("invalid exec response: {}", e)))?;

        Ok(ExecResult {
            exit_code: body.exit_code,
            output: body.result,
        })
    }

    async fn upload_file(&self, handle: &SandboxHandle, path: &str, bytes: Vec<u8>) -> Result<()> {
        let url = format!("{}/toolbox/{}/files/upload", self.config.base_url, handle.id);

        let response = self
            .client
            .post(&url)
            .query(&[("path", path)])
            .body(bytes)
            .send()
            .await
            .map_err(|e| Error::SandboxProvisioning(format!("upload request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::SandboxProvisioning(format!(
                "upload API returned {}: {}",
                status, body
            )));
        }

        debug!(sandbox_id = %handle.id, %path, "Uploaded file");
        Ok(())
    }

    async fn download_file(&self, handle: &SandboxHandle, path: &str) -> Result<Vec<u8>> {
        let url = format!(
            "{}/toolbox/{}/files/download",
            self.config.base_url, handle.id
        );

        let response = self
            .client
            .get(&url)
            .query(&[("path", path)])
            .send()
            .await
            .map_err(|e| Error::ArtifactNotFound(format!("download request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::ArtifactNotFound(path.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ArtifactNotFound(format!(
                "download API returned {}: {}",
                status, body
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::ArtifactNotFound(format!("download body failed: {}", e)))?;

        debug!(sandbox_id = %handle.id, %path, bytes = bytes.len(), "Downloaded file");
        Ok(bytes.to_vec())
    }

    async fn destroy(&self, handle: &SandboxHandle) -> Result<()> {
        let url = format!("{}/sandbox/{}", self.config.base_url, handle.id);

        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|e| Error::Cleanup(format!("delete request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Cleanup(format!(
                "delete API returned {}: {}",
                status, body
            )));
        }

        debug!(sandbox_id = %handle.id, "Destroyed sandbox");
        Ok(())
    }
}
