use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Deserialize;

use persona_common::{define_module_client, ModuleClient};
use persona_pipeline::{GenerationBackend, WorkflowGraph, DEFAULT_SUBMIT_TIMEOUT_MS};

define_module_client! {
    (struct ComfyClient, "comfyui")
    client_type: Client,
    env: ["COMFYUI_API_URL"],
    setup: async {
        Client::builder()
            .timeout(Duration::from_millis(DEFAULT_SUBMIT_TIMEOUT_MS))
            .build()
            .expect("Failed to build the ComfyUI HTTP client")
    }
}

#[derive(Debug, Deserialize)]
struct QueuePromptResponse {
    prompt_id: Option<String>,
}

impl ComfyClient {
    fn api_url(&self) -> String {
        std::env::var("COMFYUI_API_URL").expect("COMFYUI_API_URL is not set")
    }

    /// Queue a workflow via `POST /prompt`. Success requires a well-formed
    /// `prompt_id` in the response; anything else surfaces with the raw
    /// response body attached.
    pub async fn queue_prompt(&self, workflow: &serde_json::Value) -> Result<String> {
        let client_id = uuid::Uuid::new_v4().to_string();
        let body = serde_json::json!({
            "prompt": workflow,
            "client_id": client_id,
        });

        let response = self
            .get_client()
            .post(format!("{}/prompt", self.api_url()))
            .json(&body)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to reach ComfyUI /prompt: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!("ComfyUI rejected the workflow with status {}: {}", status, text));
        }

        let parsed: QueuePromptResponse = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse ComfyUI /prompt response: {}", e))?;

        parsed
            .prompt_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| anyhow!("ComfyUI response did not contain a prompt_id"))
    }

    /// Existence check for a finished output via `GET /view`. A 404 means
    /// not finished yet, not an error.
    pub async fn probe_output(&self, filename: &str) -> Result<bool> {
        let response = self
            .get_client()
            .get(format!("{}/view", self.api_url()))
            .query(&[("filename", filename), ("type", "output")])
            .send()
            .await
            .map_err(|e| anyhow!("Failed to reach ComfyUI /view: {}", e))?;

        match response.status() {
            status if status.is_success() => Ok(true),
            reqwest::StatusCode::NOT_FOUND => Ok(false),
            status => Err(anyhow!("ComfyUI /view returned status {} for {}", status, filename)),
        }
    }

    /// Download a finished output's bytes via `GET /view`.
    pub async fn download_output(&self, filename: &str) -> Result<Vec<u8>> {
        let response = self
            .get_client()
            .get(format!("{}/view", self.api_url()))
            .query(&[("filename", filename), ("type", "output")])
            .send()
            .await
            .map_err(|e| anyhow!("Failed to reach ComfyUI /view: {}", e))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "ComfyUI /view returned status {} for {}",
                response.status(),
                filename
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| anyhow!("Failed to read output bytes: {}", e))?;
        Ok(bytes.to_vec())
    }

    /// Side-effect-free connectivity probe against `GET /system_stats`.
    pub async fn system_stats_ok(&self) -> bool {
        match self
            .get_client()
            .get(format!("{}/system_stats", self.api_url()))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::warn!("[ComfyClient::system_stats_ok] probe failed: {}", e);
                false
            }
        }
    }
}

#[async_trait::async_trait]
impl GenerationBackend for ComfyClient {
    async fn submit_graph(&self, graph: &WorkflowGraph) -> Result<String> {
        self.queue_prompt(&graph.to_json()).await
    }

    async fn output_exists(&self, filename: &str) -> Result<bool> {
        self.probe_output(filename).await
    }

    async fn fetch_output(&self, filename: &str) -> Result<Vec<u8>> {
        self.download_output(filename).await
    }

    async fn healthy(&self) -> bool {
        self.system_stats_ok().await
    }
}
