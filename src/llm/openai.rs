//! OpenAI Responses API backend.

use super::{check_status, map_send_error, LlmError, ReasoningBackend, ReasoningRequest};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Client for `POST {api_url}/responses`.
pub struct OpenAiBackend {
    http_client: reqwest::Client,
    api_url: String,
    api_key: String,
    temperature: Option<f32>,
    timeout_seconds: u64,
}

#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ToolSpec {
    #[serde(rename = "type")]
    tool_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ResponsesResponse {
    #[serde(default)]
    output_text: Option<String>,
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl ResponsesResponse {
    /// Concatenated text of every `output_text` part of every message item.
    fn output_text(self) -> String {
        if let Some(text) = self.output_text {
            return text;
        }

        self.output
            .into_iter()
            .filter(|item| item.kind == "message")
            .flat_map(|item| item.content)
            .filter(|part| part.kind == "output_text")
            .filter_map(|part| part.text)
            .collect()
    }
}

impl OpenAiBackend {
    pub fn new(
        http_client: reqwest::Client,
        api_url: String,
        api_key: String,
        temperature: Option<f32>,
        timeout_seconds: u64,
    ) -> Self {
        Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            temperature,
            timeout_seconds,
        }
    }

    fn build_body<'a>(&self, request: &'a ReasoningRequest) -> ResponsesRequest<'a> {
        let tools = if request.web_search {
            vec![ToolSpec {
                tool_type: "web_search_preview",
            }]
        } else {
            vec![]
        };

        ResponsesRequest {
            model: &request.model,
            input: &request.prompt,
            instructions: request.system.as_deref(),
            tools,
            temperature: self.temperature,
        }
    }
}

#[async_trait]
impl ReasoningBackend for OpenAiBackend {
    async fn complete(&self, request: &ReasoningRequest) -> Result<String, LlmError> {
        let url = format!("{}/responses", self.api_url);
        let body = self.build_body(request);

        debug!(
            "Sending responses request to {} (model {}, {} prompt bytes, web_search={})",
            url,
            request.model,
            request.prompt.len(),
            request.web_search
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_send_error(e, &self.api_url, self.timeout_seconds))?;

        let response = check_status(response).await?;

        let parsed: ResponsesResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        Ok(parsed.output_text())
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
