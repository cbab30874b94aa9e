//! Ollama chat API backend.

use super::{check_status, map_send_error, LlmError, ReasoningBackend, ReasoningRequest};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Client for `POST {api_url}/api/chat` (non-streaming).
pub struct OllamaBackend {
    http_client: reqwest::Client,
    api_url: String,
    temperature: Option<f32>,
    timeout_seconds: u64,
}

/// Message in the chat history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ChatMessage,
}

impl OllamaBackend {
    pub fn new(
        http_client: reqwest::Client,
        api_url: String,
        temperature: Option<f32>,
        timeout_seconds: u64,
    ) -> Self {
        Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
            temperature,
            timeout_seconds,
        }
    }

    fn build_body(&self, request: &ReasoningRequest) -> OllamaChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });

        OllamaChatRequest {
            model: request.model.clone(),
            messages,
            stream: false,
            options: self
                .temperature
                .map(|temperature| OllamaOptions { temperature }),
        }
    }
}

#[async_trait]
impl ReasoningBackend for OllamaBackend {
    async fn complete(&self, request: &ReasoningRequest) -> Result<String, LlmError> {
        let url = format!("{}/api/chat", self.api_url);

        if request.web_search {
            debug!("Ollama has no web search tool; sending plain chat request");
        }

        let body = self.build_body(request);
        debug!("Sending chat request to {} (model {})", url, request.model);

        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_send_error(e, &self.api_url, self.timeout_seconds))?;

        let response = check_status(response).await?;

        let chat_response: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        Ok(chat_response.message.content)
    }

    fn name(&self) -> &'static str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_with_system_prompt() {
        let backend = OllamaBackend::new(
            reqwest::Client::new(),
            "http://localhost:11434".to_string(),
            Some(0.1),
            30,
        );
        let request = ReasoningRequest::new("llama3.2:latest", "find it").with_system("auditor");
        let body = serde_json::to_value(backend.build_body(&request)).unwrap();

        assert_eq!(body["model"], "llama3.2:latest");
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "find it");
        assert!((body["options"]["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_body_without_temperature() {
        let backend = OllamaBackend::new(
            reqwest::Client::new(),
            "http://localhost:11434/".to_string(),
            None,
            30,
        );
        let body = serde_json::to_value(backend.build_body(&ReasoningRequest::new("m", "p"))).unwrap();

        assert_eq!(backend.api_url, "http://localhost:11434");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert!(body.get("options").is_none());
    }

    #[test]
    fn test_parse_chat_response() {
        let raw = r#"{"model":"m","message":{"role":"assistant","content":"score: 6"},"done":true}"#;
        let parsed: OllamaChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.message.content, "score: 6");
    }
}
