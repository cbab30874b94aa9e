//! Reasoning backends.
//!
//! The analysis agent and the judge both talk to an external LLM through
//! the [`ReasoningBackend`] trait. One backend (and one HTTP client) is
//! built at startup and handed to every stage that needs it.

pub mod ollama;
pub mod openai;

pub use ollama::OllamaBackend;
pub use openai::OpenAiBackend;

use crate::config::ModelConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Errors returned by a reasoning backend.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API key not found: set the {0} environment variable")]
    MissingApiKey(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Cannot connect to {0}")]
    Connect(String),

    #[error("Failed to send request: {0}")]
    Request(String),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    InvalidResponse(String),
}

/// Which provider answers the requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// OpenAI Responses API (supports web search)
    #[default]
    Openai,
    /// Local Ollama chat API
    Ollama,
}

/// A single free-text request to the reasoning capability.
#[derive(Debug, Clone, PartialEq)]
pub struct ReasoningRequest {
    /// Model identifier.
    pub model: String,
    /// User prompt.
    pub prompt: String,
    /// Optional system instructions.
    pub system: Option<String>,
    /// Let the model search the web while answering.
    pub web_search: bool,
}

impl ReasoningRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            web_search: false,
        }
    }

    pub fn with_web_search(mut self, enabled: bool) -> Self {
        self.web_search = enabled;
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// An external capability that answers a prompt with free text.
#[async_trait]
pub trait ReasoningBackend: Send + Sync {
    /// Send one request and return the model's text output.
    async fn complete(&self, request: &ReasoningRequest) -> Result<String, LlmError>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Shared handle passed to the invoker and the judge.
pub type SharedBackend = Arc<dyn ReasoningBackend>;

/// Build the configured backend with a single shared HTTP client.
pub fn build_backend(config: &ModelConfig) -> Result<SharedBackend, LlmError> {
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .build()
        .map_err(|e| LlmError::Client(e.to_string()))?;

    info!(
        "Using {:?} backend at {} (timeout {}s)",
        config.provider,
        config.api_url(),
        config.timeout_seconds
    );

    let backend: SharedBackend = match config.provider {
        Provider::Openai => {
            let api_key = std::env::var(&config.api_key_env)
                .map_err(|_| LlmError::MissingApiKey(config.api_key_env.clone()))?;
            Arc::new(OpenAiBackend::new(
                http_client,
                config.api_url().to_string(),
                api_key,
                config.temperature,
                config.timeout_seconds,
            ))
        }
        Provider::Ollama => Arc::new(OllamaBackend::new(
            http_client,
            config.api_url().to_string(),
            config.temperature,
            config.timeout_seconds,
        )),
    };

    Ok(backend)
}

/// Translate a transport error into an [`LlmError`].
pub(crate) fn map_send_error(e: reqwest::Error, url: &str, timeout_seconds: u64) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout(timeout_seconds)
    } else if e.is_connect() {
        LlmError::Connect(url.to_string())
    } else {
        LlmError::Request(e.to_string())
    }
}

/// Turn a non-success HTTP response into an [`LlmError::Api`].
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(LlmError::Api { status, body })
}

#[cfg(test)]
pub mod testing {
    //! In-memory backend for tests.

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    type Responder = dyn Fn(&ReasoningRequest) -> Result<String, LlmError> + Send + Sync;
    type Delay = dyn Fn(&ReasoningRequest) -> Duration + Send + Sync;

    /// Answers each request with a closure, recording what it saw.
    pub struct ScriptedBackend {
        responder: Box<Responder>,
        delay: Option<Box<Delay>>,
        pub requests: Mutex<Vec<ReasoningRequest>>,
        in_flight: AtomicUsize,
        pub max_in_flight: AtomicUsize,
    }

    impl ScriptedBackend {
        pub fn new(
            responder: impl Fn(&ReasoningRequest) -> Result<String, LlmError> + Send + Sync + 'static,
        ) -> Self {
            Self {
                responder: Box::new(responder),
                delay: None,
                requests: Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }

        /// Always answer with the same text.
        pub fn constant(text: &str) -> Self {
            let text = text.to_string();
            Self::new(move |_| Ok(text.clone()))
        }

        pub fn with_delay(
            mut self,
            delay: impl Fn(&ReasoningRequest) -> Duration + Send + Sync + 'static,
        ) -> Self {
            self.delay = Some(Box::new(delay));
            self
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ReasoningBackend for ScriptedBackend {
        async fn complete(&self, request: &ReasoningRequest) -> Result<String, LlmError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());

            if let Some(delay) = &self.delay {
                tokio::time::sleep(delay(request)).await;
            }

            let answer = (self.responder)(request);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            answer
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }
}
