//! Analysis invoker: asks the security-review agent to find the vulnerability.

use crate::agent::fanout::{bounded_join, collect_all, collect_isolated, ItemError};
use crate::llm::{ReasoningRequest, SharedBackend};
use crate::models::{AgentResult, ItemOutcome, Problem};
use tracing::{debug, info};

/// Configuration for the invoker.
#[derive(Debug, Clone)]
pub struct InvokerConfig {
    /// Model that plays the security reviewer.
    pub model: String,
    /// Allow the reviewer to search the web.
    pub web_search: bool,
    /// Maximum requests in flight per batch.
    pub concurrency: usize,
    /// Optional system instructions sent with every request.
    pub system_prompt: Option<String>,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4.1".to_string(),
            web_search: true,
            concurrency: 8,
            system_prompt: None,
        }
    }
}

/// Sends code samples to the reasoning backend and collects its findings.
pub struct AnalysisInvoker {
    backend: SharedBackend,
    config: InvokerConfig,
}

impl AnalysisInvoker {
    pub fn new(backend: SharedBackend, config: InvokerConfig) -> Self {
        info!(
            "Analysis agent: model {} via {} (web search: {})",
            config.model,
            backend.name(),
            config.web_search
        );
        Self { backend, config }
    }

    /// Build the instruction sent with each code sample.
    pub fn build_prompt(code_text: &str) -> String {
        format!("{}\n\n{}", ANALYSIS_INSTRUCTION, code_text)
    }

    /// Analyze one problem. The expected finding is copied through unchanged.
    pub async fn analyze(&self, problem: &Problem) -> Result<AgentResult, ItemError> {
        let mut request =
            ReasoningRequest::new(&self.config.model, Self::build_prompt(&problem.code_text))
                .with_web_search(self.config.web_search);
        if let Some(ref system) = self.config.system_prompt {
            request = request.with_system(system.as_str());
        }

        debug!(
            "Analyzing problem {} ({} bytes of code)",
            problem.id,
            problem.code_text.len()
        );

        let claimed_finding = self
            .backend
            .complete(&request)
            .await
            .map_err(|source| ItemError {
                problem_id: problem.id,
                source,
            })?;

        Ok(AgentResult {
            problem_id: problem.id,
            claimed_finding,
            expected_finding: problem.expected_finding.clone(),
        })
    }

    /// Analyze every problem concurrently; any failure fails the batch.
    pub async fn analyze_batch(&self, problems: &[Problem]) -> Result<Vec<AgentResult>, ItemError> {
        collect_all(self.dispatch(problems).await)
    }

    /// Analyze every problem concurrently, keeping failures per item.
    pub async fn analyze_batch_isolated(&self, problems: &[Problem]) -> Vec<ItemOutcome<AgentResult>> {
        collect_isolated(self.dispatch(problems).await)
    }

    async fn dispatch(&self, problems: &[Problem]) -> Vec<Result<AgentResult, ItemError>> {
        info!("Dispatching {} analysis requests", problems.len());
        bounded_join(problems, self.config.concurrency, |problem| self.analyze(problem)).await
    }
}

/// Instruction prepended to every code sample.
const ANALYSIS_INSTRUCTION: &str =
    "read through this codebase and find the security vulnerability. Code:";
