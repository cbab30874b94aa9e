//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.shieldbench.toml` files.

use crate::cli::{Args, Command};
use crate::llm::Provider;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".shieldbench.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Repository scan settings.
    #[serde(default)]
    pub scan: ScanSection,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Maximum reasoning requests in flight per batch.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Problems per pipeline chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Directory for pipeline logs.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Directory for scan reports when no output path is given.
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,

    /// Record failed requests per problem instead of aborting the run.
    #[serde(default)]
    pub isolate_failures: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            chunk_size: default_chunk_size(),
            log_dir: default_log_dir(),
            reports_dir: default_reports_dir(),
            isolate_failures: false,
        }
    }
}

fn default_concurrency() -> usize {
    8
}

fn default_chunk_size() -> usize {
    10
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from("reports")
}

/// LLM model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Which API serves the requests.
    #[serde(default)]
    pub provider: Provider,

    /// Model playing the security reviewer.
    #[serde(default = "default_model")]
    pub name: String,

    /// Model grading the answers.
    #[serde(default = "default_model")]
    pub judge_name: String,

    /// API base URL. Defaults per provider when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Sampling temperature. Provider default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Let the reviewer search the web.
    #[serde(default = "default_true")]
    pub web_search: bool,

    /// System instructions for the reviewer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            name: default_model(),
            judge_name: default_model(),
            api_url: None,
            api_key_env: default_api_key_env(),
            temperature: None,
            timeout_seconds: default_timeout(),
            web_search: true,
            system_prompt: None,
        }
    }
}

impl ModelConfig {
    /// The configured API URL, or the provider's usual endpoint.
    pub fn api_url(&self) -> &str {
        match (&self.api_url, self.provider) {
            (Some(url), _) => url,
            (None, Provider::Openai) => "https://api.openai.com/v1",
            (None, Provider::Ollama) => "http://localhost:11434",
        }
    }
}

fn default_model() -> String {
    "gpt-4.1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_timeout() -> u64 {
    600
}

fn default_true() -> bool {
    true
}

/// How a cloned repository becomes a single document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ConverterKind {
    /// External `code2prompt` tool
    #[default]
    Code2prompt,
    /// Built-in file scanner
    Builtin,
}

/// Repository scan settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSection {
    /// Fixed directory the repository is cloned into.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Intermediate document produced by the converter.
    #[serde(default = "default_document")]
    pub document: PathBuf,

    /// Converter used to flatten the repository.
    #[serde(default)]
    pub converter: ConverterKind,

    /// Program run for the external converter.
    #[serde(default = "default_converter_program")]
    pub converter_program: String,

    /// Expected finding attached to scanned repositories.
    #[serde(default = "default_placeholder")]
    pub placeholder_finding: String,

    /// Shallow clone (depth 1).
    #[serde(default = "default_true")]
    pub shallow: bool,

    /// File extensions the built-in converter includes.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Names the built-in converter skips.
    #[serde(default = "default_excludes")]
    pub excludes: Vec<String>,

    /// Largest file the built-in converter includes, in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Cap on files the built-in converter includes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_files: Option<usize>,
}

impl Default for ScanSection {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            document: default_document(),
            converter: ConverterKind::default(),
            converter_program: default_converter_program(),
            placeholder_finding: default_placeholder(),
            shallow: true,
            extensions: default_extensions(),
            excludes: default_excludes(),
            max_file_size: default_max_file_size(),
            max_files: None,
        }
    }
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("repo")
}

fn default_document() -> PathBuf {
    PathBuf::from("code.md")
}

fn default_converter_program() -> String {
    "code2prompt".to_string()
}

fn default_placeholder() -> String {
    "Security scan for GitHub repository".to_string()
}

fn default_extensions() -> Vec<String> {
    vec![
        "rs", "py", "js", "ts", "jsx", "tsx", "go", "java", "c", "cpp", "h", "hpp", "cs", "rb",
        "php", "swift", "kt", "scala", "vue", "svelte", "sol", "sh", "sql",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_excludes() -> Vec<String> {
    vec![
        "target",
        "node_modules",
        "vendor",
        "dist",
        "build",
        "__pycache__",
        "venv",
        "*.min.js",
        "*.min.css",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_max_file_size() -> u64 {
    1024 * 1024 // 1MB
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only values given on the command line (or through their environment
    /// variables) override the file.
    pub fn merge_with_args(&mut self, args: &Args) {
        if let Some(provider) = args.provider {
            self.model.provider = provider;
        }
        if let Some(ref model) = args.model {
            self.model.name = model.clone();
        }
        if let Some(ref judge_model) = args.judge_model {
            self.model.judge_name = judge_model.clone();
        }
        if let Some(ref api_url) = args.api_url {
            self.model.api_url = Some(api_url.clone());
        }
        if let Some(timeout) = args.timeout {
            self.model.timeout_seconds = timeout;
        }
        if args.temperature.is_some() {
            self.model.temperature = args.temperature;
        }
        if args.no_web_search {
            self.model.web_search = false;
        }

        if let Some(concurrency) = args.concurrency {
            self.general.concurrency = concurrency;
        }
        if args.isolate_failures {
            self.general.isolate_failures = true;
        }

        match &args.command {
            Command::Run(run) => {
                if let Some(chunk_size) = run.chunk_size {
                    self.general.chunk_size = chunk_size;
                }
                if let Some(ref log_dir) = run.log_dir {
                    self.general.log_dir = log_dir.clone();
                }
            }
            Command::Scan(scan) => {
                if let Some(converter) = scan.converter {
                    self.scan.converter = converter;
                }
            }
            Command::InitConfig => {}
        }
    }

    /// Check values a config file could have set out of range.
    pub fn validate(&self) -> Result<()> {
        if self.general.concurrency == 0 {
            anyhow::bail!("concurrency must be at least 1");
        }
        if self.general.chunk_size == 0 {
            anyhow::bail!("chunk_size must be at least 1");
        }
        if self.model.timeout_seconds == 0 {
            anyhow::bail!("timeout_seconds must be at least 1");
        }
        let url = self.model.api_url();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            anyhow::bail!("api_url must start with 'http://' or 'https://'");
        }
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
