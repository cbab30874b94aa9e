//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::config::ConverterKind;
use crate::llm::Provider;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::{Path, PathBuf};

/// ShieldBench - security-review agent benchmark and repository scanner
///
/// Asks a reasoning model to find the vulnerability in code samples, grades
/// each answer against a known finding, and logs the scores batch by batch.
///
/// Examples:
///   shieldbench run --problems problems.json --chunk-size 25
///   shieldbench --provider ollama --model qwen2.5-coder:32b run
///   shieldbench scan https://github.com/owner/repo.git -o report.txt
///   shieldbench init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    ///
    /// If not specified, looks for .shieldbench.toml in the current directory
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// API serving the reasoning requests
    #[arg(long, global = true, env = "SHIELDBENCH_PROVIDER")]
    pub provider: Option<Provider>,

    /// Model that looks for the vulnerability
    #[arg(short, long, global = true, env = "SHIELDBENCH_MODEL")]
    pub model: Option<String>,

    /// Model that grades the answers
    #[arg(long, global = true, env = "SHIELDBENCH_JUDGE_MODEL")]
    pub judge_model: Option<String>,

    /// API base URL
    #[arg(long, global = true, value_name = "URL", env = "SHIELDBENCH_API_URL")]
    pub api_url: Option<String>,

    /// Maximum reasoning requests in flight per batch
    #[arg(long, global = true, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// Request timeout in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Sampling temperature (0.0 - 2.0)
    #[arg(long, global = true)]
    pub temperature: Option<f32>,

    /// Disable web search for the analysis model
    #[arg(long, global = true)]
    pub no_web_search: bool,

    /// Record failed problems and keep going instead of aborting the run
    #[arg(long, global = true)]
    pub isolate_failures: bool,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Scan a repository for security vulnerabilities
    Scan(ScanArgs),
    /// Run the benchmark pipeline over a problem set
    Run(RunArgs),
    /// Generate a default .shieldbench.toml configuration file
    InitConfig,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ScanArgs {
    /// Repository URL to scan
    #[arg(value_name = "URL")]
    pub url: String,

    /// Output file for the vulnerability report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Specific branch to scan
    #[arg(short, long, value_name = "BRANCH")]
    pub branch: Option<String>,

    /// How the repository is turned into one document
    #[arg(long)]
    pub converter: Option<ConverterKind>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    /// JSON problem set; the built-in samples are used when omitted
    #[arg(short, long, value_name = "FILE")]
    pub problems: Option<PathBuf>,

    /// Problems per batch
    #[arg(long, value_name = "NUM")]
    pub chunk_size: Option<usize>,

    /// Directory for the run log
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref api_url) = self.api_url {
            if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
                return Err("API URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.concurrency == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 2.0".to_string());
            }
        }

        match &self.command {
            Command::Scan(scan) => validate_repo_url(&scan.url),
            Command::Run(run) => {
                if run.chunk_size == Some(0) {
                    return Err("Chunk size must be at least 1".to_string());
                }
                if let Some(ref problems) = run.problems {
                    if !problems.is_file() {
                        return Err(format!(
                            "Problem file does not exist: {}",
                            problems.display()
                        ));
                    }
                }
                Ok(())
            }
            Command::InitConfig => Ok(()),
        }
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

fn validate_repo_url(url: &str) -> Result<(), String> {
    const SCHEMES: [&str; 5] = ["https://", "http://", "git@", "ssh://", "file://"];

    if SCHEMES.iter().any(|scheme| url.starts_with(scheme)) || Path::new(url).is_dir() {
        Ok(())
    } else {
        Err(format!(
            "Repository URL must start with one of {} or be a local directory",
            SCHEMES.join(", ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        let mut argv = vec!["shieldbench"];
        argv.extend_from_slice(args);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_parse_scan() {
        let args = parse(&["scan", "https://github.com/test/repo.git", "-o", "out.txt"]);
        match args.command {
            Command::Scan(scan) => {
                assert_eq!(scan.url, "https://github.com/test/repo.git");
                assert_eq!(scan.output, Some(PathBuf::from("out.txt")));
                assert!(scan.converter.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = parse(&["run", "--chunk-size", "5", "--provider", "ollama", "-v"]);
        assert_eq!(args.provider, Some(Provider::Ollama));
        assert!(args.verbose);
        match args.command {
            Command::Run(run) => assert_eq!(run.chunk_size, Some(5)),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_validation_invalid_url() {
        let args = parse(&["scan", "invalid-url"]);
        assert!(args.validate().is_err());

        let args = parse(&["scan", "git@github.com:test/repo.git"]);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_chunk_size() {
        let args = parse(&["run", "--chunk-size", "0"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_missing_problem_file() {
        let args = parse(&["run", "--problems", "/no/such/problems.json"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let args = parse(&["-v", "-q", "init-config"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_bad_api_url() {
        let args = parse(&["--api-url", "localhost:11434", "run"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        assert_eq!(parse(&["run"]).log_level(), tracing::Level::INFO);
        assert_eq!(parse(&["run", "-v"]).log_level(), tracing::Level::DEBUG);
        assert_eq!(parse(&["run", "-q"]).log_level(), tracing::Level::ERROR);
    }
}
