//! Repository-to-document conversion.

use crate::scanner::{FileScanner, ScanConfig};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

/// Errors produced while flattening a repository.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Error running {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Error running {program}: {stderr}")]
    Failed { program: String, stderr: String },

    #[error("Error reading {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error scanning repository: {0}")]
    Scan(String),
}

/// Turns a checked-out repository into one text document.
#[derive(Debug, Clone)]
pub enum Converter {
    /// Run `<program> --path <repo> --output <document>`.
    External { program: String },
    /// Concatenate matching files with the built-in scanner.
    Builtin(ScanConfig),
}

impl Converter {
    pub fn name(&self) -> &str {
        match self {
            Converter::External { program } => program,
            Converter::Builtin(_) => "builtin",
        }
    }

    /// Write the document for `repo_dir` to `output` and return its content.
    pub async fn convert(&self, repo_dir: &Path, output: &Path) -> Result<String, ConvertError> {
        match self {
            Converter::External { program } => {
                debug!("Running {} on {}", program, repo_dir.display());
                let result = Command::new(program)
                    .arg("--path")
                    .arg(repo_dir)
                    .arg("--output")
                    .arg(output)
                    .output()
                    .await
                    .map_err(|source| ConvertError::Spawn {
                        program: program.clone(),
                        source,
                    })?;

                if !result.status.success() {
                    return Err(ConvertError::Failed {
                        program: program.clone(),
                        stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
                    });
                }

                let content = tokio::fs::read_to_string(output)
                    .await
                    .map_err(|source| ConvertError::Read {
                        path: output.to_path_buf(),
                        source,
                    })?;
                info!("{} produced {} bytes", program, content.len());
                Ok(content)
            }
            Converter::Builtin(config) => {
                let scanner = FileScanner::new(repo_dir.to_path_buf(), config.clone());
                let content = scanner
                    .write_document(output)
                    .map_err(|e| ConvertError::Scan(format!("{:#}", e)))?;
                info!("Built-in converter produced {} bytes", content.len());
                Ok(content)
            }
        }
    }
}
