//! Repository scan: clone, convert, analyze, report.
//!
//! Failures of the clone or conversion step are returned as report text
//! rather than errors. A failing reasoning request is an error.

use super::cloner::{clone_repository, CloneOptions};
use super::converter::Converter;
use crate::agent::AnalysisInvoker;
use crate::config::{ConverterKind, ScanSection};
use crate::models::Problem;
use crate::report::generate_vulnerability_report;
use crate::scanner::ScanConfig;
use anyhow::{Context, Result};
use chrono::Local;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Settings for a single repository scan.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    /// Fixed directory the repository is cloned into.
    pub work_dir: PathBuf,
    /// Intermediate document path.
    pub document: PathBuf,
    pub converter: Converter,
    /// Expected finding attached to the scan problem.
    pub placeholder_finding: String,
    pub branch: Option<String>,
    /// Clone depth; `None` for a full clone.
    pub depth: Option<i32>,
    /// Print step messages and clone progress.
    pub show_progress: bool,
}

impl ScanSettings {
    /// Build settings from the `[scan]` config section.
    pub fn from_config(section: &ScanSection, branch: Option<String>, show_progress: bool) -> Self {
        let converter = match section.converter {
            ConverterKind::Code2prompt => Converter::External {
                program: section.converter_program.clone(),
            },
            ConverterKind::Builtin => Converter::Builtin(ScanConfig::from(section)),
        };

        Self {
            work_dir: section.work_dir.clone(),
            document: section.document.clone(),
            converter,
            placeholder_finding: section.placeholder_finding.clone(),
            branch,
            depth: section.shallow.then_some(1),
            show_progress,
        }
    }
}

/// Removes the working directory and the document when dropped.
struct ScanCleanup {
    work_dir: PathBuf,
    document: PathBuf,
}

impl Drop for ScanCleanup {
    fn drop(&mut self) {
        if self.work_dir.exists() {
            if let Err(e) = std::fs::remove_dir_all(&self.work_dir) {
                warn!("Failed to remove {}: {}", self.work_dir.display(), e);
            }
        }
        if self.document.exists() {
            if let Err(e) = std::fs::remove_file(&self.document) {
                warn!("Failed to remove {}: {}", self.document.display(), e);
            }
        }
        debug!("Scan workspace cleaned up");
    }
}

/// Scan the repository at `url` and return the report text.
pub async fn scan_repository(
    url: &str,
    settings: &ScanSettings,
    invoker: &AnalysisInvoker,
) -> Result<String> {
    let _cleanup = ScanCleanup {
        work_dir: settings.work_dir.clone(),
        document: settings.document.clone(),
    };

    say(settings, &format!("Cloning repository from {}...", url));
    let options = CloneOptions {
        branch: settings.branch.clone(),
        depth: settings.depth,
        show_progress: settings.show_progress,
        target_dir: settings.work_dir.clone(),
    };
    let clone_url = url.to_string();
    let cloned = tokio::task::spawn_blocking(move || clone_repository(&clone_url, &options))
        .await
        .context("Clone task panicked")?;
    let repo_dir = match cloned {
        Ok(path) => path,
        Err(e) => {
            warn!("Clone failed: {:#}", e);
            return Ok(format!("Error cloning repository: {:#}", e));
        }
    };

    say(settings, "Generating code summary...");
    let code_text = match settings.converter.convert(&repo_dir, &settings.document).await {
        Ok(text) => text,
        Err(e) => {
            warn!("Conversion with {} failed: {}", settings.converter.name(), e);
            return Ok(e.to_string());
        }
    };

    say(settings, "Analyzing for security vulnerabilities...");
    let problem = Problem::new(0, code_text, settings.placeholder_finding.clone());
    let results = invoker.analyze_batch(std::slice::from_ref(&problem)).await?;
    let findings = results
        .into_iter()
        .next()
        .map(|r| r.claimed_finding)
        .unwrap_or_default();

    info!("Scan of {} complete", url);
    let report = generate_vulnerability_report(url, Local::now(), &findings);

    say(settings, "Cleaning up temporary files...");
    Ok(report)
}

fn say(settings: &ScanSettings, message: &str) {
    if settings.show_progress {
        println!("{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::InvokerConfig;
    use crate::llm::testing::ScriptedBackend;
    use crate::llm::LlmError;
    use crate::repo::cloner::testing::init_repo;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn settings(temp_dir: &TempDir, converter: Converter) -> ScanSettings {
        ScanSettings {
            work_dir: temp_dir.path().join("repo"),
            document: temp_dir.path().join("code.md"),
            converter,
            placeholder_finding: "Security scan for GitHub repository".to_string(),
            branch: None,
            depth: None,
            show_progress: false,
        }
    }

    fn invoker(backend: Arc<ScriptedBackend>) -> AnalysisInvoker {
        AnalysisInvoker::new(backend, InvokerConfig::default())
    }

    #[tokio::test]
    async fn test_scan_local_repository_with_builtin_converter() {
        let temp_dir = TempDir::new().unwrap();
        let origin = temp_dir.path().join("vulnapp");
        init_repo(&origin, &[("app.py", "eval(input())")]);
        // Shallow, as with the default config
        let settings = ScanSettings {
            depth: Some(1),
            ..settings(&temp_dir, Converter::Builtin(ScanConfig::default()))
        };
        let backend = Arc::new(ScriptedBackend::constant("eval on user input in app.py"));

        let report = scan_repository(origin.to_str().unwrap(), &settings, &invoker(backend.clone()))
            .await
            .unwrap();

        assert!(report.contains("SECURITY VULNERABILITY REPORT FOR vulnapp"));
        assert!(report.contains("IDENTIFIED VULNERABILITIES:\n---------------------------\neval on user input in app.py"));

        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].prompt.contains("eval(input())"));

        assert!(!settings.work_dir.exists());
        assert!(!settings.document.exists());
    }

    #[tokio::test]
    async fn test_clone_failure_is_embedded() {
        let temp_dir = TempDir::new().unwrap();
        let settings = settings(&temp_dir, Converter::Builtin(ScanConfig::default()));
        let backend = Arc::new(ScriptedBackend::constant("unused"));

        let report = scan_repository("/no/such/origin", &settings, &invoker(backend.clone()))
            .await
            .unwrap();

        assert!(report.starts_with("Error cloning repository: "));
        assert_eq!(backend.request_count(), 0);
    }

    #[tokio::test]
    async fn test_converter_failure_is_embedded_and_cleaned_up() {
        let temp_dir = TempDir::new().unwrap();
        let origin = temp_dir.path().join("origin");
        init_repo(&origin, &[("main.go", "package main")]);
        let settings = settings(
            &temp_dir,
            Converter::External {
                program: "shieldbench-no-such-converter".to_string(),
            },
        );
        let backend = Arc::new(ScriptedBackend::constant("unused"));

        let report = scan_repository(origin.to_str().unwrap(), &settings, &invoker(backend.clone()))
            .await
            .unwrap();

        assert!(report.starts_with("Error running shieldbench-no-such-converter: "));
        assert_eq!(backend.request_count(), 0);
        assert!(!settings.work_dir.exists());
    }

    #[tokio::test]
    async fn test_reasoning_failure_propagates() {
        let temp_dir = TempDir::new().unwrap();
        let origin = temp_dir.path().join("origin");
        init_repo(&origin, &[("app.js", "res.send(req.query.q)")]);
        let settings = settings(&temp_dir, Converter::Builtin(ScanConfig::default()));
        let backend = Arc::new(ScriptedBackend::new(|_| {
            Err(LlmError::Api {
                status: 500,
                body: "boom".to_string(),
            })
        }));

        let result = scan_repository(origin.to_str().unwrap(), &settings, &invoker(backend)).await;

        assert!(result.is_err());
        assert!(!settings.work_dir.exists());
    }

    #[test]
    fn test_settings_from_config() {
        let section = ScanSection {
            converter: ConverterKind::Builtin,
            shallow: false,
            ..ScanSection::default()
        };

        let settings = ScanSettings::from_config(&section, Some("main".to_string()), true);

        assert!(matches!(settings.converter, Converter::Builtin(_)));
        assert_eq!(settings.depth, None);
        assert_eq!(settings.branch.as_deref(), Some("main"));
        assert_eq!(settings.work_dir, PathBuf::from("repo"));

        let default = ScanSettings::from_config(&ScanSection::default(), None, false);
        assert_eq!(default.depth, Some(1));
        assert_eq!(default.converter.name(), "code2prompt");
    }
}
