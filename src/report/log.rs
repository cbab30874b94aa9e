//! Cumulative pipeline log.
//!
//! The log is created with a header before the first batch and appended to
//! after every batch, so completed batches survive if the process dies.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::generator::generate_log_header;

/// An append-only text log for one pipeline run.
#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    /// Log file path for a run started at `started`.
    pub fn path_for(log_dir: &Path, started: DateTime<Local>) -> PathBuf {
        log_dir.join(format!(
            "pipeline_results_{}.log",
            started.format("%Y%m%d_%H%M%S")
        ))
    }

    /// Create the log in `log_dir` (creating the directory) and write the header.
    pub fn create(log_dir: &Path, started: DateTime<Local>, total_problems: usize) -> Result<Self> {
        std::fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

        let path = Self::path_for(log_dir, started);
        std::fs::write(&path, generate_log_header(started, total_problems))
            .with_context(|| format!("Failed to create log file {}", path.display()))?;

        debug!("Created run log at {}", path.display());
        Ok(Self { path })
    }

    /// Append a section and flush it to disk.
    pub fn append(&self, section: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open log file {}", self.path.display()))?;

        file.write_all(section.as_bytes())
            .and_then(|_| file.flush())
            .with_context(|| format!("Failed to append to log file {}", self.path.display()))?;

        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_create_and_append() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path().join("logs");
        let started = Local.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();

        let log = RunLog::create(&log_dir, started, 3).unwrap();
        assert_eq!(
            log.path().file_name().unwrap(),
            "pipeline_results_20250102_030405.log"
        );

        log.append("first\n").unwrap();
        log.append("second\n").unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        assert!(content.starts_with("PIPELINE RESULTS - 2025-01-02 03:04:05\nTotal problems: 3\n"));
        assert!(content.ends_with("first\nsecond\n"));
    }

    #[test]
    fn test_append_to_missing_file_fails() {
        let log = RunLog {
            path: PathBuf::from("/nonexistent/dir/run.log"),
        };
        assert!(log.append("x").is_err());
    }
}
