//! File scanner for discovering and filtering source files.
//!
//! Backs the built-in converter, which turns a cloned repository into a
//! single text document when no external converter is available.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Configuration for file scanning.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// File extensions to include (e.g., ["rs", "py", "js"])
    pub extensions: Vec<String>,
    /// Directory or file names to skip (e.g., ["node_modules", "target"])
    pub excludes: Vec<String>,
    /// Maximum file size in bytes
    pub max_file_size: u64,
    /// Maximum number of files to include
    pub max_files: Option<usize>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::from(&crate::config::ScanSection::default())
    }
}

impl From<&crate::config::ScanSection> for ScanConfig {
    fn from(config: &crate::config::ScanSection) -> Self {
        Self {
            extensions: config.extensions.clone(),
            excludes: config.excludes.clone(),
            max_file_size: config.max_file_size,
            max_files: config.max_files,
        }
    }
}

/// Scanned file information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    /// Relative path from repo root, with `/` separators
    pub path: String,
    /// File size in bytes
    pub size: u64,
    /// File extension (without dot)
    pub extension: String,
}

/// File scanner for discovering source files.
pub struct FileScanner {
    config: ScanConfig,
    repo_root: PathBuf,
}

impl FileScanner {
    pub fn new(repo_root: PathBuf, config: ScanConfig) -> Self {
        Self { config, repo_root }
    }

    /// Scan for all matching files, sorted by path.
    pub fn scan(&self) -> Result<Vec<ScannedFile>> {
        if !self.repo_root.is_dir() {
            anyhow::bail!("Not a directory: {}", self.repo_root.display());
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(&self.repo_root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0 || !self.is_excluded(&entry.file_name().to_string_lossy())
            });

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !self.matches(entry.path()) {
                continue;
            }

            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            let rel_path = entry
                .path()
                .strip_prefix(&self.repo_root)
                .unwrap_or(entry.path());

            files.push(ScannedFile {
                path: rel_path
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/"),
                size,
                extension: extension_of(entry.path()).to_string(),
            });

            if let Some(max) = self.config.max_files {
                if files.len() >= max {
                    break;
                }
            }
        }

        Ok(files)
    }

    /// Render every matching file into one markdown document.
    pub fn render_document(&self) -> Result<String> {
        let files = self.scan()?;
        debug!(
            "Rendering {} files ({} bytes)",
            files.len(),
            files.iter().map(|f| f.size).sum::<u64>()
        );
        let project = self
            .repo_root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.repo_root.display().to_string());

        let mut doc = format!("Project Path: {}\n\nSource Tree:\n\n```\n", project);
        for file in &files {
            doc.push_str(&format!("{}\n", file.path));
        }
        doc.push_str("```\n\n");

        for file in &files {
            let full_path = self.repo_root.join(&file.path);
            match fs::read_to_string(&full_path) {
                Ok(content) => {
                    doc.push_str(&format!(
                        "`{}`:\n\n```{}\n{}\n```\n\n",
                        file.path, file.extension, content
                    ));
                }
                Err(e) => warn!("Failed to read {}: {}", file.path, e),
            }
        }

        Ok(doc)
    }

    /// Render the document and write it to `output`.
    pub fn write_document(&self, output: &Path) -> Result<String> {
        let doc = self.render_document()?;
        fs::write(output, &doc)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        Ok(doc)
    }

    /// Check if a file matches scan criteria.
    pub fn matches(&self, path: &Path) -> bool {
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if self.is_excluded(name) {
                return false;
            }
        }

        let ext = extension_of(path);
        if !self.config.extensions.iter().any(|e| e == ext) {
            return false;
        }

        match fs::metadata(path) {
            Ok(metadata) => metadata.len() <= self.config.max_file_size,
            Err(_) => false,
        }
    }

    /// Check if a name matches exclusion patterns.
    fn is_excluded(&self, name: &str) -> bool {
        if name.starts_with('.') {
            return true;
        }

        self.config.excludes.iter().any(|pattern| {
            match pattern.strip_prefix('*') {
                Some(suffix) => name.ends_with(suffix),
                None => name == pattern,
            }
        })
    }
}

fn extension_of(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_tree() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join("src/app.py"), "eval(input())").unwrap();
        fs::write(root.join("src/db.js"), "query(`SELECT ${id}`)").unwrap();
        fs::write(root.join("src/bundle.min.js"), "minified").unwrap();
        fs::write(root.join("node_modules/pkg/index.js"), "vendor").unwrap();
        fs::write(root.join(".git/config"), "[core]").unwrap();
        fs::write(root.join("README.md"), "# readme").unwrap();
        temp_dir
    }

    fn config() -> ScanConfig {
        ScanConfig {
            extensions: vec!["py".to_string(), "js".to_string()],
            excludes: vec!["node_modules".to_string(), "*.min.js".to_string()],
            max_file_size: 1024,
            max_files: None,
        }
    }

    #[test]
    fn test_scan_filters_and_sorts() {
        let tree = sample_tree();
        let scanner = FileScanner::new(tree.path().to_path_buf(), config());

        let files = scanner.scan().unwrap();
        let paths: Vec<_> = files.iter().map(|f| f.path.as_str()).collect();

        assert_eq!(paths, vec!["src/app.py", "src/db.js"]);
        assert_eq!(files[0].extension, "py");
        assert_eq!(files[0].size, 13);
    }

    #[test]
    fn test_scan_respects_max_files() {
        let tree = sample_tree();
        let scanner = FileScanner::new(
            tree.path().to_path_buf(),
            ScanConfig {
                max_files: Some(1),
                ..config()
            },
        );

        assert_eq!(scanner.scan().unwrap().len(), 1);
    }

    #[test]
    fn test_large_files_skipped() {
        let tree = sample_tree();
        fs::write(tree.path().join("src/huge.py"), "x".repeat(2048)).unwrap();
        let scanner = FileScanner::new(tree.path().to_path_buf(), config());

        let files = scanner.scan().unwrap();
        assert!(files.iter().all(|f| f.path != "src/huge.py"));
    }

    #[test]
    fn test_render_document() {
        let tree = sample_tree();
        let scanner = FileScanner::new(tree.path().to_path_buf(), config());

        let doc = scanner.render_document().unwrap();

        assert!(doc.starts_with("Project Path: "));
        assert!(doc.contains("`src/app.py`:\n\n```py\neval(input())\n```"));
        assert!(doc.contains("src/db.js"));
        assert!(!doc.contains("vendor"));
        assert!(!doc.contains("[core]"));
    }

    #[test]
    fn test_write_document() {
        let tree = sample_tree();
        let out = TempDir::new().unwrap();
        let output = out.path().join("code.md");
        let scanner = FileScanner::new(tree.path().to_path_buf(), config());

        let doc = scanner.write_document(&output).unwrap();
        assert_eq!(fs::read_to_string(&output).unwrap(), doc);
    }

    #[test]
    fn test_scan_missing_root() {
        let scanner = FileScanner::new(PathBuf::from("/no/such/repo"), config());
        assert!(scanner.scan().is_err());
    }
}
