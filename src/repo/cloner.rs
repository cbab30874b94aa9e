//! Git repository cloning functionality.
//!
//! Repositories are cloned into a fixed working directory using the git2
//! library. Any leftover directory from an earlier run is removed first.

use anyhow::{Context, Result};
use git2::{FetchOptions, Progress, RemoteCallbacks};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Options for cloning a repository.
#[derive(Debug, Clone)]
pub struct CloneOptions {
    /// Branch to checkout (None for default branch).
    pub branch: Option<String>,
    /// Depth for shallow clone (None for full clone).
    pub depth: Option<i32>,
    /// Whether to show progress.
    pub show_progress: bool,
    /// Directory the repository is cloned into.
    pub target_dir: PathBuf,
}

impl Default for CloneOptions {
    fn default() -> Self {
        Self {
            branch: None,
            depth: Some(1),
            show_progress: true,
            target_dir: PathBuf::from("repo"),
        }
    }
}

/// Clone `url` into `options.target_dir` and return the checkout path.
pub fn clone_repository(url: &str, options: &CloneOptions) -> Result<PathBuf> {
    info!("Cloning repository: {}", url);

    let path = options.target_dir.clone();
    remove_stale(&path)?;
    debug!("Clone target: {}", path.display());

    let progress_bar = if options.show_progress {
        let pb = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} objects")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        Some(pb)
    } else {
        None
    };

    let mut callbacks = RemoteCallbacks::new();
    let pb_clone = progress_bar.clone();
    callbacks.transfer_progress(move |progress: Progress<'_>| {
        if let Some(ref pb) = pb_clone {
            pb.set_length(progress.total_objects() as u64);
            pb.set_position(progress.received_objects() as u64);
        }
        true
    });

    let mut fetch_opts = FetchOptions::new();
    fetch_opts.remote_callbacks(callbacks);
    match options.depth {
        // libgit2's local transport cannot fetch shallow
        Some(_) if is_local_source(url) => {
            debug!("Local source {}, cloning full history", url);
        }
        Some(depth) => {
            fetch_opts.depth(depth);
        }
        None => {}
    }

    let mut builder = git2::build::RepoBuilder::new();
    builder.fetch_options(fetch_opts);
    if let Some(ref branch) = options.branch {
        builder.branch(branch);
    }

    let result = builder.clone(url, &path);

    if let Some(pb) = progress_bar {
        pb.finish_and_clear();
    }

    result.with_context(|| format!("Failed to clone repository: {}", url))?;

    info!("Successfully cloned repository to: {}", path.display());
    Ok(path)
}

/// True for `file://` URLs and paths to existing directories.
fn is_local_source(url: &str) -> bool {
    url.starts_with("file://") || Path::new(url).is_dir()
}

fn remove_stale(path: &Path) -> Result<()> {
    if path.exists() {
        debug!("Removing stale checkout at {}", path.display());
        std::fs::remove_dir_all(path)
            .with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_clone_options_default() {
        let opts = CloneOptions::default();
        assert!(opts.branch.is_none());
        assert_eq!(opts.depth, Some(1));
        assert!(opts.show_progress);
        assert_eq!(opts.target_dir, PathBuf::from("repo"));
    }

    #[test]
    fn test_clone_local_repository_replaces_stale_dir() {
        let temp_dir = TempDir::new().unwrap();
        let origin = temp_dir.path().join("origin");
        testing::init_repo(&origin, &[("app.py", "eval(input())")]);

        let target = temp_dir.path().join("work");
        std::fs::create_dir_all(&target).unwrap();
        std::fs::write(target.join("leftover.txt"), "old").unwrap();

        let options = CloneOptions {
            depth: None,
            show_progress: false,
            target_dir: target.clone(),
            ..CloneOptions::default()
        };

        let path = clone_repository(origin.to_str().unwrap(), &options).unwrap();
        assert_eq!(path, target);
        assert!(target.join("app.py").exists());
        assert!(!target.join("leftover.txt").exists());
    }

    #[test]
    fn test_shallow_clone_of_local_sources() {
        let temp_dir = TempDir::new().unwrap();
        let origin = temp_dir.path().join("origin");
        testing::init_repo(&origin, &[("lib.rs", "unsafe { *ptr }")]);

        let sources = [
            origin.to_str().unwrap().to_string(),
            format!("file://{}", origin.display()),
        ];
        for (i, source) in sources.iter().enumerate() {
            let options = CloneOptions {
                depth: Some(1),
                show_progress: false,
                target_dir: temp_dir.path().join(format!("work{}", i)),
                ..CloneOptions::default()
            };

            let path = clone_repository(source, &options).unwrap();
            assert!(path.join("lib.rs").exists(), "clone of {} is missing files", source);
        }
    }

    #[test]
    fn test_local_source_detection() {
        let temp_dir = TempDir::new().unwrap();
        assert!(is_local_source(temp_dir.path().to_str().unwrap()));
        assert!(is_local_source("file:///srv/git/app.git"));
        assert!(!is_local_source("https://github.com/owner/repo.git"));
        assert!(!is_local_source("git@github.com:owner/repo.git"));
    }

    #[test]
    fn test_clone_missing_repository_fails() {
        let temp_dir = TempDir::new().unwrap();
        let options = CloneOptions {
            depth: None,
            show_progress: false,
            target_dir: temp_dir.path().join("work"),
            ..CloneOptions::default()
        };

        let err = clone_repository("/no/such/origin/repo", &options).unwrap_err();
        assert!(err.to_string().contains("Failed to clone repository"));
    }
}
