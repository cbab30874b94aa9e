//! Problem sets: the built-in samples and JSON datasets.
//!
//! A dataset is a JSON array of objects with a `filetext` field (the code
//! sample) and a `readme` field (the expected finding). An optional
//! numeric `id` is kept; otherwise problems are numbered from 1 in file
//! order.

use crate::models::Problem;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Errors raised while loading a problem set.
#[derive(Debug, Error)]
pub enum ProblemLoadError {
    #[error("Failed to read problem file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid problem file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Duplicate problem id {0}")]
    DuplicateId(usize),
}

/// One entry of a JSON dataset.
#[derive(Debug, Deserialize)]
struct RawProblem {
    #[serde(default)]
    id: Option<usize>,
    filetext: String,
    readme: String,
}

/// Load problems from a JSON file.
pub fn load_problems(path: &Path) -> Result<Vec<Problem>, ProblemLoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| ProblemLoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let problems = parse_problems(&content).map_err(|e| match e {
        ParseFailure::Json(source) => ProblemLoadError::Parse {
            path: path.to_path_buf(),
            source,
        },
        ParseFailure::DuplicateId(id) => ProblemLoadError::DuplicateId(id),
    })?;

    info!("Loaded {} problems from {}", problems.len(), path.display());
    Ok(problems)
}

enum ParseFailure {
    Json(serde_json::Error),
    DuplicateId(usize),
}

fn parse_problems(content: &str) -> Result<Vec<Problem>, ParseFailure> {
    let raw: Vec<RawProblem> = serde_json::from_str(content).map_err(ParseFailure::Json)?;

    let mut seen = std::collections::HashSet::new();
    let mut problems = Vec::with_capacity(raw.len());

    for (index, entry) in raw.into_iter().enumerate() {
        let id = entry.id.unwrap_or(index + 1);
        if !seen.insert(id) {
            return Err(ParseFailure::DuplicateId(id));
        }
        problems.push(Problem::new(id, entry.filetext, entry.readme));
    }

    Ok(problems)
}

/// The two reference samples used when no dataset is given.
pub fn builtin_problems() -> Vec<Problem> {
    vec![
        Problem::new(
            1,
            r#"
def insecure_eval(user_input):
    # Unsafe evaluation of user input
    result = eval(user_input)
    return result
"#,
            "The code uses eval on unsanitized user input, allowing arbitrary code execution.",
        ),
        Problem::new(
            2,
            r#"
import sqlite3

def get_user_balance(user_id):
    conn = sqlite3.connect('bank.db')
    cursor = conn.cursor()
    # SQL query constructed with direct string interpolation
    query = f"SELECT balance FROM accounts WHERE user_id = '{user_id}'"
    cursor.execute(query)
    return cursor.fetchone()[0]
"#,
            "The code constructs an SQL query by directly interpolating user_id, leading to SQL injection vulnerability.",
        ),
    ]
}
