//! Repository forensics: sandboxed clone, commit history, structural checks.

use crate::errors::{HistoryReadError, SourceFetchError};
use crate::model::Commit;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::Command;

/// Orchestration sidecar candidates, checked in order; first hit wins.
const SIDECAR_TARGETS: &[(&str, &[&str])] = &[
    (
        "active_intents",
        &[".orchestration/activeintents.yaml", "activeintents.yaml"],
    ),
    (
        "agent_trace",
        &[".orchestration/agenttrace.jsonl", "agenttrace.jsonl"],
    ),
];

/// A cloned checkout inside a temporary sandbox.
///
/// The sandbox is exclusively owned by the detective that created it and is
/// removed from disk on drop.
#[derive(Debug)]
pub struct Sandbox {
    _dir: TempDir,
    repo_path: PathBuf,
}

impl Sandbox {
    pub fn path(&self) -> &Path {
        &self.repo_path
    }
}

/// Derive the repository directory name from a locator.
fn repo_name(url: &str) -> &str {
    let trimmed = url.trim_end_matches('/');
    let name = trimmed.rsplit('/').next().unwrap_or(trimmed);
    name.strip_suffix(".git").unwrap_or(name)
}

/// Owner and repository slugs from a locator, for report filenames.
pub fn repo_slug(url: &str) -> (String, String) {
    let trimmed = url.trim_end_matches('/');
    let mut parts = trimmed.rsplit('/');
    let repo = parts
        .next()
        .map(|p| p.strip_suffix(".git").unwrap_or(p))
        .filter(|p| !p.is_empty())
        .unwrap_or("unknown");
    let owner = parts.next().filter(|p| !p.is_empty()).unwrap_or("unknown");
    (owner.to_string(), repo.to_string())
}

/// Clone `url` into a fresh sandbox, bounded by `timeout`.
pub async fn clone_repo(url: &str, timeout: Duration) -> Result<Sandbox, SourceFetchError> {
    let dir = tempfile::Builder::new()
        .prefix("tribunal_sandbox_")
        .tempdir()?;
    let dest = dir.path().join(repo_name(url));

    let clone = Command::new("git")
        .arg("clone")
        .arg("--quiet")
        .arg(url)
        .arg(&dest)
        .output();
    let output = tokio::time::timeout(timeout, clone)
        .await
        .map_err(|_| SourceFetchError::Timeout {
            url: url.to_string(),
            secs: timeout.as_secs(),
        })??;

    if !output.status.success() {
        return Err(SourceFetchError::CloneFailed {
            url: url.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(Sandbox {
        _dir: dir,
        repo_path: dest,
    })
}

/// Commit history, oldest first.
pub async fn extract_history(repo_path: &Path) -> Result<Vec<Commit>, HistoryReadError> {
    let output = Command::new("git")
        .args(["log", "--oneline", "--reverse"])
        .current_dir(repo_path)
        .output()
        .await
        .map_err(|source| HistoryReadError::Spawn {
            path: repo_path.to_path_buf(),
            source,
        })?;

    if !output.status.success() {
        return Err(HistoryReadError::GitLog {
            path: repo_path.to_path_buf(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut history = Vec::new();
    for line in stdout.lines().filter(|l| !l.is_empty()) {
        let (hash, message) = match line.split_once(' ') {
            Some((h, m)) => (h, m),
            None => (line, ""),
        };
        history.push(Commit {
            hash: hash.to_string(),
            message: message.to_string(),
        });
    }
    Ok(history)
}

/// Presence and resolved relative path of each orchestration sidecar file.
///
/// Pure filesystem lookups; a missing file is `None`, never an error.
pub fn check_sidecar_files(repo_path: &Path) -> BTreeMap<String, Option<String>> {
    let mut results = BTreeMap::new();
    for (key, candidates) in SIDECAR_TARGETS {
        let found = candidates
            .iter()
            .find(|candidate| repo_path.join(candidate).exists())
            .map(|candidate| (*candidate).to_string());
        results.insert((*key).to_string(), found);
    }
    results
}

/// Which of the expected layout targets exist under the checkout.
///
/// A target ending in `/` must be a directory, otherwise a file.
pub fn analyze_layout(repo_path: &Path, targets: &[String]) -> BTreeMap<String, bool> {
    let mut results = BTreeMap::new();
    for target in targets {
        let present = match target.strip_suffix('/') {
            Some(dir) => repo_path.join(dir).is_dir(),
            None => repo_path.join(target).is_file(),
        };
        results.insert(target.clone(), present);
    }
    results
}
