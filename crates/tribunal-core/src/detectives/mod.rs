//! Detective nodes: evidence producers over the audited source.
//!
//! Detectives validate their own inputs, convert collection failures into
//! negative evidence, and never raise across the graph boundary with
//! anything other than an empty update. They share no mutable state; all
//! writes flow through the evidence-store merge.

use crate::graph::Node;
use crate::model::Evidence;
use crate::state::{AgentState, StateUpdate};
use crate::tools::{doc, repo};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

/// Criterion ids the repo investigator populates.
pub const GIT_HISTORY: &str = "git_history";
pub const SIDECAR_FILES: &str = "sidecar_files";
pub const REPO_STRUCTURE: &str = "repo_structure";
/// Criterion id the document analyst populates.
pub const THEORETICAL_DEPTH: &str = "theoretical_depth";

/// Clones the repository into a private sandbox and performs code forensics:
/// commit history, orchestration sidecars, expected layout.
pub struct RepoInvestigator {
    clone_timeout: Duration,
    layout_targets: Vec<String>,
}

impl RepoInvestigator {
    pub fn new(clone_timeout: Duration, layout_targets: Vec<String>) -> Self {
        Self {
            clone_timeout,
            layout_targets,
        }
    }
}

#[async_trait]
impl Node for RepoInvestigator {
    fn name(&self) -> &str {
        "repo_investigator"
    }

    async fn run(&self, state: &AgentState) -> anyhow::Result<StateUpdate> {
        let Some(url) = state.repo_url.as_deref() else {
            tracing::warn!("no repository locator provided; skipping code forensics");
            return Ok(StateUpdate::default());
        };

        let mut update = StateUpdate::default();
        let sandbox = match repo::clone_repo(url, self.clone_timeout).await {
            Ok(sandbox) => sandbox,
            Err(err) => {
                tracing::warn!(url, error = %err, "clone failed; recording negative evidence");
                update.push_evidence(
                    GIT_HISTORY,
                    Evidence::collection_failure(
                        "commit history extracted from the repository",
                        "repo_root",
                        format!("forensic collection failed: {err}"),
                    ),
                );
                return Ok(update);
            }
        };

        match repo::extract_history(sandbox.path()).await {
            Ok(history) => {
                update.push_evidence(
                    GIT_HISTORY,
                    Evidence::new(
                        "commit history extracted from the repository",
                        true,
                        Some(format!("extracted {} commits from history", history.len())),
                        "git:log",
                        "git log completed against the cloned checkout",
                        1.0,
                    )?,
                );
            }
            Err(err) => {
                tracing::warn!(url, error = %err, "history read failed");
                update.push_evidence(
                    GIT_HISTORY,
                    Evidence::collection_failure(
                        "commit history extracted from the repository",
                        "repo_root",
                        format!("forensic collection failed: {err}"),
                    ),
                );
            }
        }

        let sidecars = repo::check_sidecar_files(sandbox.path());
        let found: Vec<String> = sidecars
            .iter()
            .filter_map(|(key, path)| path.as_ref().map(|p| format!("{key} found at {p}")))
            .collect();
        update.push_evidence(
            SIDECAR_FILES,
            Evidence::new(
                "orchestration sidecar files present",
                !found.is_empty(),
                Some(if found.is_empty() {
                    "no orchestration sidecars detected".to_string()
                } else {
                    found.join(" | ")
                }),
                ".orchestration/",
                "checked the fixed sidecar candidate paths in the checkout",
                0.9,
            )?,
        );

        let layout = repo::analyze_layout(sandbox.path(), &self.layout_targets);
        let missing: Vec<&str> = layout
            .iter()
            .filter(|(_, present)| !**present)
            .map(|(target, _)| target.as_str())
            .collect();
        update.push_evidence(
            REPO_STRUCTURE,
            Evidence::new(
                "expected project layout present",
                missing.is_empty(),
                Some(if missing.is_empty() {
                    "full folder structure verified".to_string()
                } else {
                    format!("structure incomplete; missing: {}", missing.join(", "))
                }),
                "src/",
                "compared the checkout against the expected layout targets",
                0.8,
            )?,
        );

        Ok(update)
    }
}

/// Ingests the accompanying report document and checks for the configured
/// theoretical concepts.
pub struct DocAnalyst {
    chunk_max_chars: usize,
    concept_queries: Vec<String>,
}

impl DocAnalyst {
    pub fn new(chunk_max_chars: usize, concept_queries: Vec<String>) -> Self {
        Self {
            chunk_max_chars,
            concept_queries,
        }
    }
}

#[async_trait]
impl Node for DocAnalyst {
    fn name(&self) -> &str {
        "doc_analyst"
    }

    async fn run(&self, state: &AgentState) -> anyhow::Result<StateUpdate> {
        let Some(path) = state.doc_path.clone() else {
            tracing::warn!("no report document provided; skipping document analysis");
            return Ok(StateUpdate::default());
        };

        let mut update = StateUpdate::default();
        let chunks = match load_chunks(path.clone(), self.chunk_max_chars).await {
            Ok(chunks) => chunks,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "document ingestion failed");
                update.push_evidence(
                    THEORETICAL_DEPTH,
                    Evidence::collection_failure(
                        "theoretical concepts discussed in the report",
                        path.display().to_string(),
                        format!("document ingestion failed: {err}"),
                    ),
                );
                return Ok(update);
            }
        };

        let mut findings = Vec::new();
        for query in &self.concept_queries {
            if let Some(hit) = doc::keyword_search(&chunks, query, 1).first() {
                let preview: String = hit.chars().take(100).collect();
                findings.push(format!("match for {query:?}: {preview}..."));
            }
        }

        update.push_evidence(
            THEORETICAL_DEPTH,
            Evidence::new(
                "theoretical concepts discussed in the report",
                !findings.is_empty(),
                Some(if findings.is_empty() {
                    "no advanced theoretical concepts detected in the report".to_string()
                } else {
                    findings.join("\n")
                }),
                format!("doc:{}", path.display()),
                "keyword frequency search over the ingested document chunks",
                0.8,
            )?,
        );

        Ok(update)
    }
}

async fn load_chunks(
    path: PathBuf,
    max_chars: usize,
) -> Result<Vec<String>, crate::errors::DocumentLoadError> {
    let ingest_path = path.clone();
    let chunks = tokio::task::spawn_blocking(move || doc::ingest(&ingest_path, max_chars))
        .await
        .map_err(|join| crate::errors::DocumentLoadError::Unreadable {
            path,
            source: std::io::Error::other(join),
        })??;
    Ok(chunks)
}

/// Structural fan-in barrier between the detective and judge stages.
///
/// Runs only once every detective has completed (or failed with an empty
/// update); contributes nothing of its own.
pub struct Aggregator;

#[async_trait]
impl Node for Aggregator {
    fn name(&self) -> &str {
        "aggregator"
    }

    async fn run(&self, state: &AgentState) -> anyhow::Result<StateUpdate> {
        tracing::info!(
            criteria = state.evidence.len(),
            records = state.evidence_count(),
            "evidence aggregation complete"
        );
        Ok(StateUpdate::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn repo_investigator_skips_without_locator() {
        let node = RepoInvestigator::new(Duration::from_secs(5), vec![]);
        let update = node.run(&AgentState::default()).await.unwrap();
        assert!(update.is_empty());
    }

    #[tokio::test]
    async fn repo_investigator_records_negative_evidence_on_clone_failure() {
        let node = RepoInvestigator::new(Duration::from_secs(30), vec![]);
        let state = AgentState::new(
            Some("file:///definitely/not/a/repo".to_string()),
            None,
            vec![],
        );
        let update = node.run(&state).await.unwrap();
        let records = &update.evidence[GIT_HISTORY];
        assert_eq!(records.len(), 1);
        assert!(!records[0].found);
        assert_eq!(records[0].confidence, 0.0);
    }

    #[tokio::test]
    async fn doc_analyst_skips_without_path() {
        let node = DocAnalyst::new(1000, vec!["Trust Debt".to_string()]);
        let update = node.run(&AgentState::default()).await.unwrap();
        assert!(update.is_empty());
    }

    #[tokio::test]
    async fn doc_analyst_records_negative_evidence_for_missing_file() {
        let node = DocAnalyst::new(1000, vec!["Trust Debt".to_string()]);
        let state = AgentState::new(None, Some(PathBuf::from("/no/such/report.md")), vec![]);
        let update = node.run(&state).await.unwrap();
        let records = &update.evidence[THEORETICAL_DEPTH];
        assert!(!records[0].found);
        assert_eq!(records[0].confidence, 0.0);
    }

    #[tokio::test]
    async fn doc_analyst_finds_configured_concepts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");
        std::fs::write(
            &path,
            "We discuss Trust Debt at length.\n\nTrust Debt compounds unseen.",
        )
        .unwrap();

        let node = DocAnalyst::new(
            1000,
            vec!["Trust Debt".to_string(), "Metacognition".to_string()],
        );
        let state = AgentState::new(None, Some(path), vec![]);
        let update = node.run(&state).await.unwrap();
        let record = &update.evidence[THEORETICAL_DEPTH][0];
        assert!(record.found);
        assert!(record.content.as_deref().unwrap().contains("Trust Debt"));
        assert!(!record.content.as_deref().unwrap().contains("Metacognition"));
    }

    #[tokio::test]
    async fn aggregator_is_a_pure_barrier() {
        let update = Aggregator.run(&AgentState::default()).await.unwrap();
        assert!(update.is_empty());
    }
}
