//! Run-scoped state and the merge discipline for parallel branches.
//!
//! Branches never write through a shared reference. Each node returns an
//! isolated [`StateUpdate`]; the scheduler folds updates into the next
//! snapshot with [`AgentState::apply`]. The evidence union and opinion
//! concatenation are commutative and associative, so the fold is safe under
//! any completion order of sibling branches.

use crate::model::{AuditReport, Evidence, JudicialOpinion, RubricDimension};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Evidence store: criterion id to append-only list of evidence records.
pub type EvidenceStore = BTreeMap<String, Vec<Evidence>>;

/// The central state threaded through the audit graph.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AgentState {
    pub repo_url: Option<String>,
    pub doc_path: Option<PathBuf>,
    /// Loaded once at run start; read-only for the whole run.
    pub rubric: Vec<RubricDimension>,
    pub evidence: EvidenceStore,
    pub opinions: Vec<JudicialOpinion>,
    pub final_report: Option<AuditReport>,
}

impl AgentState {
    pub fn new(
        repo_url: Option<String>,
        doc_path: Option<PathBuf>,
        rubric: Vec<RubricDimension>,
    ) -> Self {
        Self {
            repo_url,
            doc_path,
            rubric,
            ..Self::default()
        }
    }

    /// Fold one partial update into this snapshot.
    ///
    /// Evidence merges key-wise (lists append, never overwrite), opinions
    /// concatenate, and the final report is last-writer-wins since only the
    /// synthesizer ever sets it.
    pub fn apply(&mut self, update: StateUpdate) {
        for (criterion, records) in update.evidence {
            self.evidence.entry(criterion).or_default().extend(records);
        }
        self.opinions.extend(update.opinions);
        if update.final_report.is_some() {
            self.final_report = update.final_report;
        }
    }

    /// Total number of evidence records across all criteria.
    pub fn evidence_count(&self) -> usize {
        self.evidence.values().map(Vec::len).sum()
    }
}

/// Sparse update returned by a node. `Default` means "no update", which is
/// also what a failed branch contributes.
#[derive(Debug, Clone, Default)]
pub struct StateUpdate {
    pub evidence: EvidenceStore,
    pub opinions: Vec<JudicialOpinion>,
    pub final_report: Option<AuditReport>,
}

impl StateUpdate {
    pub fn is_empty(&self) -> bool {
        self.evidence.is_empty() && self.opinions.is_empty() && self.final_report.is_none()
    }

    /// Append one evidence record under a criterion id.
    pub fn push_evidence(&mut self, criterion: impl Into<String>, record: Evidence) {
        self.evidence.entry(criterion.into()).or_default().push(record);
    }

    pub fn with_opinions(opinions: Vec<JudicialOpinion>) -> Self {
        Self {
            opinions,
            ..Self::default()
        }
    }

    pub fn with_final_report(report: AuditReport) -> Self {
        Self {
            final_report: Some(report),
            ..Self::default()
        }
    }
}
