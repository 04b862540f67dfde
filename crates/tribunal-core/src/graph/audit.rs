//! The fixed audit topology:
//!
//! ```text
//! start ─┬─▸ repo_investigator ─┐
//!        └─▸ doc_analyst ───────┴─▸ aggregator ─┬─▸ judge_prosecutor ─┐
//!                                               ├─▸ judge_defense ────┼─▸ chief_justice ─▸ end
//!                                               └─▸ judge_techlead ───┘
//! ```
//!
//! Detectives fan out from the start, the aggregator is the evidence
//! barrier, judges fan out from the aggregator, and the chief justice joins
//! them back into one verdict.

use super::{Graph, GraphBuilder, END, START};
use crate::config::AuditConfig;
use crate::detectives::{Aggregator, DocAnalyst, RepoInvestigator};
use crate::errors::GraphError;
use crate::judges::{JudgeNode, JudgeSettings};
use crate::justice::ChiefJustice;
use crate::model::JudgePersona;
use crate::providers::llm::LlmClient;
use crate::report::ReportSink;
use std::sync::Arc;

/// External capabilities the audit graph is wired with.
pub struct AuditDeps {
    pub client: Arc<dyn LlmClient>,
    pub sink: Arc<dyn ReportSink>,
}

/// Build the full audit graph from configuration and collaborators.
pub fn build_audit_graph(config: &AuditConfig, deps: AuditDeps) -> Result<Graph, GraphError> {
    let judge_settings = JudgeSettings {
        max_attempts: config.llm.max_attempts,
        request_timeout: config.llm.request_timeout(),
    };

    let mut builder = GraphBuilder::new()
        .add_node(Arc::new(RepoInvestigator::new(
            config.clone_timeout(),
            config.layout_targets.clone(),
        )))
        .add_node(Arc::new(DocAnalyst::new(
            config.chunk_max_chars,
            config.concept_queries.clone(),
        )))
        .add_node(Arc::new(Aggregator))
        .add_node(Arc::new(ChiefJustice::new(deps.sink)))
        .add_edge(START, "repo_investigator")
        .add_edge(START, "doc_analyst")
        .add_edge("repo_investigator", "aggregator")
        .add_edge("doc_analyst", "aggregator")
        .add_edge("chief_justice", END);

    for persona in JudgePersona::ALL {
        let name = format!("judge_{}", persona.as_str().to_lowercase());
        let node = JudgeNode::new(persona, Arc::clone(&deps.client), judge_settings.clone());
        builder = builder
            .add_node(Arc::new(node))
            .add_edge("aggregator", name.clone())
            .add_edge(name, "chief_justice");
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::llm::DisabledClient;
    use crate::report::FsReportSink;
    use std::collections::BTreeSet;

    fn graph() -> Graph {
        let dir = tempfile::tempdir().unwrap();
        build_audit_graph(
            &AuditConfig::default(),
            AuditDeps {
                client: Arc::new(DisabledClient),
                sink: Arc::new(FsReportSink::new(dir.path())),
            },
        )
        .unwrap()
    }

    #[test]
    fn topology_matches_the_declared_pipeline() {
        let graph = graph();
        let names: BTreeSet<&str> = graph.node_names().collect();
        assert_eq!(
            names,
            BTreeSet::from([
                "repo_investigator",
                "doc_analyst",
                "aggregator",
                "judge_prosecutor",
                "judge_defense",
                "judge_techlead",
                "chief_justice",
            ])
        );

        assert_eq!(
            graph.predecessors("aggregator"),
            BTreeSet::from(["repo_investigator".to_string(), "doc_analyst".to_string()])
        );
        assert_eq!(
            graph.predecessors("chief_justice"),
            BTreeSet::from([
                "judge_prosecutor".to_string(),
                "judge_defense".to_string(),
                "judge_techlead".to_string(),
            ])
        );
    }
}
