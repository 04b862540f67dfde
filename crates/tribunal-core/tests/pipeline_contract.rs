//! End-to-end pipeline contracts: the audit graph always runs to completion
//! and always leaves a report behind, however many producers actually
//! delivered.

use async_trait::async_trait;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use tribunal_core::config::AuditConfig;
use tribunal_core::model::RubricDimension;
use tribunal_core::providers::llm::{DisabledClient, LlmClient, LlmResponse};
use tribunal_core::report::{FsReportSink, LATEST_REPORT_NAME};
use tribunal_core::{build_audit_graph, AgentState, AuditDeps, JudgePersona};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

fn rubric() -> Vec<RubricDimension> {
    vec![
        RubricDimension {
            id: "security_review".into(),
            name: "Security Review".into(),
        },
        RubricDimension {
            id: "graph_orchestration".into(),
            name: "Graph Orchestration".into(),
        },
    ]
}

fn report_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Scripted panel: answers each seat from its system prompt, so the reply is
/// deterministic regardless of which judge calls first.
struct PanelClient;

impl PanelClient {
    fn scores_for(persona: JudgePersona) -> (i64, i64) {
        // (security_review, graph_orchestration)
        match persona {
            JudgePersona::Prosecutor => (30, 20),
            JudgePersona::Defense => (90, 95),
            JudgePersona::TechLead => (90, 70),
        }
    }
}

#[async_trait]
impl LlmClient for PanelClient {
    async fn complete(&self, _prompt: &str, system: Option<&str>) -> anyhow::Result<LlmResponse> {
        let system = system.unwrap_or_default();
        let persona = JudgePersona::ALL
            .into_iter()
            .find(|p| system.contains(p.as_str()))
            .ok_or_else(|| anyhow::anyhow!("no persona in system prompt"))?;
        let (security, graph) = Self::scores_for(persona);
        let text = serde_json::json!({
            "opinions": [
                {"criterion_id": "security_review", "judge": persona.as_str(),
                 "score": security, "argument": "weighed the evidence", "cited_evidence": ["git:log"]},
                {"criterion_id": "graph_orchestration", "judge": persona.as_str(),
                 "score": graph, "argument": "weighed the evidence", "cited_evidence": []}
            ]
        })
        .to_string();
        Ok(LlmResponse {
            text,
            provider: "scripted".to_string(),
            model: "scripted".to_string(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

fn init_fixture_repo(dir: &Path) {
    let run = |args: &[&str]| {
        let status = Command::new("git")
            .args(args)
            .current_dir(dir)
            .status()
            .expect("git available in test environment");
        assert!(status.success(), "git {args:?} failed");
    };
    run(&["init", "-q"]);
    std::fs::create_dir_all(dir.join("src/nodes")).unwrap();
    std::fs::create_dir_all(dir.join("src/tools")).unwrap();
    std::fs::write(dir.join("src/graph.py"), "# graph").unwrap();
    std::fs::write(dir.join("src/state.py"), "# state").unwrap();
    run(&["add", "."]);
    run(&[
        "-c",
        "user.name=fixture",
        "-c",
        "user.email=fixture@example.com",
        "commit",
        "-qm",
        "initial layout",
    ]);
}

#[tokio::test]
async fn degraded_run_still_produces_a_halted_report_on_disk() {
    init_tracing();
    let reports = tempfile::tempdir().unwrap();
    let graph = build_audit_graph(
        &AuditConfig::default(),
        AuditDeps {
            client: Arc::new(DisabledClient),
            sink: Arc::new(FsReportSink::new(reports.path())),
        },
    )
    .unwrap();

    let initial = AgentState::new(
        Some("file:///nonexistent/audit/target".to_string()),
        None,
        rubric(),
    );
    let state = graph.invoke(initial).await;

    // Clone failed: negative evidence, not silence.
    let git = &state.evidence["git_history"];
    assert_eq!(git.len(), 1);
    assert!(!git[0].found);
    assert_eq!(git[0].confidence, 0.0);

    // Backend disabled: all three seats degraded to zero opinions, and the
    // synthesizer still delivered the halted report.
    assert!(state.opinions.is_empty());
    let report = state.final_report.expect("report always exists");
    assert_eq!(report.overall_score, 0.0);
    assert!(report.criteria.is_empty());
    assert!(report.executive_summary.contains("halted"));

    let files = report_files(reports.path());
    assert_eq!(files.len(), 2);
    assert!(files.contains(&LATEST_REPORT_NAME.to_string()));
    assert!(files.iter().any(|f| f.starts_with("audit_") && f != LATEST_REPORT_NAME));
}

#[tokio::test]
async fn full_run_applies_arbitration_rules_end_to_end() {
    init_tracing();
    let fixture = tempfile::tempdir().unwrap();
    init_fixture_repo(fixture.path());
    let reports = tempfile::tempdir().unwrap();

    let graph = build_audit_graph(
        &AuditConfig::default(),
        AuditDeps {
            client: Arc::new(PanelClient),
            sink: Arc::new(FsReportSink::new(reports.path())),
        },
    )
    .unwrap();

    let initial = AgentState::new(
        Some(fixture.path().to_string_lossy().into_owned()),
        None,
        rubric(),
    );
    let state = graph.invoke(initial).await;

    // Detectives found the fixture's commit and layout.
    assert!(state.evidence["git_history"][0].found);
    assert!(state.evidence["repo_structure"][0].found);

    // Three seats, two dimensions each.
    assert_eq!(state.opinions.len(), 6);

    let report = state.final_report.expect("report always exists");
    assert_eq!(report.criteria.len(), 2);

    let by_id = |id: &str| report.criteria.iter().find(|c| c.dimension_id == id).unwrap();

    // security_review: mean(30,90,90)=70, prosecutor veto caps at 60.
    assert_eq!(by_id("security_review").final_score, 60);
    // graph_orchestration: TechLead bias sets 70, then the veto caps at 60.
    assert_eq!(by_id("graph_orchestration").final_score, 60);
    assert_eq!(report.overall_score, 60.0);

    let latest = std::fs::read_to_string(reports.path().join(LATEST_REPORT_NAME)).unwrap();
    assert!(latest.contains("Rule of Security"));
    assert!(latest.contains("Rule of Functionality"));
    assert!(latest.contains("**Overall Score:** 60.00 / 100"));
}

#[tokio::test]
async fn missing_inputs_skip_detectives_without_aborting() {
    let reports = tempfile::tempdir().unwrap();
    let graph = build_audit_graph(
        &AuditConfig::default(),
        AuditDeps {
            client: Arc::new(DisabledClient),
            sink: Arc::new(FsReportSink::new(reports.path())),
        },
    )
    .unwrap();

    let state = graph.invoke(AgentState::default()).await;
    assert!(state.evidence.is_empty());
    assert!(state.final_report.is_some());
}
