//! Report rendering and the durable sink.

use crate::model::AuditReport;
use crate::tools::repo::repo_slug;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Fixed alias overwritten on every run.
pub const LATEST_REPORT_NAME: &str = "audit_report_latest.md";

/// Deterministic report filename from the source identity and a timestamp.
pub fn report_filename(repo_url: &str, at: DateTime<Utc>) -> String {
    let (owner, repo) = repo_slug(repo_url);
    format!("audit_{owner}_{repo}_{}.md", at.format("%Y%m%d_%H%M%S"))
}

/// Render the human-readable markdown report.
pub fn render_markdown(report: &AuditReport) -> String {
    let mut lines = vec![
        "# Tribunal - Final Audit Report".to_string(),
        format!("**Repository:** {}", report.repo_url),
        format!("**Overall Score:** {:.2} / 100", report.overall_score),
        String::new(),
        "## Executive Summary".to_string(),
        report.executive_summary.clone(),
        String::new(),
        "## Criterion Breakdown".to_string(),
    ];

    for cr in &report.criteria {
        lines.push(format!(
            "### {} (ID: {}) - Score: {}/100",
            cr.dimension_name, cr.dimension_id, cr.final_score
        ));
        if let Some(dissent) = &cr.dissent_summary {
            lines.push(format!("*(Dissent/Rules Applied)*: {dissent}"));
        }
        lines.push(format!("**Remediation:** {}\n", cr.remediation));
    }

    lines.push("## Remediation Plan".to_string());
    lines.push(report.remediation_plan.clone());
    lines.join("\n")
}

/// Durable destination for rendered reports.
///
/// Write failures are a deployment concern; callers log them and move on.
pub trait ReportSink: Send + Sync {
    fn write(&self, filename: &str, contents: &str) -> std::io::Result<PathBuf>;
}

/// Filesystem sink rooted at a reports directory.
pub struct FsReportSink {
    dir: PathBuf,
}

impl FsReportSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ReportSink for FsReportSink {
    fn write(&self, filename: &str, contents: &str) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(filename);
        std::fs::write(&path, contents)?;
        Ok(path)
    }
}
