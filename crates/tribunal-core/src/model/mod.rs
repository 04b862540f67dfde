//! Record types flowing through the audit pipeline.
//!
//! Every record is validated at construction; an instance that exists is an
//! instance that satisfies its field constraints. Downstream stages never
//! re-check bounds.

use crate::errors::ValidationError;
use serde::{Deserialize, Serialize};

/// Inclusive score bounds shared by opinions and criterion results.
pub const SCORE_MIN: u8 = 1;
pub const SCORE_MAX: u8 = 100;

/// A single piece of forensic evidence gathered by a detective.
///
/// Append-only: once constructed it is never mutated, only collected into
/// the evidence store under its criterion id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Evidence {
    /// The specific check this evidence speaks to.
    pub goal: String,
    /// Whether the artifact was found.
    pub found: bool,
    /// Content or snippet backing the finding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// File path, commit ref, or similar locator.
    pub location: String,
    /// Why the detective holds this confidence.
    pub rationale: String,
    /// Confidence in the finding, 0.0..=1.0.
    pub confidence: f64,
}

impl Evidence {
    pub fn new(
        goal: impl Into<String>,
        found: bool,
        content: Option<String>,
        location: impl Into<String>,
        rationale: impl Into<String>,
        confidence: f64,
    ) -> Result<Self, ValidationError> {
        let goal = goal.into();
        let location = location.into();
        let rationale = rationale.into();
        if !(0.0..=1.0).contains(&confidence) {
            return Err(ValidationError::ConfidenceOutOfRange(confidence));
        }
        if goal.trim().is_empty() {
            return Err(ValidationError::EmptyEvidenceField("goal"));
        }
        if location.trim().is_empty() {
            return Err(ValidationError::EmptyEvidenceField("location"));
        }
        Ok(Self {
            goal,
            found,
            content,
            location,
            rationale,
            confidence,
        })
    }

    /// Standard record for a collection failure: the check ran, nothing was
    /// recovered, and downstream judges should see that rather than silence.
    pub fn collection_failure(
        goal: impl Into<String>,
        location: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            goal: goal.into(),
            found: false,
            content: Some(detail.into()),
            location: location.into(),
            rationale: "forensic collection failed; recorded as negative evidence".into(),
            confidence: 0.0,
        }
    }
}

/// One axis of evaluation, supplied externally and read-only for the run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RubricDimension {
    pub id: String,
    pub name: String,
}

/// Fixed evaluative stance of a panel seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JudgePersona {
    Prosecutor,
    Defense,
    TechLead,
}

impl JudgePersona {
    pub const ALL: [JudgePersona; 3] = [
        JudgePersona::Prosecutor,
        JudgePersona::Defense,
        JudgePersona::TechLead,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JudgePersona::Prosecutor => "Prosecutor",
            JudgePersona::Defense => "Defense",
            JudgePersona::TechLead => "TechLead",
        }
    }

    pub fn parse(name: &str) -> Result<Self, ValidationError> {
        match name {
            "Prosecutor" => Ok(JudgePersona::Prosecutor),
            "Defense" => Ok(JudgePersona::Defense),
            "TechLead" => Ok(JudgePersona::TechLead),
            other => Err(ValidationError::UnknownJudge(other.to_string())),
        }
    }

    /// The evaluation bias injected into this seat's system prompt.
    pub fn perspective(&self) -> &'static str {
        match self {
            JudgePersona::Prosecutor => {
                "You actively look for flaws, security risks, missing requirements, and \
                 negative theoretical debt. Your goal is to critically audit and penalize \
                 shortcomings."
            }
            JudgePersona::Defense => {
                "You highlight the strengths, functional completeness, positive architectural \
                 decisions, and mitigating factors. Defend the implementation's merits."
            }
            JudgePersona::TechLead => {
                "You are a pragmatic Tech Lead. You weigh the Prosecutor's strictness against \
                 the Defense's leniency. Focus on realistic maintainability, architecture, and \
                 practical tradeoffs."
            }
        }
    }
}

impl std::fmt::Display for JudgePersona {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opinion rendered by one judge for one rubric dimension.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JudicialOpinion {
    pub criterion_id: String,
    pub judge: JudgePersona,
    /// 1..=100; evidence outweighs opinion.
    pub score: u8,
    pub argument: String,
    /// Evidence locations or snippets the judge relied on.
    pub cited_evidence: Vec<String>,
}

impl JudicialOpinion {
    pub fn new(
        criterion_id: impl Into<String>,
        judge: JudgePersona,
        score: i64,
        argument: impl Into<String>,
        cited_evidence: Vec<String>,
    ) -> Result<Self, ValidationError> {
        let criterion_id = criterion_id.into();
        let argument = argument.into();
        if !(i64::from(SCORE_MIN)..=i64::from(SCORE_MAX)).contains(&score) {
            return Err(ValidationError::ScoreOutOfRange {
                criterion_id,
                score,
            });
        }
        if argument.trim().is_empty() {
            return Err(ValidationError::EmptyArgument(criterion_id));
        }
        Ok(Self {
            criterion_id,
            judge,
            score: score as u8,
            argument,
            cited_evidence,
        })
    }
}

/// Synthesized verdict for one rubric dimension.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CriterionResult {
    pub dimension_id: String,
    pub dimension_name: String,
    /// 1..=100 after all arbitration rules and the final clamp.
    pub final_score: u8,
    pub judge_opinions: Vec<JudicialOpinion>,
    /// Present when judges disagreed by 20 or more, or a deterministic
    /// arbitration rule fired.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dissent_summary: Option<String>,
    pub remediation: String,
}

/// Terminal artifact of one audit run. Written once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditReport {
    pub repo_url: String,
    pub executive_summary: String,
    pub overall_score: f64,
    pub criteria: Vec<CriterionResult>,
    pub remediation_plan: String,
}

/// An entry from the audited repository's commit log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Commit {
    pub hash: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evidence_rejects_out_of_range_confidence() {
        for bad in [-0.1, 1.5, f64::NAN] {
            let res = Evidence::new("goal", true, None, "src/lib.rs", "seen", bad);
            assert!(matches!(
                res,
                Err(ValidationError::ConfidenceOutOfRange(_))
            ));
        }
    }

    #[test]
    fn evidence_accepts_bounds() {
        assert!(Evidence::new("goal", true, None, "src/lib.rs", "seen", 0.0).is_ok());
        assert!(Evidence::new("goal", false, None, "src/lib.rs", "seen", 1.0).is_ok());
    }

    #[test]
    fn collection_failure_is_zero_confidence_negative() {
        let ev = Evidence::collection_failure("commit history", "repo_root", "clone refused");
        assert!(!ev.found);
        assert_eq!(ev.confidence, 0.0);
        assert_eq!(ev.content.as_deref(), Some("clone refused"));
    }

    #[test]
    fn opinion_rejects_out_of_range_score() {
        for bad in [0, 101, -5] {
            let res = JudicialOpinion::new("x", JudgePersona::Defense, bad, "fine", vec![]);
            assert!(matches!(
                res,
                Err(ValidationError::ScoreOutOfRange { .. })
            ));
        }
    }

    #[test]
    fn opinion_rejects_empty_argument() {
        let res = JudicialOpinion::new("x", JudgePersona::TechLead, 50, "  ", vec![]);
        assert!(matches!(res, Err(ValidationError::EmptyArgument(_))));
    }

    #[test]
    fn persona_round_trips_through_name() {
        for persona in JudgePersona::ALL {
            assert_eq!(JudgePersona::parse(persona.as_str()).unwrap(), persona);
        }
        assert!(JudgePersona::parse("Bailiff").is_err());
    }

    #[test]
    fn report_round_trips_through_json() {
        let opinion =
            JudicialOpinion::new("graph_orchestration", JudgePersona::TechLead, 70, "solid", vec![])
                .unwrap();
        let report = AuditReport {
            repo_url: "https://github.com/example/repo".into(),
            executive_summary: "done".into(),
            overall_score: 70.0,
            criteria: vec![CriterionResult {
                dimension_id: "graph_orchestration".into(),
                dimension_name: "Graph Orchestration".into(),
                final_score: 70,
                judge_opinions: vec![opinion],
                dissent_summary: None,
                remediation: "none".into(),
            }],
            remediation_plan: "none".into(),
        };
        let json = serde_json::to_string(&report).unwrap();
        let back: AuditReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
        assert_eq!(back.overall_score, report.overall_score);
    }
}
