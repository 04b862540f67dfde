//! Error taxonomy for the audit pipeline.
//!
//! Collaborator failures (`SourceFetchError`, `HistoryReadError`,
//! `DocumentLoadError`) are caught at the detective boundary and converted
//! into negative evidence; they never cross into the orchestration graph.
//! `ValidationError` drives the judge retry loop. `ConfigurationError`
//! short-circuits a stage and, at worst, yields a halted report.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to fetch the audited source (network, auth, bad locator).
#[derive(Debug, Error)]
pub enum SourceFetchError {
    #[error("failed to clone {url}: {stderr}")]
    CloneFailed { url: String, stderr: String },
    #[error("clone of {url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },
    #[error("failed to spawn git: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Failure to read commit history from a local checkout.
#[derive(Debug, Error)]
pub enum HistoryReadError {
    #[error("git log failed in {path}: {stderr}")]
    GitLog { path: PathBuf, stderr: String },
    #[error("failed to run git in {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure to ingest the accompanying report document.
#[derive(Debug, Error)]
pub enum DocumentLoadError {
    #[error("document not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read document {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Malformed or incomplete structured output from the generation backend.
///
/// The `Display` text is fed back to the backend verbatim as corrective
/// feedback on the next attempt, so each variant spells out what to fix.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("response was not valid JSON for the requested schema: {detail}")]
    Malformed { detail: String },
    #[error("opinions list was empty; return exactly one opinion per rubric dimension")]
    EmptyOpinions,
    #[error("unknown judge persona {0:?}")]
    UnknownJudge(String),
    #[error("opinion carried judge {got:?} but this panel seat is {expected:?}")]
    WrongJudge { expected: String, got: String },
    #[error("criterion_id {0:?} is not in the rubric; use only the provided dimension ids")]
    UnknownCriterion(String),
    #[error("score {score} for {criterion_id:?} is outside 1..=100")]
    ScoreOutOfRange { criterion_id: String, score: i64 },
    #[error("argument for {0:?} was empty; every opinion needs a non-empty argument")]
    EmptyArgument(String),
    #[error("missing opinions for dimensions: {}", .0.join(", "))]
    MissingDimensions(Vec<String>),
    #[error("confidence {0} is outside 0.0..=1.0")]
    ConfidenceOutOfRange(f64),
    #[error("evidence field {0:?} was empty")]
    EmptyEvidenceField(&'static str),
}

/// Invalid or missing run configuration (rubric, config file, credentials).
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {context}: {detail}")]
    Parse { context: String, detail: String },
    #[error("rubric dimension at index {index} has an empty id")]
    EmptyDimensionId { index: usize },
    #[error("rubric contains duplicate dimension id {0:?}")]
    DuplicateDimensionId(String),
    #[error("missing credential: environment variable {0} is not set")]
    MissingCredential(&'static str),
}

/// Structural defect in a graph definition, detected at build time.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("duplicate node name {0:?}")]
    DuplicateNode(String),
    #[error("node name {0:?} is reserved")]
    ReservedNode(String),
    #[error("edge {from:?} -> {to:?} references an unknown node")]
    UnknownEdgeEndpoint { from: String, to: String },
    #[error("edge {from:?} -> {to:?} is not allowed (nothing leaves the end, nothing enters the start)")]
    InvalidEndpoint { from: String, to: String },
    #[error("node {0:?} is not reachable from the start")]
    Unreachable(String),
    #[error("the end node is not reachable from the start")]
    EndUnreachable,
    #[error("graph contains a cycle through: {}", .0.join(", "))]
    Cycle(Vec<String>),
}
