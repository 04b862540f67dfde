use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "tribunal",
    version,
    about = "Automated repository audit: forensic detectives, a judicial panel, and a deterministic verdict"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a full audit over a repository and optional report document
    Audit(AuditArgs),
    /// Rubric management
    Rubric(RubricArgs),
    Version,
}

#[derive(Parser, Debug)]
pub struct AuditArgs {
    /// Repository locator (URL or local path) to audit
    #[arg(long)]
    pub repo: String,

    /// Accompanying report document (text or markdown)
    #[arg(long)]
    pub doc: Option<PathBuf>,

    /// Rubric YAML with the evaluation dimensions
    #[arg(long)]
    pub rubric: PathBuf,

    /// Audit configuration YAML; defaults apply when omitted
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Reports directory override
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Generation backend for the judge panel
    #[arg(long, value_enum, default_value = "openai")]
    pub provider: ProviderKind,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderKind {
    /// OpenAI-compatible chat completions (needs OPENAI_API_KEY)
    Openai,
    /// No backend: judges degrade to zero opinions, detectives still run
    Offline,
}

#[derive(Parser, Debug)]
pub struct RubricArgs {
    #[command(subcommand)]
    pub cmd: RubricCmd,
}

#[derive(Subcommand, Debug)]
pub enum RubricCmd {
    /// Validate a rubric file and list its dimensions
    Check {
        #[arg(long)]
        rubric: PathBuf,
    },
}
