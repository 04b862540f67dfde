//! Structured generation backend interface.
//!
//! The pipeline treats the backend as a capability: a prompt goes in, text
//! comes out, and the judge stage owns parsing, validation, and the bounded
//! retry loop. Anything implementing [`LlmClient`] can sit behind a judge,
//! including scripted fakes in tests.

pub mod openai;

use async_trait::async_trait;

/// One completion from a generation backend.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: String,
    pub provider: String,
    pub model: String,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Complete a prompt, optionally under a system instruction.
    async fn complete(&self, prompt: &str, system: Option<&str>) -> anyhow::Result<LlmResponse>;

    fn provider_name(&self) -> &'static str;
}

/// Backend stand-in for air-gapped runs: every call fails fast, so judge
/// stages degrade to zero opinions and the rest of the pipeline still runs.
pub struct DisabledClient;

#[async_trait]
impl LlmClient for DisabledClient {
    async fn complete(&self, _prompt: &str, _system: Option<&str>) -> anyhow::Result<LlmResponse> {
        anyhow::bail!("generation backend disabled for this run")
    }

    fn provider_name(&self) -> &'static str {
        "offline"
    }
}
