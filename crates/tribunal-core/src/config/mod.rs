//! Run configuration: rubric dimensions and audit settings.

use crate::errors::ConfigurationError;
use crate::model::RubricDimension;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the generation backend credential.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// The externally supplied evaluation rubric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rubric {
    pub dimensions: Vec<RubricDimension>,
}

impl Rubric {
    pub fn from_path(path: &Path) -> Result<Self, ConfigurationError> {
        if !path.exists() {
            return Err(ConfigurationError::NotFound(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path).map_err(|source| {
            ConfigurationError::Unreadable {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Self::from_yaml(&raw)
    }

    /// Parse and validate a rubric. An empty dimension list is allowed (it
    /// short-circuits judges downstream); empty or duplicate ids are not.
    pub fn from_yaml(raw: &str) -> Result<Self, ConfigurationError> {
        let rubric: Rubric =
            serde_yaml::from_str(raw).map_err(|e| ConfigurationError::Parse {
                context: "rubric".to_string(),
                detail: e.to_string(),
            })?;
        let mut seen = BTreeSet::new();
        for (index, dim) in rubric.dimensions.iter().enumerate() {
            if dim.id.trim().is_empty() {
                return Err(ConfigurationError::EmptyDimensionId { index });
            }
            if !seen.insert(dim.id.clone()) {
                return Err(ConfigurationError::DuplicateDimensionId(dim.id.clone()));
            }
        }
        Ok(rubric)
    }
}

/// Generation backend settings for the judge stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub request_timeout_secs: u64,
    /// Bounded retry budget for malformed structured output.
    pub max_attempts: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            max_tokens: 4096,
            request_timeout_secs: 120,
            max_attempts: 3,
        }
    }
}

impl LlmSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Full audit configuration, YAML-loadable and constructible in code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub llm: LlmSettings,
    pub reports_dir: PathBuf,
    pub clone_timeout_secs: u64,
    pub chunk_max_chars: usize,
    /// Theoretical concepts the document analyst searches for.
    pub concept_queries: Vec<String>,
    /// Expected checkout layout; entries ending in `/` are directories.
    pub layout_targets: Vec<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            llm: LlmSettings::default(),
            reports_dir: PathBuf::from("reports"),
            clone_timeout_secs: 300,
            chunk_max_chars: 1000,
            concept_queries: vec![
                "Cognitive Debt".to_string(),
                "Trust Debt".to_string(),
                "Dialectical Synthesis".to_string(),
                "Metacognition".to_string(),
            ],
            layout_targets: vec![
                "src/graph.py".to_string(),
                "src/state.py".to_string(),
                "src/nodes/".to_string(),
                "src/tools/".to_string(),
            ],
        }
    }
}

impl AuditConfig {
    pub fn from_path(path: &Path) -> Result<Self, ConfigurationError> {
        if !path.exists() {
            return Err(ConfigurationError::NotFound(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path).map_err(|source| {
            ConfigurationError::Unreadable {
                path: path.to_path_buf(),
                source,
            }
        })?;
        serde_yaml::from_str(&raw).map_err(|e| ConfigurationError::Parse {
            context: format!("config {}", path.display()),
            detail: e.to_string(),
        })
    }

    pub fn clone_timeout(&self) -> Duration {
        Duration::from_secs(self.clone_timeout_secs)
    }
}

/// Read the backend credential from the environment.
pub fn api_key_from_env() -> Result<String, ConfigurationError> {
    std::env::var(API_KEY_ENV).map_err(|_| ConfigurationError::MissingCredential(API_KEY_ENV))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rubric_parses_dimensions() {
        let rubric = Rubric::from_yaml(
            "dimensions:\n  - id: git_history\n    name: Git History Hygiene\n  - id: graph_orchestration\n    name: Graph Orchestration\n",
        )
        .unwrap();
        assert_eq!(rubric.dimensions.len(), 2);
        assert_eq!(rubric.dimensions[0].id, "git_history");
    }

    #[test]
    fn rubric_rejects_duplicate_ids() {
        let err = Rubric::from_yaml(
            "dimensions:\n  - id: a\n    name: A\n  - id: a\n    name: Again\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::DuplicateDimensionId(_)));
    }

    #[test]
    fn rubric_rejects_empty_ids() {
        let err =
            Rubric::from_yaml("dimensions:\n  - id: \"\"\n    name: Nameless\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::EmptyDimensionId { index: 0 }
        ));
    }

    #[test]
    fn rubric_allows_empty_dimension_list() {
        let rubric = Rubric::from_yaml("dimensions: []\n").unwrap();
        assert!(rubric.dimensions.is_empty());
    }

    #[test]
    fn audit_config_defaults_fill_missing_fields() {
        let cfg: AuditConfig = serde_yaml::from_str("llm:\n  model: gpt-4o\n").unwrap();
        assert_eq!(cfg.llm.model, "gpt-4o");
        assert_eq!(cfg.llm.max_attempts, 3);
        assert_eq!(cfg.reports_dir, PathBuf::from("reports"));
        assert!(!cfg.concept_queries.is_empty());
    }

    #[test]
    fn missing_rubric_file_is_a_configuration_error() {
        let err = Rubric::from_path(Path::new("/no/such/rubric.yaml")).unwrap_err();
        assert!(matches!(err, ConfigurationError::NotFound(_)));
    }
}
