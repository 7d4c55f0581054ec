//! Pipeline configuration loaded from a YAML file.
//!
//! The parsed [`PipelineConfig`] is the same type that gets embedded in each
//! session's state file as `config_snapshot`, so resuming a session is plain
//! deserialization of the snapshot — a later edit to the config file cannot
//! affect an in-flight session.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub idea_generation: IdeaGenerationConfig,
    #[serde(default)]
    pub document_generation: DocumentGenerationConfig,
    #[serde(default)]
    pub orchestration: OrchestrationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default = "default_mode")]
    pub mode: String,
}

/// Stage 1: idea generation. Optional fields map one-to-one onto the idea
/// generator's command-line filters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdeaGenerationConfig {
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub focus: Option<String>,
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(default)]
    pub email_subject: Option<String>,
    #[serde(default)]
    pub combined_topics: bool,
    #[serde(default)]
    pub fast: bool,
}

/// Stage 3: document generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentGenerationConfig {
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub audience: String,
    #[serde(rename = "type", default = "default_doc_type")]
    pub doc_type: String,
    #[serde(default = "default_doc_size")]
    pub size: String,
    #[serde(default)]
    pub customer_story: Option<String>,
    #[serde(default = "default_output")]
    pub output: String,
    /// Overrides `global.mode` for document generation only.
    #[serde(default)]
    pub mode: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationConfig {
    /// Seconds before the idea-generation invocation is killed.
    #[serde(default = "default_stage1_timeout")]
    pub stage1_timeout: u64,
    /// Seconds before a single document-generation invocation is killed.
    #[serde(default = "default_stage2_timeout")]
    pub stage2_timeout: u64,
    /// When true, a failed document invocation is recorded and the batch
    /// continues. When false, the first failure aborts the batch.
    #[serde(default = "default_true")]
    pub retry_on_failure: bool,
    #[serde(default = "default_true")]
    pub save_session: bool,
    #[serde(default)]
    pub idea_generator_path: Option<PathBuf>,
    #[serde(default)]
    pub doc_generator_path: Option<PathBuf>,
    #[serde(default)]
    pub log_level: Option<String>,
    /// Request a structured manifest from the idea generator instead of
    /// inferring topic metadata from markdown content.
    #[serde(default)]
    pub use_manifest: bool,
    /// Run the idea generator non-interactively with captured output.
    #[serde(default)]
    pub batch_mode: bool,
    #[serde(default = "default_sessions_dir")]
    pub sessions_dir: PathBuf,
}

fn default_name() -> String {
    "Content Pipeline".to_string()
}

fn default_mode() -> String {
    "test".to_string()
}

fn default_source() -> String {
    "gmail".to_string()
}

fn default_doc_type() -> String {
    "blog post".to_string()
}

fn default_doc_size() -> String {
    "800 words".to_string()
}

fn default_output() -> String {
    "./output".to_string()
}

fn default_stage1_timeout() -> u64 {
    600
}

fn default_stage2_timeout() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

fn default_sessions_dir() -> PathBuf {
    PathBuf::from("sessions")
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
        }
    }
}

impl Default for IdeaGenerationConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            start_date: None,
            label: None,
            focus: None,
            folder_id: None,
            email_subject: None,
            combined_topics: false,
            fast: false,
        }
    }
}

impl Default for DocumentGenerationConfig {
    fn default() -> Self {
        Self {
            style: String::new(),
            audience: String::new(),
            doc_type: default_doc_type(),
            size: default_doc_size(),
            customer_story: None,
            output: default_output(),
            mode: None,
        }
    }
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            stage1_timeout: default_stage1_timeout(),
            stage2_timeout: default_stage2_timeout(),
            retry_on_failure: true,
            save_session: true,
            idea_generator_path: None,
            doc_generator_path: None,
            log_level: None,
            use_manifest: false,
            batch_mode: false,
            sessions_dir: default_sessions_dir(),
        }
    }
}

impl PipelineConfig {
    /// Load and validate a pipeline configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Configuration(format!(
                "failed to read config file {}: {e}",
                path.display()
            ))
        })?;

        let config: PipelineConfig = serde_yaml::from_str(&content).map_err(|e| {
            PipelineError::Configuration(format!(
                "failed to parse config file {}: {e}",
                path.display()
            ))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate settings that would otherwise fail mid-run.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.orchestration.stage1_timeout == 0 {
            return Err(PipelineError::Configuration(
                "orchestration.stage1_timeout must be greater than zero".to_string(),
            ));
        }
        if self.orchestration.stage2_timeout == 0 {
            return Err(PipelineError::Configuration(
                "orchestration.stage2_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the idea generator program path. Fatal if unset or missing.
    pub fn idea_generator(&self) -> Result<PathBuf, PipelineError> {
        resolve_program(
            self.orchestration.idea_generator_path.as_deref(),
            "orchestration.idea_generator_path",
        )
    }

    /// Resolve the document generator program path. Fatal if unset or missing.
    pub fn doc_generator(&self) -> Result<PathBuf, PipelineError> {
        resolve_program(
            self.orchestration.doc_generator_path.as_deref(),
            "orchestration.doc_generator_path",
        )
    }

    /// Effective mode for document generation: the stage override when
    /// present, the global mode otherwise.
    pub fn document_mode(&self) -> &str {
        self.document_generation
            .mode
            .as_deref()
            .unwrap_or(&self.global.mode)
    }

    pub fn stage1_timeout(&self) -> Duration {
        Duration::from_secs(self.orchestration.stage1_timeout)
    }

    pub fn stage2_timeout(&self) -> Duration {
        Duration::from_secs(self.orchestration.stage2_timeout)
    }
}

/// Resolve a configured program path: explicit paths must exist on disk,
/// bare names are looked up on PATH.
fn resolve_program(configured: Option<&Path>, key: &str) -> Result<PathBuf, PipelineError> {
    let path = configured
        .ok_or_else(|| PipelineError::Configuration(format!("{key} is required")))?;

    if path.components().count() == 1 && !path.exists() {
        return which::which(path).map_err(|_| {
            PipelineError::Configuration(format!(
                "{key}: program '{}' not found on PATH",
                path.display()
            ))
        });
    }

    if !path.exists() {
        return Err(PipelineError::Configuration(format!(
            "{key}: program not found at {}",
            path.display()
        )));
    }

    Ok(path.to_path_buf())
}
