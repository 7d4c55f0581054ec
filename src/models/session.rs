//! Session state: one end-to-end pipeline run, checkpointed at each stage
//! boundary.

use std::path::PathBuf;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::models::topic::TopicRecord;

/// Maximum length of a recorded failure detail.
const MAX_ERROR_CHARS: usize = 200;

/// Stage of a session in the pipeline lifecycle.
///
/// Transitions are strictly linear and forward-only:
/// `IdeasGenerated` -> `Reviewed` -> `Completed`. Nothing else is valid, and
/// a stage never regresses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SessionStage {
    /// Stage 1 finished; topics are stored and awaiting human review.
    IdeasGenerated,
    /// A subset of topics was selected; awaiting document generation.
    Reviewed,
    /// Document generation ran for every selected topic; terminal state.
    Completed,
}

impl std::fmt::Display for SessionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStage::IdeasGenerated => write!(f, "ideas_generated"),
            SessionStage::Reviewed => write!(f, "reviewed"),
            SessionStage::Completed => write!(f, "completed"),
        }
    }
}

impl SessionStage {
    /// Check whether advancing from the current stage to `new_stage` is valid.
    pub fn can_transition_to(&self, new_stage: SessionStage) -> bool {
        matches!(
            (self, new_stage),
            (SessionStage::IdeasGenerated, SessionStage::Reviewed)
                | (SessionStage::Reviewed, SessionStage::Completed)
        )
    }

    /// Attempt to advance to `new_stage`, returning an error if invalid.
    pub fn try_transition(&self, new_stage: SessionStage) -> Result<SessionStage> {
        if self.can_transition_to(new_stage) {
            Ok(new_stage)
        } else {
            bail!("invalid session stage transition: {self} -> {new_stage}")
        }
    }
}

/// A topic chosen by the reviewer, referenced by title and backing file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectedTopic {
    pub title: String,
    pub file: PathBuf,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Success,
    Failed,
}

/// Outcome of generating one document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentResult {
    pub topic: String,
    pub status: DocumentStatus,
    /// Captured program output; present on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Failure detail, truncated to 200 characters; present on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DocumentResult {
    pub fn success(topic: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            status: DocumentStatus::Success,
            output: Some(output.into()),
            error: None,
        }
    }

    pub fn failed(topic: impl Into<String>, error: &str) -> Self {
        Self {
            topic: topic.into(),
            status: DocumentStatus::Failed,
            output: None,
            error: Some(truncate_chars(error, MAX_ERROR_CHARS)),
        }
    }

    /// Failure caused by the invocation exceeding its timeout budget.
    pub fn timed_out(topic: impl Into<String>, seconds: u64) -> Self {
        let error = crate::error::PipelineError::StageTimeout {
            stage: "document generation".to_string(),
            seconds,
        };
        Self::failed(topic, &error.to_string())
    }

    pub fn is_success(&self) -> bool {
        self.status == DocumentStatus::Success
    }
}

/// Durable record of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub config_file: PathBuf,
    /// Configuration captured at session creation; later config file edits
    /// never affect an in-flight session.
    pub config_snapshot: PipelineConfig,
    pub stage: SessionStage,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub topics: Vec<TopicRecord>,
    #[serde(default)]
    pub selected_topics: Vec<SelectedTopic>,
    #[serde(default)]
    pub generated_documents: Vec<DocumentResult>,
}

impl Session {
    /// Create a session entering `IdeasGenerated` with its topic list.
    pub fn new(
        session_id: impl Into<String>,
        config_file: impl Into<PathBuf>,
        config_snapshot: PipelineConfig,
        topics: Vec<TopicRecord>,
    ) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            config_file: config_file.into(),
            config_snapshot,
            stage: SessionStage::IdeasGenerated,
            created_at: now,
            updated_at: now,
            topics,
            selected_topics: Vec::new(),
            generated_documents: Vec::new(),
        }
    }

    /// Advance to `Reviewed` with the reviewer's selection.
    pub fn mark_reviewed(&mut self, selected: Vec<SelectedTopic>) -> Result<()> {
        self.stage = self.stage.try_transition(SessionStage::Reviewed)?;
        self.selected_topics = selected;
        Ok(())
    }

    /// Advance to `Completed` with one result per selected topic. Partial
    /// failure is a valid terminal outcome.
    pub fn mark_completed(&mut self, documents: Vec<DocumentResult>) -> Result<()> {
        self.stage = self.stage.try_transition(SessionStage::Completed)?;
        self.generated_documents = documents;
        Ok(())
    }
}

/// Truncate a string by character count, not byte count, so a multi-byte
/// character is never split.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}
