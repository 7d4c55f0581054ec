//! Process-wide pending index over stored sessions.
//!
//! A single JSON file (`<root>/pending_index.json`) with two ordered lists:
//! sessions awaiting human review and reviewed sessions awaiting document
//! generation. A session id appears in at most one list; once completed it
//! appears in neither. All mutations are idempotent and the index tolerates
//! a missing file (treated as two empty lists).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const INDEX_FILE: &str = "pending_index.json";

/// A session at `ideas_generated`, waiting for a reviewer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingReview {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub topic_count: usize,
    pub config_name: String,
}

/// A reviewed session waiting for document generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AwaitingGeneration {
    pub session_id: String,
    pub reviewed_at: DateTime<Utc>,
    pub selected_count: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PendingIndex {
    #[serde(default)]
    pending_reviews: Vec<PendingReview>,
    #[serde(default)]
    reviewed_awaiting_generation: Vec<AwaitingGeneration>,
}

impl PendingIndex {
    fn path(root: &Path) -> PathBuf {
        root.join(INDEX_FILE)
    }

    /// Load the index from the sessions root. A missing file is two empty
    /// lists, not an error.
    pub fn load(root: &Path) -> Result<Self> {
        let path = Self::path(root);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read pending index: {}", path.display()))?;

        let index: PendingIndex = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse pending index: {}", path.display()))?;

        Ok(index)
    }

    /// Write the whole index back. Read-modify-write with no locking;
    /// concurrent writers can race (documented limitation).
    pub fn save(&self, root: &Path) -> Result<()> {
        let path = Self::path(root);
        fs::create_dir_all(root)
            .with_context(|| format!("failed to create sessions root: {}", root.display()))?;

        let json =
            serde_json::to_string_pretty(self).context("failed to serialize pending index")?;
        fs::write(&path, json)
            .with_context(|| format!("failed to write pending index: {}", path.display()))?;

        Ok(())
    }

    /// Register a session as awaiting review. Re-adding an id replaces its
    /// entry in place rather than duplicating it.
    pub fn add_pending_review(
        &mut self,
        session_id: &str,
        created_at: DateTime<Utc>,
        topic_count: usize,
        config_name: &str,
    ) {
        let entry = PendingReview {
            session_id: session_id.to_string(),
            created_at,
            topic_count,
            config_name: config_name.to_string(),
        };

        if let Some(existing) = self
            .pending_reviews
            .iter_mut()
            .find(|e| e.session_id == session_id)
        {
            *existing = entry;
        } else {
            self.pending_reviews.push(entry);
        }
    }

    /// Move a session from the review list to the generation list. The
    /// review entry (if any) is removed; the generation entry is stamped
    /// with the current time, replacing any prior entry for the id.
    pub fn move_to_awaiting_generation(&mut self, session_id: &str, selected_count: usize) {
        self.pending_reviews.retain(|e| e.session_id != session_id);

        let entry = AwaitingGeneration {
            session_id: session_id.to_string(),
            reviewed_at: Utc::now(),
            selected_count,
        };

        if let Some(existing) = self
            .reviewed_awaiting_generation
            .iter_mut()
            .find(|e| e.session_id == session_id)
        {
            *existing = entry;
        } else {
            self.reviewed_awaiting_generation.push(entry);
        }
    }

    /// Drop a session from the generation list. Removing an absent id is a
    /// no-op.
    pub fn remove_from_awaiting_generation(&mut self, session_id: &str) {
        self.reviewed_awaiting_generation
            .retain(|e| e.session_id != session_id);
    }

    /// Sessions awaiting review, in insertion order.
    pub fn pending_reviews(&self) -> &[PendingReview] {
        &self.pending_reviews
    }

    /// Reviewed sessions awaiting generation, in insertion order.
    pub fn awaiting_generation(&self) -> &[AwaitingGeneration] {
        &self.reviewed_awaiting_generation
    }

    pub fn is_empty(&self) -> bool {
        self.pending_reviews.is_empty() && self.reviewed_awaiting_generation.is_empty()
    }
}
