//! Topic records and the idea-generator manifest format.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Display counters are capped so a noisy document can't blow up the review
/// table.
pub const MAX_DISPLAY_COUNT: u32 = 10;

/// One candidate topic produced by idea generation.
///
/// Created once per run and never mutated afterwards; the backing file is
/// owned by the session's topic storage area (moved there if it was written
/// elsewhere).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicRecord {
    /// Markdown artifact inside the session's topics directory.
    pub file_path: PathBuf,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Display hint, capped at 10. Exact for manifest-sourced topics,
    /// heuristic for discovered ones.
    pub insights_count: u32,
    /// Display hint, capped at 10.
    pub quotes_count: u32,
    /// Whitespace-delimited word count of the backing artifact.
    pub size: usize,
    /// Full manifest entry when sourced from a manifest; absent for
    /// discovery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_data: Option<ManifestTopic>,
}

/// Manifest written by the idea generator in batch mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicManifest {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub topics: Vec<ManifestTopic>,
}

/// One topic entry in the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestTopic {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub file: PathBuf,
    #[serde(default)]
    pub key_insights: Vec<String>,
    #[serde(default)]
    pub notable_quotes: Vec<String>,
    #[serde(default)]
    pub word_count: usize,
}

/// Cap a raw occurrence count at the display limit.
pub fn display_count(raw: usize) -> u32 {
    raw.min(MAX_DISPLAY_COUNT as usize) as u32
}
