//! Manifest strategy: trust the structured manifest written by the idea
//! generator in batch mode.
//!
//! Counts come from the manifest's list lengths rather than being recomputed
//! from content, so manifest-sourced records are exact where discovered ones
//! are heuristic.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::models::topic::display_count;
use crate::models::{TopicManifest, TopicRecord};
use crate::resolver::move_into_topics;

/// Build topic records from a manifest file, relocating each listed file
/// into `topics_dir`.
///
/// A listed file missing from disk is skipped with a warning, not a
/// failure. Read/parse errors propagate to the caller, which falls back to
/// discovery.
pub fn resolve_from_manifest(manifest_path: &Path, topics_dir: &Path) -> Result<Vec<TopicRecord>> {
    let content = fs::read_to_string(manifest_path)
        .with_context(|| format!("failed to read manifest: {}", manifest_path.display()))?;

    let manifest: TopicManifest = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse manifest: {}", manifest_path.display()))?;

    fs::create_dir_all(topics_dir)
        .with_context(|| format!("failed to create topics directory: {}", topics_dir.display()))?;

    let mut records = Vec::with_capacity(manifest.topics.len());
    for topic in manifest.topics {
        if !topic.file.exists() {
            warn!(
                "manifest entry '{}' points at missing file {}, skipping",
                topic.id,
                topic.file.display()
            );
            continue;
        }

        let dest = move_into_topics(&topic.file, topics_dir)?;
        records.push(TopicRecord {
            file_path: dest,
            title: topic.title.clone(),
            description: topic.description.clone(),
            insights_count: display_count(topic.key_insights.len()),
            quotes_count: display_count(topic.notable_quotes.len()),
            size: topic.word_count,
            manifest_data: Some(topic),
        });
    }

    debug!("resolved {} topic(s) from manifest", records.len());
    Ok(records)
}
