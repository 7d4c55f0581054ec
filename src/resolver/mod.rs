//! Topic resolution: reconcile topic metadata from the artifacts left by
//! idea generation.
//!
//! Two strategies produce the same canonical `TopicRecord` list. The
//! manifest strategy trusts the generator's structured output; the discovery
//! strategy globs for markdown files and infers metadata from content. The
//! strategy is chosen once at the start of a stage-1 run, never re-decided
//! downstream.

pub mod discovery;
pub mod manifest;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;

use crate::models::TopicRecord;

/// Where stage 1 left its topic metadata.
#[derive(Debug, Clone)]
pub enum TopicSource {
    /// A structured manifest was requested and written by the generator.
    /// `generator_dir` is kept for the discovery fallback on parse failure.
    Manifest {
        manifest_path: PathBuf,
        generator_dir: PathBuf,
    },
    /// No manifest; glob the generator's working directory.
    Discovery { generator_dir: PathBuf },
}

/// Produce the canonical topic list for a stage-1 run, relocating every
/// backing file into the session's topic storage area.
///
/// A manifest that fails to read or parse is never a hard error: it logs a
/// warning and falls back to discovery against the generator's directory.
pub fn resolve_topics(source: &TopicSource, topics_dir: &Path) -> Result<Vec<TopicRecord>> {
    match source {
        TopicSource::Manifest {
            manifest_path,
            generator_dir,
        } => match manifest::resolve_from_manifest(manifest_path, topics_dir) {
            Ok(records) => Ok(records),
            Err(e) => {
                warn!(
                    "manifest resolution failed ({e:#}); falling back to discovery in {}",
                    generator_dir.display()
                );
                discovery::discover_topics(generator_dir, topics_dir)
            }
        },
        TopicSource::Discovery { generator_dir } => {
            discovery::discover_topics(generator_dir, topics_dir)
        }
    }
}

/// Move a topic file into the session's topic storage area.
///
/// Ownership transfers: a rename (with copy-then-delete fallback for
/// cross-device moves), never a duplicating copy. A file already inside the
/// storage area is left where it is.
pub(crate) fn move_into_topics(file: &Path, topics_dir: &Path) -> Result<PathBuf> {
    let name = file
        .file_name()
        .with_context(|| format!("topic file has no file name: {}", file.display()))?;
    let dest = topics_dir.join(name);

    if file == dest || file.parent() == Some(topics_dir) {
        return Ok(file.to_path_buf());
    }

    if fs::rename(file, &dest).is_err() {
        fs::copy(file, &dest).with_context(|| {
            format!(
                "failed to move topic file {} into {}",
                file.display(),
                topics_dir.display()
            )
        })?;
        fs::remove_file(file).with_context(|| {
            format!("failed to remove relocated topic file: {}", file.display())
        })?;
    }

    Ok(dest)
}
