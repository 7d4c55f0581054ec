//! Discovery strategy: glob the idea generator's working directory for
//! topic markdown files and infer display metadata from their content.
//!
//! The metadata here is heuristic by design (display hints only); the
//! manifest strategy is the precise path.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::models::topic::display_count;
use crate::models::TopicRecord;
use crate::resolver::move_into_topics;

/// Naming pattern the idea generator uses for topic files.
pub const PRIMARY_PATTERN: &str = "topic_*.md";
/// Older generator versions wrote analysis files instead.
pub const FALLBACK_PATTERN: &str = "analysis_*.md";

const TOPIC_HEADING_MARKER: &str = "# Topic";
const DESCRIPTION_LABEL: &str = "Description";
const INSIGHTS_HEADINGS: [&str; 2] = ["## Key Insights", "## Insights"];

/// Glob `search_dir` for topic files, move every match into `topics_dir`,
/// and build a record per file from its content.
pub fn discover_topics(search_dir: &Path, topics_dir: &Path) -> Result<Vec<TopicRecord>> {
    let mut files = glob_files(search_dir, PRIMARY_PATTERN)?;
    if files.is_empty() {
        files = glob_files(search_dir, FALLBACK_PATTERN)?;
    }
    files.sort();

    fs::create_dir_all(topics_dir)
        .with_context(|| format!("failed to create topics directory: {}", topics_dir.display()))?;

    let mut records = Vec::with_capacity(files.len());
    for file in files {
        let dest = move_into_topics(&file, topics_dir)?;
        let content = fs::read_to_string(&dest)
            .with_context(|| format!("failed to read topic file: {}", dest.display()))?;
        records.push(build_record(dest, &content));
    }

    debug!("discovered {} topic file(s)", records.len());
    Ok(records)
}

fn glob_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let full_pattern = dir.join(pattern);
    let full_pattern = full_pattern.to_string_lossy();

    let mut files = Vec::new();
    let entries = glob::glob(&full_pattern)
        .with_context(|| format!("invalid glob pattern: {full_pattern}"))?;
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => warn!("skipping unreadable glob entry: {e}"),
        }
    }
    Ok(files)
}

fn build_record(file_path: PathBuf, content: &str) -> TopicRecord {
    let title = extract_title(content, &file_path);
    let description = extract_description(content);

    TopicRecord {
        title,
        description,
        insights_count: count_insights(content),
        quotes_count: count_quotes(content),
        size: content.split_whitespace().count(),
        manifest_data: None,
        file_path,
    }
}

/// Title preference order: a `# Topic N: ...` heading's text after the first
/// colon, then the first markdown heading with its markers stripped, then
/// the title-cased filename stem.
fn extract_title(content: &str, file_path: &Path) -> String {
    for line in content.lines() {
        if let Some(rest) = line.strip_prefix(TOPIC_HEADING_MARKER) {
            if let Some((_, after_colon)) = rest.split_once(':') {
                let title = after_colon.trim();
                if !title.is_empty() {
                    return title.to_string();
                }
            }
        }
    }

    for line in content.lines() {
        if line.starts_with('#') {
            let title = line.trim_start_matches('#').trim();
            if !title.is_empty() {
                return title.to_string();
            }
        }
    }

    title_case_stem(file_path)
}

/// Text after a `Description:` label, or the next non-empty line when the
/// label line carries no trailing text.
fn extract_description(content: &str) -> Option<String> {
    let lines: Vec<&str> = content.lines().collect();

    for (i, line) in lines.iter().enumerate() {
        let stripped = line.trim_start_matches('#').trim();
        let Some(rest) = stripped.strip_prefix(DESCRIPTION_LABEL) else {
            continue;
        };
        // Require the label to stand alone or be followed by a colon, so
        // prose that merely starts with "Description" doesn't match.
        if !rest.is_empty() && !rest.starts_with(':') {
            continue;
        }

        let inline = rest.trim_start_matches(':').trim();
        if !inline.is_empty() {
            return Some(inline.to_string());
        }

        for next in &lines[i + 1..] {
            let text = next.trim_start_matches('#').trim();
            if !text.is_empty() {
                return Some(text.to_string());
            }
        }
        return None;
    }

    None
}

/// List-item markers under an insights heading. Zero when no such heading
/// exists, so plain bullet lists elsewhere don't count.
fn count_insights(content: &str) -> u32 {
    let has_heading = INSIGHTS_HEADINGS.iter().any(|h| content.contains(h));
    if !has_heading {
        return 0;
    }
    display_count(content.matches("- ").count())
}

fn count_quotes(content: &str) -> u32 {
    display_count(content.matches("> ").count() + content.matches("- \"").count())
}

fn title_case_stem(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("topic");

    stem.split(['_', '-', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PathBuf, PathBuf) {
        let temp = TempDir::new().unwrap();
        let search = temp.path().join("generator");
        let topics = temp.path().join("topics");
        fs::create_dir_all(&search).unwrap();
        fs::create_dir_all(&topics).unwrap();
        (temp, search, topics)
    }

    #[test]
    fn test_discovers_and_relocates_primary_pattern() {
        let (_temp, search, topics) = setup();
        fs::write(search.join("topic_1_first.md"), "# First Topic\n\nBody.\n").unwrap();
        fs::write(search.join("topic_2_second.md"), "# Second Topic\n\nBody.\n").unwrap();
        fs::write(search.join("notes.md"), "# Not A Topic\n").unwrap();

        let records = discover_topics(&search, &topics).unwrap();

        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.file_path.starts_with(&topics)));
        assert!(!search.join("topic_1_first.md").exists());
        assert!(!search.join("topic_2_second.md").exists());
        assert!(search.join("notes.md").exists());
    }

    #[test]
    fn test_falls_back_to_analysis_pattern() {
        let (_temp, search, topics) = setup();
        fs::write(search.join("analysis_1_legacy.md"), "# Legacy Topic\n").unwrap();

        let records = discover_topics(&search, &topics).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Legacy Topic");
    }

    #[test]
    fn test_fallback_ignored_when_primary_matches() {
        let (_temp, search, topics) = setup();
        fs::write(search.join("topic_1_new.md"), "# New\n").unwrap();
        fs::write(search.join("analysis_1_old.md"), "# Old\n").unwrap();

        let records = discover_topics(&search, &topics).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "New");
        assert!(search.join("analysis_1_old.md").exists());
    }

    #[test]
    fn test_empty_directory_yields_no_records() {
        let (_temp, search, topics) = setup();
        let records = discover_topics(&search, &topics).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_title_from_topic_heading_colon() {
        let content = "# Topic 3: Cloud Spend\n\nBody.\n";
        assert_eq!(
            extract_title(content, Path::new("topic_3_x.md")),
            "Cloud Spend"
        );
    }

    #[test]
    fn test_title_from_first_heading() {
        let content = "Intro line\n\n# Remote Work\n\n## Sub\n";
        assert_eq!(
            extract_title(content, Path::new("topic_2_y.md")),
            "Remote Work"
        );
    }

    #[test]
    fn test_title_falls_back_to_filename() {
        let content = "no headings here\n";
        assert_eq!(
            extract_title(content, Path::new("topic_1_cloud.md")),
            "Topic 1 Cloud"
        );
    }

    #[test]
    fn test_description_inline() {
        let content = "# T\n\nDescription: A short summary.\n";
        assert_eq!(
            extract_description(content).as_deref(),
            Some("A short summary.")
        );
    }

    #[test]
    fn test_description_from_following_line() {
        let content = "# T\n\n## Description\n\nThe summary paragraph.\nMore text.\n";
        assert_eq!(
            extract_description(content).as_deref(),
            Some("The summary paragraph.")
        );
    }

    #[test]
    fn test_description_absent() {
        assert!(extract_description("# T\n\nJust content.\n").is_none());
    }

    #[test]
    fn test_insights_require_heading() {
        let with_heading = "## Key Insights\n\n- one\n- two\n- three\n";
        assert_eq!(count_insights(with_heading), 3);

        let without_heading = "- one\n- two\n";
        assert_eq!(count_insights(without_heading), 0);
    }

    #[test]
    fn test_counts_are_capped() {
        let mut content = String::from("## Insights\n");
        for i in 0..25 {
            content.push_str(&format!("- item {i}\n"));
        }
        assert_eq!(count_insights(&content), 10);

        let quotes = "> q\n".repeat(30);
        assert_eq!(count_quotes(&quotes), 10);
    }

    #[test]
    fn test_full_record_metadata() {
        let (_temp, search, topics) = setup();
        fs::write(
            search.join("topic_1_ai.md"),
            "# Topic 1: AI in Healthcare\n\n## Key Insights\n\n- a\n- b\n\n\
             ## Notable Quotes\n\n> \"quote one\"\n\nDescription: How AI helps.\n",
        )
        .unwrap();

        let records = discover_topics(&search, &topics).unwrap();
        let record = &records[0];

        assert_eq!(record.title, "AI in Healthcare");
        assert_eq!(record.description.as_deref(), Some("How AI helps."));
        assert_eq!(record.insights_count, 2);
        assert_eq!(record.quotes_count, 1);
        assert!(record.size > 0);
        assert!(record.manifest_data.is_none());
    }
}
