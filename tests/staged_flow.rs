//! End-to-end tests of the staged pipeline against mock external programs.
//!
//! The mocks are small shell scripts standing in for the idea and document
//! generators. Tests are serialized because external invocations switch the
//! process working directory.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use scribe::config::PipelineConfig;
use scribe::error::PipelineError;
use scribe::models::{DocumentStatus, SessionStage};
use scribe::orchestrator::{generate_all_pending, GenerationOutcome, Orchestrator, ReviewOutcome};
use scribe::store::{PendingIndex, SessionStore};
use serial_test::serial;
use tempfile::TempDir;

fn write_script(path: &Path, body: &str) -> PathBuf {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
    path.to_path_buf()
}

/// Mock idea generator: writes two topic files into its own directory.
fn mock_idea_generator(root: &Path) -> PathBuf {
    write_script(
        &root.join("idea_gen").join("cli.sh"),
        r#"cat > topic_1_ai_healthcare.md <<'EOF'
# AI in Healthcare

This is a test topic about AI in healthcare.

## Key Insights

- AI can improve diagnostics
- Machine learning helps predict outcomes

## Notable Quotes

> "AI is transforming healthcare"

Description: How AI is revolutionizing healthcare delivery.
EOF
cat > topic_2_remote_work.md <<'EOF'
# Remote Work Revolution

Exploring the shift to distributed teams.

## Key Insights

- Remote work increases productivity
EOF
echo "Mock idea generator: created 2 topic files""#,
    )
}

/// Mock document generator: copies the topic into the output directory.
/// Sleeps forever for topics whose filename contains "slow".
fn mock_doc_generator(root: &Path) -> PathBuf {
    write_script(
        &root.join("doc_gen").join("generator.sh"),
        r#"topic=""
output=""
while [ $# -gt 0 ]; do
  case "$1" in
    --topic) topic="$2"; shift 2 ;;
    --output) output="$2"; shift 2 ;;
    *) shift ;;
  esac
done
if [ ! -f "$topic" ]; then
  echo "Error: topic file not found: $topic" >&2
  exit 1
fi
case "$topic" in
  *slow*) sleep 30 ;;
esac
mkdir -p "$output"
name=$(basename "$topic" .md)
cp "$topic" "$output/${name}_document.md"
echo "Generated document: $output/${name}_document.md""#,
    )
}

fn failing_idea_generator(root: &Path) -> PathBuf {
    write_script(
        &root.join("idea_gen").join("cli.sh"),
        r#"echo "Error: Mock failure" >&2
exit 1"#,
    )
}

struct Fixture {
    _temp: TempDir,
    config: PipelineConfig,
    config_file: PathBuf,
    sessions_root: PathBuf,
    output_dir: PathBuf,
}

impl Fixture {
    fn new(idea_gen: &Path, doc_gen: &Path, temp: TempDir, extra: &str) -> Self {
        let sessions_root = temp.path().join("sessions");
        let output_dir = temp.path().join("output");

        let yaml = format!(
            r#"name: Integration Test Pipeline
global:
  mode: test
idea_generation:
  source: gmail
document_generation:
  audience: testers
  type: blog post
  size: 500 words
  output: {output}
orchestration:
  idea_generator_path: {idea}
  doc_generator_path: {doc}
  sessions_dir: {sessions}
{extra}"#,
            output = output_dir.display(),
            idea = idea_gen.display(),
            doc = doc_gen.display(),
            sessions = sessions_root.display(),
        );

        let config_file = temp.path().join("pipeline.yaml");
        fs::write(&config_file, yaml).unwrap();
        let config = PipelineConfig::load(&config_file).unwrap();

        Self {
            _temp: temp,
            config,
            config_file,
            sessions_root,
            output_dir,
        }
    }

    fn standard(extra: &str) -> Self {
        let temp = TempDir::new().unwrap();
        let idea_gen = mock_idea_generator(temp.path());
        let doc_gen = mock_doc_generator(temp.path());
        Self::new(&idea_gen, &doc_gen, temp, extra)
    }

    fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(self.config.clone(), &self.config_file, true).unwrap()
    }

    fn store(&self) -> SessionStore {
        SessionStore::new(&self.sessions_root).unwrap()
    }

    fn index(&self) -> PendingIndex {
        PendingIndex::load(self.store().root()).unwrap()
    }
}

#[test]
#[serial]
fn test_full_staged_flow() {
    let fixture = Fixture::standard("");
    let store = fixture.store();

    // Stage 1: topics discovered, relocated, session checkpointed, indexed.
    let orchestrator = fixture.orchestrator();
    let session = orchestrator.run_generate_ideas().unwrap().unwrap();
    let session_id = session.session_id.clone();

    assert_eq!(session.stage, SessionStage::IdeasGenerated);
    assert_eq!(session.topics.len(), 2);
    assert_eq!(session.topics[0].title, "AI in Healthcare");
    assert_eq!(session.topics[1].title, "Remote Work Revolution");
    assert_eq!(
        session.topics[0].description.as_deref(),
        Some("How AI is revolutionizing healthcare delivery.")
    );

    let topics_dir = store.topics_dir(&session_id);
    for topic in &session.topics {
        assert!(topic.file_path.starts_with(&topics_dir));
        assert!(topic.file_path.exists());
    }
    // Originals were moved, not copied.
    let generator_dir = fixture.config.idea_generator().unwrap();
    let generator_dir = generator_dir.parent().unwrap();
    assert!(!generator_dir.join("topic_1_ai_healthcare.md").exists());
    assert!(!generator_dir.join("topic_2_remote_work.md").exists());

    let index = fixture.index();
    assert_eq!(index.pending_reviews().len(), 1);
    assert_eq!(index.pending_reviews()[0].session_id, session_id);
    assert_eq!(index.pending_reviews()[0].topic_count, 2);
    assert!(index.awaiting_generation().is_empty());

    // Stage 2: auto-confirm selects everything, index entry moves.
    let reviewer = Orchestrator::for_session(&fixture.config, &session_id, true).unwrap();
    assert_eq!(
        reviewer.run_review_session().unwrap(),
        ReviewOutcome::Reviewed
    );

    let reviewed = store.load(&session_id).unwrap();
    assert_eq!(reviewed.stage, SessionStage::Reviewed);
    assert_eq!(reviewed.selected_topics.len(), 2);

    let index = fixture.index();
    assert!(index.pending_reviews().is_empty());
    assert_eq!(index.awaiting_generation().len(), 1);
    assert_eq!(index.awaiting_generation()[0].selected_count, 2);

    // Reviewing again is an informational no-op.
    assert_eq!(
        reviewer.run_review_session().unwrap(),
        ReviewOutcome::AlreadyPast
    );

    // Stage 3: both documents generated, session completed, index cleared.
    let generator = Orchestrator::for_session(&fixture.config, &session_id, true).unwrap();
    let outcome = generator.run_generate_documents().unwrap();
    let GenerationOutcome::Completed(documents) = outcome else {
        panic!("expected completed outcome, got {outcome:?}");
    };
    assert_eq!(documents.len(), 2);
    assert!(documents.iter().all(|d| d.is_success()));

    let completed = store.load(&session_id).unwrap();
    assert_eq!(completed.stage, SessionStage::Completed);
    assert_eq!(completed.generated_documents.len(), 2);
    assert!(fixture
        .output_dir
        .join("topic_1_ai_healthcare_document.md")
        .exists());

    assert!(fixture.index().is_empty());
}

#[test]
#[serial]
fn test_failed_idea_generation_creates_nothing() {
    let temp = TempDir::new().unwrap();
    let idea_gen = failing_idea_generator(temp.path());
    let doc_gen = mock_doc_generator(temp.path());
    let fixture = Fixture::new(&idea_gen, &doc_gen, temp, "");

    let result = fixture.orchestrator().run_generate_ideas().unwrap();
    assert!(result.is_none());

    assert!(fixture.store().list_sessions().unwrap().is_empty());
    assert!(fixture.index().is_empty());
}

#[test]
#[serial]
fn test_failure_intolerant_config_raises_hard() {
    let temp = TempDir::new().unwrap();
    let idea_gen = failing_idea_generator(temp.path());
    let doc_gen = mock_doc_generator(temp.path());
    let fixture = Fixture::new(&idea_gen, &doc_gen, temp, "  retry_on_failure: false\n");

    let err = fixture.orchestrator().run_generate_ideas().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::StageExecution { .. })
    ));
    assert!(err.to_string().contains("Error: Mock failure"));
}

#[test]
#[serial]
fn test_generate_docs_requires_review() {
    let fixture = Fixture::standard("");

    let orchestrator = fixture.orchestrator();
    let session = orchestrator.run_generate_ideas().unwrap().unwrap();
    let session_id = session.session_id;

    let generator = Orchestrator::for_session(&fixture.config, &session_id, true).unwrap();
    let err = generator.run_generate_documents().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::StagePrecondition { .. })
    ));
    assert!(err.to_string().contains("not been reviewed"));

    // The failed precondition must not have mutated stored state.
    let stored = fixture.store().load(&session_id).unwrap();
    assert_eq!(stored.stage, SessionStage::IdeasGenerated);
    assert_eq!(fixture.index().pending_reviews().len(), 1);
}

#[test]
#[serial]
fn test_generate_docs_on_completed_is_noop() {
    let fixture = Fixture::standard("");

    let orchestrator = fixture.orchestrator();
    let session = orchestrator.run_generate_ideas().unwrap().unwrap();
    let session_id = session.session_id;

    let worker = Orchestrator::for_session(&fixture.config, &session_id, true).unwrap();
    worker.run_review_session().unwrap();
    worker.run_generate_documents().unwrap();

    let before = fixture.store().load(&session_id).unwrap();
    let outcome = worker.run_generate_documents().unwrap();
    assert_eq!(outcome, GenerationOutcome::AlreadyCompleted);

    let after = fixture.store().load(&session_id).unwrap();
    assert_eq!(after.stage, SessionStage::Completed);
    assert_eq!(after.generated_documents, before.generated_documents);
}

#[test]
#[serial]
fn test_session_not_found_for_unknown_id() {
    let fixture = Fixture::standard("");

    let err = Orchestrator::for_session(&fixture.config, "29990101_000000", true).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::SessionNotFound { .. })
    ));
}

#[test]
#[serial]
fn test_document_timeout_recorded_per_topic() {
    let temp = TempDir::new().unwrap();
    // Three topics; the second one trips the mock's sleep path.
    let idea_gen = write_script(
        &temp.path().join("idea_gen").join("cli.sh"),
        r#"printf '# First Topic\n\nBody.\n' > topic_1_first.md
printf '# Slow Topic\n\nBody.\n' > topic_2_slow.md
printf '# Third Topic\n\nBody.\n' > topic_3_third.md
echo "created 3 topic files""#,
    );
    let doc_gen = mock_doc_generator(temp.path());
    let fixture = Fixture::new(&idea_gen, &doc_gen, temp, "  stage2_timeout: 1\n");

    let orchestrator = fixture.orchestrator();
    let session = orchestrator.run_generate_ideas().unwrap().unwrap();
    let session_id = session.session_id;

    let worker = Orchestrator::for_session(&fixture.config, &session_id, true).unwrap();
    worker.run_review_session().unwrap();
    let outcome = worker.run_generate_documents().unwrap();

    let GenerationOutcome::Completed(documents) = outcome else {
        panic!("expected completed outcome");
    };
    assert_eq!(documents.len(), 3);

    let failed: Vec<_> = documents
        .iter()
        .filter(|d| d.status == DocumentStatus::Failed)
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].topic, "Slow Topic");
    assert!(failed[0].error.as_ref().unwrap().contains("1s"));

    // Partial failure is still a terminal success for the batch.
    let stored = fixture.store().load(&session_id).unwrap();
    assert_eq!(stored.stage, SessionStage::Completed);
    assert!(fixture.index().is_empty());
}

#[test]
#[serial]
fn test_generate_all_pending_drains_the_index() {
    let fixture = Fixture::standard("");

    let mut session_ids = Vec::new();
    for _ in 0..2 {
        // The mock writes its topic files on every run, so each session
        // gets its own set.
        let orchestrator = fixture.orchestrator();
        let session = orchestrator.run_generate_ideas().unwrap().unwrap();
        let session_id = session.session_id;
        Orchestrator::for_session(&fixture.config, &session_id, true)
            .unwrap()
            .run_review_session()
            .unwrap();
        session_ids.push(session_id);
    }
    assert_eq!(fixture.index().awaiting_generation().len(), 2);

    generate_all_pending(&fixture.config).unwrap();

    assert!(fixture.index().is_empty());
    for session_id in session_ids {
        let session = fixture.store().load(&session_id).unwrap();
        assert_eq!(session.stage, SessionStage::Completed);
    }
}

#[test]
#[serial]
fn test_manifest_mode_uses_generator_metadata() {
    let temp = TempDir::new().unwrap();
    let idea_gen = write_script(
        &temp.path().join("idea_gen").join("cli.sh"),
        r#"manifest=""
while [ $# -gt 0 ]; do
  case "$1" in
    --output-manifest) manifest="$2"; shift 2 ;;
    *) shift ;;
  esac
done
printf '# AI in Healthcare\n\nContent.\n' > topic_1_ai.md
if [ -n "$manifest" ]; then
cat > "$manifest" <<EOF
{
  "status": "success",
  "timestamp": "2025-01-01T00:00:00",
  "mode": "test",
  "model": "gemini-1.5-flash",
  "topics": [
    {
      "id": "topic_1",
      "title": "AI in Healthcare",
      "description": "How AI is transforming healthcare",
      "file": "$PWD/topic_1_ai.md",
      "key_insights": ["Insight 1", "Insight 2", "Insight 3"],
      "notable_quotes": ["Quote 1", "Quote 2"],
      "word_count": 100
    }
  ]
}
EOF
fi"#,
    );
    let doc_gen = mock_doc_generator(temp.path());
    let fixture = Fixture::new(&idea_gen, &doc_gen, temp, "  use_manifest: true\n");

    let orchestrator = fixture.orchestrator();
    let session = orchestrator.run_generate_ideas().unwrap().unwrap();

    assert_eq!(session.topics.len(), 1);
    let topic = &session.topics[0];
    assert_eq!(topic.title, "AI in Healthcare");
    assert_eq!(
        topic.description.as_deref(),
        Some("How AI is transforming healthcare")
    );
    assert_eq!(topic.insights_count, 3);
    assert_eq!(topic.quotes_count, 2);
    assert_eq!(topic.size, 100);
    assert!(topic.manifest_data.is_some());
    assert!(topic.file_path.exists());

    // The manifest itself lands in the session directory.
    let manifest_path = fixture
        .store()
        .session_dir(&session.session_id)
        .join("ideas_manifest.json");
    assert!(manifest_path.exists());
}

#[test]
#[serial]
fn test_session_state_wire_format() {
    let fixture = Fixture::standard("");

    let orchestrator = fixture.orchestrator();
    let session = orchestrator.run_generate_ideas().unwrap().unwrap();

    let state_path = fixture.store().state_path(&session.session_id);
    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(state_path).unwrap()).unwrap();

    assert_eq!(raw["session_id"], session.session_id.as_str());
    assert_eq!(raw["stage"], "ideas_generated");
    assert!(raw["config_snapshot"]["orchestration"]["stage1_timeout"].is_u64());
    assert!(raw["created_at"].is_string());
    assert!(raw["topics"].as_array().unwrap().len() == 2);
    assert!(raw["selected_topics"].as_array().unwrap().is_empty());
    assert!(raw["generated_documents"].as_array().unwrap().is_empty());
}
