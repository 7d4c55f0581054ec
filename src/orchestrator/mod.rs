//! Top-level state machine driver.
//!
//! Each staged entry point validates the stored stage, dispatches to the
//! stage runner, and persists the resulting transition. The full `run()` is
//! a linear composition of the three staged calls with interactive
//! checkpoints between them, not a separate code path.

pub mod review;

use std::path::PathBuf;

use anyhow::Result;
use chrono::Local;
use colored::Colorize;
use tracing::warn;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::models::{DocumentResult, SelectedTopic, Session, SessionStage};
use crate::runner::documents::DocumentStage;
use crate::runner::ideas::IdeaStage;
use crate::store::{PendingIndex, SessionStore};

/// What a review call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewOutcome {
    /// Selection persisted; session advanced to `reviewed`.
    Reviewed,
    /// Reviewer selected nothing; session untouched at `ideas_generated`.
    NoSelection,
    /// Session was already reviewed or completed; informational no-op.
    AlreadyPast,
}

/// What a document-generation call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// Batch ran; session advanced to `completed` (possibly with per-topic
    /// failures recorded).
    Completed(Vec<DocumentResult>),
    /// Session was already completed; informational no-op.
    AlreadyCompleted,
    /// Reviewer declined the parameter confirmation; session untouched.
    Cancelled,
}

#[derive(Debug)]
pub struct Orchestrator {
    config: PipelineConfig,
    config_file: PathBuf,
    session_id: String,
    store: SessionStore,
    auto_confirm: bool,
}

impl Orchestrator {
    /// Build an orchestrator for a fresh run. Both external program paths
    /// are resolved here so a misconfiguration fails at startup, not after
    /// the user already reviewed topics.
    pub fn new(
        config: PipelineConfig,
        config_file: impl Into<PathBuf>,
        auto_confirm: bool,
    ) -> Result<Self> {
        config.idea_generator()?;
        config.doc_generator()?;
        if !config.orchestration.save_session {
            warn!("orchestration.save_session=false is ignored; staged sessions always persist");
        }

        let store = SessionStore::new(&config.orchestration.sessions_dir)?;
        let session_id = next_session_id(&store);

        Ok(Self {
            config,
            config_file: config_file.into(),
            session_id,
            store,
            auto_confirm,
        })
    }

    /// Bind to an existing session found through the live config's sessions
    /// root. The stored `config_snapshot` governs the run from here on.
    pub fn for_session(
        live_config: &PipelineConfig,
        session_id: &str,
        auto_confirm: bool,
    ) -> Result<Self> {
        let store = SessionStore::new(&live_config.orchestration.sessions_dir)?;
        Self::from_saved(store, session_id, auto_confirm)
    }

    /// Reconstruct an orchestrator from a persisted session snapshot. Plain
    /// deserialization: the snapshot and the live configuration are the same
    /// type.
    pub fn from_saved(store: SessionStore, session_id: &str, auto_confirm: bool) -> Result<Self> {
        let session = store.load(session_id)?;
        Ok(Self {
            config: session.config_snapshot,
            config_file: session.config_file,
            session_id: session.session_id,
            store,
            auto_confirm,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Stage 1: generate ideas and checkpoint the session.
    ///
    /// On a non-empty topic list the session is persisted at
    /// `ideas_generated` and registered for review. An empty result (failed,
    /// timed-out, or genuinely idea-free invocation) creates no session
    /// state and no index entries.
    pub fn run_generate_ideas(&self) -> Result<Option<Session>> {
        println!("\n{}", "Stage 1: Generating topic ideas".bold());

        if !review::confirm("Ready to start idea generation?", true, self.auto_confirm)? {
            println!("{}", "Cancelled.".yellow());
            return Ok(None);
        }

        self.store.create_session_dirs(&self.session_id)?;
        let program = self.config.idea_generator()?;
        let session_dir = self.store.session_dir(&self.session_id);
        let topics_dir = self.store.topics_dir(&self.session_id);

        let stage = IdeaStage {
            config: &self.config,
            program: &program,
            session_dir: &session_dir,
            topics_dir: &topics_dir,
            auto_confirm: self.auto_confirm,
        };
        let topics = stage.run()?;

        if topics.is_empty() {
            println!(
                "{}",
                "No topic files found. Make sure the idea generator saved topics.".yellow()
            );
            return Ok(None);
        }

        println!("{} Found {} topic file(s)", "✓".green(), topics.len());

        let mut session = Session::new(
            &self.session_id,
            &self.config_file,
            self.config.clone(),
            topics,
        );
        self.store.save(&mut session)?;

        let mut index = PendingIndex::load(self.store.root())?;
        index.add_pending_review(
            &self.session_id,
            session.created_at,
            session.topics.len(),
            &self.config.name,
        );
        index.save(self.store.root())?;

        println!(
            "{} Session {} awaiting review (run with --review --session {})",
            "✓".green(),
            self.session_id.bold(),
            self.session_id
        );
        Ok(Some(session))
    }

    /// Stage 2: review and select topics.
    ///
    /// Requires the session at `ideas_generated`. Reviewing is not
    /// destructive but also not repeatable: an already-reviewed or completed
    /// session is a no-op success, never an error.
    pub fn run_review_session(&self) -> Result<ReviewOutcome> {
        let mut session = self.store.load(&self.session_id)?;

        if session.stage != SessionStage::IdeasGenerated {
            println!(
                "{} Session {} is already {}; nothing to review.",
                "ℹ".blue(),
                self.session_id,
                session.stage
            );
            return Ok(ReviewOutcome::AlreadyPast);
        }

        println!(
            "\n{}",
            format!("Stage 2: Review topics for session {}", self.session_id).bold()
        );
        review::display_topics(&session.topics);

        let indices = review::select_topics(&session.topics, self.auto_confirm)?;
        if indices.is_empty() {
            println!(
                "{}",
                "No topics selected; session remains awaiting review.".yellow()
            );
            return Ok(ReviewOutcome::NoSelection);
        }

        let selected: Vec<SelectedTopic> = indices
            .iter()
            .map(|&i| SelectedTopic {
                title: session.topics[i].title.clone(),
                file: session.topics[i].file_path.clone(),
            })
            .collect();
        let selected_count = selected.len();

        session.mark_reviewed(selected)?;
        self.store.save(&mut session)?;

        let mut index = PendingIndex::load(self.store.root())?;
        index.move_to_awaiting_generation(&self.session_id, selected_count);
        index.save(self.store.root())?;

        println!(
            "{} Selected {} topic(s); session ready for document generation.",
            "✓".green(),
            selected_count
        );
        Ok(ReviewOutcome::Reviewed)
    }

    /// Stage 3: generate documents for the reviewed selection.
    ///
    /// Requires the session at `reviewed` exactly: `ideas_generated` is a
    /// hard precondition error, `completed` a no-op success. The session
    /// advances to `completed` regardless of per-topic failures.
    pub fn run_generate_documents(&self) -> Result<GenerationOutcome> {
        let mut session = self.store.load(&self.session_id)?;

        match session.stage {
            SessionStage::Completed => {
                println!(
                    "{} Session {} is already completed; nothing to generate.",
                    "ℹ".blue(),
                    self.session_id
                );
                return Ok(GenerationOutcome::AlreadyCompleted);
            }
            SessionStage::IdeasGenerated => {
                return Err(PipelineError::StagePrecondition {
                    session_id: self.session_id.clone(),
                    expected: SessionStage::Reviewed.to_string(),
                    actual: session.stage.to_string(),
                    detail: "session has not been reviewed yet".to_string(),
                }
                .into());
            }
            SessionStage::Reviewed => {}
        }

        let program = self.config.doc_generator()?;

        if !review::confirm_parameters(
            &self.config,
            session.selected_topics.len(),
            self.auto_confirm,
        )? {
            println!("{}", "Cancelled by user.".yellow());
            return Ok(GenerationOutcome::Cancelled);
        }

        println!("\n{}", "Stage 3: Generating documents".bold());
        let stage = DocumentStage {
            config: &self.config,
            program: &program,
        };
        let documents = stage.run(&session.selected_topics)?;

        session.mark_completed(documents.clone())?;
        self.store.save(&mut session)?;

        let mut index = PendingIndex::load(self.store.root())?;
        index.remove_from_awaiting_generation(&self.session_id);
        index.save(self.store.root())?;

        Ok(GenerationOutcome::Completed(documents))
    }

    /// Full sequential run: the three staged transitions in one process
    /// invocation, with the same preconditions and persistence as the
    /// staged entry points.
    pub fn run(&self) -> Result<()> {
        println!("{}", crate::LOGO.cyan());
        println!(
            "{}  mode: {}  session: {}",
            self.config.name.bold(),
            self.config.global.mode.yellow(),
            self.session_id.dimmed()
        );

        if self.run_generate_ideas()?.is_none() {
            return Ok(());
        }

        match self.run_review_session()? {
            ReviewOutcome::NoSelection => return Ok(()),
            ReviewOutcome::Reviewed | ReviewOutcome::AlreadyPast => {}
        }

        if let GenerationOutcome::Completed(documents) = self.run_generate_documents()? {
            self.print_summary(&documents)?;
        }
        Ok(())
    }

    fn print_summary(&self, documents: &[DocumentResult]) -> Result<()> {
        let session = self.store.load(&self.session_id)?;
        let successful = documents.iter().filter(|d| d.is_success()).count();
        let failed = documents.len() - successful;

        println!("\n{}", "═".repeat(60));
        println!("{}", "Orchestration complete".green().bold());
        println!("{}", "═".repeat(60));
        println!(
            "  {:<22} {}",
            "Topic files found".cyan(),
            session.topics.len()
        );
        println!(
            "  {:<22} {}",
            "Topics selected".cyan(),
            session.selected_topics.len()
        );
        if failed > 0 {
            println!(
                "  {:<22} {} success, {} failed",
                "Documents created".cyan(),
                successful,
                failed
            );
        } else {
            println!("  {:<22} {}", "Documents created".cyan(), successful);
        }
        println!("  {:<22} {}", "Session".cyan(), self.session_id);
        Ok(())
    }
}

/// Run document generation for every session awaiting it, auto-confirming
/// all prompts. One session's failure never aborts the rest of the batch.
pub fn generate_all_pending(config: &PipelineConfig) -> Result<()> {
    let store = SessionStore::new(&config.orchestration.sessions_dir)?;
    let index = PendingIndex::load(store.root())?;
    let entries = index.awaiting_generation().to_vec();

    if entries.is_empty() {
        println!("{} No sessions awaiting document generation.", "ℹ".blue());
        return Ok(());
    }

    println!(
        "Generating documents for {} pending session(s)",
        entries.len()
    );

    let mut succeeded = 0usize;
    let mut failed = 0usize;
    for entry in entries {
        println!("\n{}", format!("Session {}", entry.session_id).bold());
        let result = Orchestrator::from_saved(store.clone(), &entry.session_id, true)
            .and_then(|orchestrator| orchestrator.run_generate_documents());
        match result {
            Ok(_) => succeeded += 1,
            Err(e) => {
                println!("{} session {}: {e:#}", "✗".red(), entry.session_id);
                failed += 1;
            }
        }
    }

    println!(
        "\n{} {} session(s) generated, {} failed",
        if failed == 0 { "✓".green() } else { "✗".red() },
        succeeded,
        failed
    );
    if failed > 0 {
        anyhow::bail!("{failed} session(s) failed document generation");
    }
    Ok(())
}

/// Time-derived, filesystem-safe session id. Suffixed when two runs start
/// within the same second.
fn next_session_id(store: &SessionStore) -> String {
    let base = Local::now().format("%Y%m%d_%H%M%S").to_string();
    if !store.session_dir(&base).exists() {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}_{n}");
        if !store.session_dir(&candidate).exists() {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_next_session_id_suffixes_on_collision() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path()).unwrap();

        let first = next_session_id(&store);
        std::fs::create_dir_all(store.session_dir(&first)).unwrap();

        let second = next_session_id(&store);
        assert_ne!(first, second);
        assert!(second.starts_with(&first));
    }
}
