//! Stage 1: run the external idea generator and resolve its topics.

use std::path::{Path, PathBuf};

use anyhow::Result;
use colored::Colorize;
use tracing::info;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::models::TopicRecord;
use crate::resolver::{self, TopicSource};
use crate::runner::diagnostics::failure_diagnostic;
use crate::runner::exec::{run_program, ExecOutcome};
use crate::runner::render_command;

/// Manifest file the generator is asked to write in manifest mode.
pub const MANIFEST_FILE: &str = "ideas_manifest.json";

pub struct IdeaStage<'a> {
    pub config: &'a PipelineConfig,
    pub program: &'a Path,
    /// Session directory; the manifest is requested here.
    pub session_dir: &'a Path,
    /// Session topic storage area; resolved topics are relocated here.
    pub topics_dir: &'a Path,
    /// Pass auto-selection flags to the generator and capture its output.
    pub auto_confirm: bool,
}

impl IdeaStage<'_> {
    /// Invoke the idea generator and return the resolved topic list.
    ///
    /// A failed or timed-out invocation yields an empty list (the caller
    /// then skips session creation), unless failure tolerance is disabled,
    /// in which case a non-zero exit is a hard error.
    pub fn run(&self) -> Result<Vec<TopicRecord>> {
        let manifest_path = self.session_dir.join(MANIFEST_FILE);
        let args = self.build_args(&manifest_path);

        // Interactive runs pass stdio through so the user can drive the
        // generator's own prompts; batch and manifest runs capture output.
        let capture = self.config.orchestration.batch_mode
            || self.config.orchestration.use_manifest
            || self.auto_confirm;

        println!(
            "{}",
            format!("Running: {}", render_command(self.program, &args)).dimmed()
        );

        let timeout = self.config.stage1_timeout();
        let outcome = run_program(self.program, &args, timeout, capture)?;

        match outcome {
            ExecOutcome::TimedOut { .. } => {
                let error = PipelineError::StageTimeout {
                    stage: "idea generation".to_string(),
                    seconds: timeout.as_secs(),
                };
                println!("{} {error}", "✗".red());
                Ok(Vec::new())
            }
            ExecOutcome::Completed {
                success: false,
                exit_code,
                stdout,
                stderr,
            } => {
                let diagnostic = failure_diagnostic(exit_code, &stdout, &stderr);
                if !self.config.orchestration.retry_on_failure {
                    return Err(PipelineError::StageExecution {
                        stage: "idea generation".to_string(),
                        detail: diagnostic,
                    }
                    .into());
                }
                println!("{} idea generation failed:", "✗".red());
                for line in diagnostic.lines() {
                    println!("  {}", line.dimmed());
                }
                Ok(Vec::new())
            }
            ExecOutcome::Completed { success: true, .. } => {
                let source = self.topic_source(manifest_path);
                let topics = resolver::resolve_topics(&source, self.topics_dir)?;
                info!("stage 1 resolved {} topic(s)", topics.len());
                Ok(topics)
            }
        }
    }

    /// Manifest strategy only when requested and actually produced;
    /// discovery otherwise.
    fn topic_source(&self, manifest_path: PathBuf) -> TopicSource {
        let generator_dir = self
            .program
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        if self.config.orchestration.use_manifest && manifest_path.exists() {
            TopicSource::Manifest {
                manifest_path,
                generator_dir,
            }
        } else {
            TopicSource::Discovery { generator_dir }
        }
    }

    fn build_args(&self, manifest_path: &Path) -> Vec<String> {
        let idea = &self.config.idea_generation;
        let mut args = vec![
            "--mode".to_string(),
            self.config.global.mode.clone(),
            "--source".to_string(),
            idea.source.clone(),
            "--save-local".to_string(),
        ];

        if let Some(ref start_date) = idea.start_date {
            args.push("--start-date".to_string());
            args.push(start_date.clone());
        }
        if let Some(ref label) = idea.label {
            args.push("--label".to_string());
            args.push(label.clone());
        }
        if let Some(ref focus) = idea.focus {
            args.push("--focus".to_string());
            args.push(focus.clone());
        }
        if let Some(ref folder_id) = idea.folder_id {
            args.push("--folder-id".to_string());
            args.push(folder_id.clone());
        }
        if let Some(ref email_subject) = idea.email_subject {
            args.push("--email".to_string());
            args.push(email_subject.clone());
        }
        if idea.combined_topics {
            args.push("--combined-topics".to_string());
        }
        if idea.fast {
            args.push("--fast".to_string());
        }
        if self.auto_confirm {
            args.push("--select-all".to_string());
            args.push("--yes".to_string());
        }
        if self.config.orchestration.use_manifest {
            args.push("--batch".to_string());
            args.push("--output-manifest".to_string());
            args.push(manifest_path.to_string_lossy().into_owned());
        }

        args
    }
}
