//! Stage 3: run the external document generator once per selected topic.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::info;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::models::{DocumentResult, SelectedTopic};
use crate::runner::diagnostics::failure_diagnostic;
use crate::runner::exec::{run_program, ExecOutcome};
use crate::runner::render_command;

pub struct DocumentStage<'a> {
    pub config: &'a PipelineConfig,
    pub program: &'a Path,
}

impl DocumentStage<'_> {
    /// Generate one document per selected topic, sequentially.
    ///
    /// Accumulates a result per topic regardless of individual failures;
    /// partial success is a valid terminal outcome for the batch. With
    /// failure tolerance disabled, the first non-zero exit aborts the
    /// remaining batch instead.
    pub fn run(&self, selected: &[SelectedTopic]) -> Result<Vec<DocumentResult>> {
        let mode = self.config.document_mode().to_string();
        let output_dir = absolutize(&self.config.document_generation.output)?;
        let timeout = self.config.stage2_timeout();
        let total = selected.len();

        let mut documents = Vec::with_capacity(total);
        for (i, topic) in selected.iter().enumerate() {
            println!(
                "{} [{}/{}] {}",
                "→".cyan(),
                i + 1,
                total,
                topic.title.bold()
            );

            let args = self.build_args(&mode, &topic.file, &output_dir);
            println!(
                "{}",
                format!("Running: {}", render_command(self.program, &args)).dimmed()
            );

            let outcome = run_program(self.program, &args, timeout, true)?;
            match outcome {
                ExecOutcome::TimedOut { .. } => {
                    let result = DocumentResult::timed_out(&topic.title, timeout.as_secs());
                    println!(
                        "  {} {}",
                        "✗".red(),
                        result.error.as_deref().unwrap_or_default()
                    );
                    documents.push(result);
                }
                ExecOutcome::Completed { success: true, stdout, .. } => {
                    println!("  {} generated", "✓".green());
                    documents.push(DocumentResult::success(&topic.title, stdout));
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
                            stage: format!("document generation for '{}'", topic.title),
                            detail: diagnostic,
                        }
                        .into());
                    }
                    println!("  {} {}", "✗".red(), diagnostic.lines().next().unwrap_or(""));
                    documents.push(DocumentResult::failed(&topic.title, &diagnostic));
                }
            }
        }

        let successful = documents.iter().filter(|d| d.is_success()).count();
        info!("stage 3 generated {successful}/{total} document(s)");
        println!(
            "\n{} Generated {}/{} documents successfully",
            "✓".green(),
            successful,
            total
        );

        Ok(documents)
    }

    fn build_args(&self, mode: &str, topic_file: &Path, output_dir: &Path) -> Vec<String> {
        let doc = &self.config.document_generation;
        let mut args = vec![
            "--mode".to_string(),
            mode.to_string(),
            "--topic".to_string(),
            topic_file.to_string_lossy().into_owned(),
            "--audience".to_string(),
            doc.audience.clone(),
            "--type".to_string(),
            doc.doc_type.clone(),
            "--size".to_string(),
            doc.size.clone(),
            "--output".to_string(),
            output_dir.to_string_lossy().into_owned(),
        ];

        if !doc.style.is_empty() {
            args.push("--style".to_string());
            args.push(doc.style.clone());
        }
        if let Some(ref story) = doc.customer_story {
            args.push("--customer-story".to_string());
            args.push(story.clone());
        }

        args
    }
}

/// The invocation runs from the generator's own directory, so a relative
/// output path from the config must be pinned to the orchestrator's cwd
/// first.
fn absolutize(path: &str) -> Result<PathBuf> {
    let path = Path::new(path);
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()
            .context("failed to resolve current directory")?
            .join(path))
    }
}
