use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use colored::Colorize;
use scribe::commands::list;
use scribe::config::PipelineConfig;
use scribe::error::PipelineError;
use scribe::orchestrator::{generate_all_pending, Orchestrator};
use scribe::{logging, LOGO};

#[derive(Parser)]
#[command(name = "scribe")]
#[command(about = "Staged content-generation pipeline orchestrator", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the pipeline YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run only idea generation (stage 1) and checkpoint for review
    #[arg(long, group = "mode")]
    generate_ideas: bool,

    /// Review a session's topics and select a subset (stage 2)
    #[arg(long, group = "mode", requires = "session")]
    review: bool,

    /// Generate documents for a reviewed session (stage 3)
    #[arg(long, group = "mode", requires = "session")]
    generate_docs: bool,

    /// List sessions awaiting review or document generation
    #[arg(long, group = "mode")]
    list_pending: bool,

    /// List all stored sessions
    #[arg(long, group = "mode")]
    list_sessions: bool,

    /// Generate documents for every reviewed session, auto-confirming
    #[arg(long, group = "mode")]
    generate_all_pending: bool,

    /// Session id for --review / --generate-docs
    #[arg(long)]
    session: Option<String>,

    /// Answer yes to all prompts and select all topics
    #[arg(short = 'y', long)]
    yes: bool,

    /// Log level (error, warn, info, debug, trace); RUST_LOG overrides
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shell completion script
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {e:#}", "✗".red());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Some(Commands::Completions { shell }) = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "scribe", &mut std::io::stdout());
        return Ok(());
    }

    let config_file = cli.config.clone().ok_or_else(|| {
        PipelineError::Configuration("--config <file> is required".to_string())
    })?;
    let config = PipelineConfig::load(&config_file)?;

    let log_level = cli
        .log_level
        .as_deref()
        .or(config.orchestration.log_level.as_deref())
        .unwrap_or("info");
    logging::init(log_level);

    // An interrupt aborts the in-flight stage without completing its
    // transition; the session stays at its last persisted stage and can be
    // resumed later.
    ctrlc::set_handler(|| {
        eprintln!("\nInterrupted. Session state up to the last completed stage is preserved.");
        std::process::exit(130);
    })
    .context("failed to install interrupt handler")?;

    if cli.generate_ideas {
        let orchestrator = Orchestrator::new(config, &config_file, cli.yes)?;
        println!("{}", LOGO.cyan());
        orchestrator.run_generate_ideas()?;
        Ok(())
    } else if cli.review {
        let session_id = cli.session.as_deref().unwrap_or_default();
        let orchestrator = Orchestrator::for_session(&config, session_id, cli.yes)?;
        orchestrator.run_review_session()?;
        Ok(())
    } else if cli.generate_docs {
        let session_id = cli.session.as_deref().unwrap_or_default();
        let orchestrator = Orchestrator::for_session(&config, session_id, cli.yes)?;
        orchestrator.run_generate_documents()?;
        Ok(())
    } else if cli.list_pending {
        list::list_pending(&config)
    } else if cli.list_sessions {
        list::list_sessions(&config)
    } else if cli.generate_all_pending {
        generate_all_pending(&config)
    } else {
        let orchestrator = Orchestrator::new(config, &config_file, cli.yes)?;
        orchestrator.run()
    }
}
