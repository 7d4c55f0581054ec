//! Listing commands: sessions awaiting work and the full session table.

use anyhow::Result;
use colored::Colorize;

use crate::config::PipelineConfig;
use crate::store::{PendingIndex, SessionStore};

/// Show sessions awaiting review and sessions awaiting generation.
pub fn list_pending(config: &PipelineConfig) -> Result<()> {
    let store = SessionStore::new(&config.orchestration.sessions_dir)?;
    let index = PendingIndex::load(store.root())?;

    if index.is_empty() {
        println!("{} No pending sessions.", "ℹ".blue());
        return Ok(());
    }

    if !index.pending_reviews().is_empty() {
        println!("{}", "Awaiting review".bold());
        println!(
            "{:<18} {:<17} {:>7} {:<24}",
            "SESSION".bold(),
            "CREATED".bold(),
            "TOPICS".bold(),
            "CONFIG".bold()
        );
        println!("{}", "─".repeat(70));
        for entry in index.pending_reviews() {
            println!(
                "{:<18} {:<17} {:>7} {:<24}",
                entry.session_id,
                entry.created_at.format("%Y-%m-%d %H:%M"),
                entry.topic_count,
                entry.config_name
            );
        }
        println!();
    }

    if !index.awaiting_generation().is_empty() {
        println!("{}", "Awaiting document generation".bold());
        println!(
            "{:<18} {:<17} {:>9}",
            "SESSION".bold(),
            "REVIEWED".bold(),
            "SELECTED".bold()
        );
        println!("{}", "─".repeat(48));
        for entry in index.awaiting_generation() {
            println!(
                "{:<18} {:<17} {:>9}",
                entry.session_id,
                entry.reviewed_at.format("%Y-%m-%d %H:%M"),
                entry.selected_count
            );
        }
    }

    Ok(())
}

/// Show every stored session with its stage and progress counts.
pub fn list_sessions(config: &PipelineConfig) -> Result<()> {
    let store = SessionStore::new(&config.orchestration.sessions_dir)?;
    let sessions = store.list_sessions()?;

    if sessions.is_empty() {
        println!("{} No stored sessions.", "ℹ".blue());
        return Ok(());
    }

    println!(
        "{:<18} {:<16} {:>7} {:>9} {:>6} {:<17}",
        "SESSION".bold(),
        "STAGE".bold(),
        "TOPICS".bold(),
        "SELECTED".bold(),
        "DOCS".bold(),
        "UPDATED".bold()
    );
    println!("{}", "─".repeat(80));

    for session in sessions {
        println!(
            "{:<18} {:<16} {:>7} {:>9} {:>6} {:<17}",
            session.session_id,
            session.stage.to_string(),
            session.topics.len(),
            session.selected_topics.len(),
            session.generated_documents.len(),
            session.updated_at.format("%Y-%m-%d %H:%M")
        );
    }

    Ok(())
}
