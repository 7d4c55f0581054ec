//! Human checkpoints: topic table, selection prompt, parameter
//! confirmation.
//!
//! Everything here degrades to a non-interactive path under auto-confirm so
//! batch runs (`--yes`, `--generate-all-pending`) never block on stdin.

use std::io::{stdin, stdout, BufRead, Write};

use anyhow::{Context, Result};
use colored::Colorize;

use crate::config::PipelineConfig;
use crate::models::TopicRecord;

/// Ask a yes/no question. Auto-confirm answers yes without prompting; EOF is
/// treated as a "no" so a closed stdin can never approve anything.
pub fn confirm(prompt: &str, default: bool, auto_confirm: bool) -> Result<bool> {
    if auto_confirm {
        return Ok(true);
    }

    let hint = if default { "[Y/n]" } else { "[y/N]" };
    loop {
        let mut out = stdout();
        write!(out, "{} {hint}: ", prompt.yellow())?;
        out.flush()?;

        let mut input = String::new();
        let bytes = stdin()
            .lock()
            .read_line(&mut input)
            .context("failed to read confirmation response")?;
        if bytes == 0 {
            println!();
            return Ok(false);
        }

        match input.trim().to_lowercase().as_str() {
            "" => return Ok(default),
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => println!("Please answer 'y' or 'n'."),
        }
    }
}

/// Print the review table for a session's topics.
pub fn display_topics(topics: &[TopicRecord]) {
    println!(
        "\n{} ({} found)",
        "Generated Topics".bold(),
        topics.len()
    );
    println!(
        "{:>3} {:<50} {:<28} {:>6} {:>8} {:>7}",
        "#".bold(),
        "TITLE".bold(),
        "FILE".bold(),
        "WORDS".bold(),
        "INSIGHTS".bold(),
        "QUOTES".bold()
    );
    println!("{}", "─".repeat(106));

    for (i, topic) in topics.iter().enumerate() {
        let file_name = topic
            .file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!(
            "{:>3} {:<50} {:<28} {:>6} {:>8} {:>7}",
            i + 1,
            truncate_cell(&topic.title, 50),
            truncate_cell(&file_name, 28),
            topic.size,
            topic.insights_count,
            topic.quotes_count
        );
        if let Some(ref description) = topic.description {
            println!("    {}", truncate_cell(description, 90).dimmed());
        }
    }
}

/// Obtain the reviewer's selection as zero-based indices.
///
/// Auto-confirm selects every topic. Interactively, the reviewer types
/// `all`, an index list like `1,3`, or nothing to cancel; invalid input
/// reprompts.
pub fn select_topics(topics: &[TopicRecord], auto_confirm: bool) -> Result<Vec<usize>> {
    if auto_confirm {
        return Ok((0..topics.len()).collect());
    }

    loop {
        let mut out = stdout();
        write!(
            out,
            "{}: ",
            "Select topics to generate (e.g. 1,3 or 'all'; empty to cancel)".yellow()
        )?;
        out.flush()?;

        let mut input = String::new();
        let bytes = stdin()
            .lock()
            .read_line(&mut input)
            .context("failed to read topic selection")?;
        if bytes == 0 {
            println!();
            return Ok(Vec::new());
        }

        match parse_selection(&input, topics.len()) {
            Ok(indices) => return Ok(indices),
            Err(e) => println!("{e}"),
        }
    }
}

/// Parse a selection line against a topic count. Returns zero-based indices
/// in the order given, deduplicated.
fn parse_selection(input: &str, count: usize) -> Result<Vec<usize>, String> {
    let input = input.trim();
    if input.is_empty() || input.eq_ignore_ascii_case("none") {
        return Ok(Vec::new());
    }
    if input.eq_ignore_ascii_case("all") || input.eq_ignore_ascii_case("a") {
        return Ok((0..count).collect());
    }

    let mut indices = Vec::new();
    for part in input.split([',', ' ']).filter(|p| !p.is_empty()) {
        let n: usize = part
            .parse()
            .map_err(|_| format!("Invalid selection '{part}'. Use numbers, 'all', or 'none'."))?;
        if n == 0 || n > count {
            return Err(format!("Topic {n} is out of range (1-{count})."));
        }
        if !indices.contains(&(n - 1)) {
            indices.push(n - 1);
        }
    }
    Ok(indices)
}

/// Show the effective document-generation parameters and ask to proceed.
pub fn confirm_parameters(
    config: &PipelineConfig,
    topic_count: usize,
    auto_confirm: bool,
) -> Result<bool> {
    let doc = &config.document_generation;

    println!("\n{}", "Document Generation Parameters".bold());
    println!("{}", "─".repeat(50));
    print_param("Mode", config.document_mode());
    print_param(
        "Writing style",
        if doc.style.is_empty() { "(default)" } else { &doc.style },
    );
    print_param(
        "Audience",
        if doc.audience.is_empty() { "(general)" } else { &doc.audience },
    );
    print_param("Document type", &doc.doc_type);
    print_param("Size", &doc.size);
    print_param(
        "Customer story",
        doc.customer_story.as_deref().unwrap_or("(none)"),
    );
    print_param("Output location", &doc.output);
    print_param("Topics to generate", &topic_count.to_string());

    confirm("\nProceed with document generation?", true, auto_confirm)
}

fn print_param(key: &str, value: &str) {
    println!("  {:<20} {}", key.cyan(), value);
}

fn truncate_cell(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
