//! Stage execution against external programs.
//!
//! `exec` owns the low-level invocation (spawn, capture, timeout, kill);
//! `diagnostics` classifies failures; `ideas` and `documents` drive stages 1
//! and 3 of the pipeline. Stage 2 (review) is human input and lives in the
//! orchestrator.

pub mod diagnostics;
pub mod documents;
pub mod exec;
pub mod ideas;

use std::borrow::Cow;
use std::path::Path;

pub use exec::{CwdGuard, ExecOutcome};

/// Render a spawn command for display, shell-quoting each part.
pub(crate) fn render_command(program: &Path, args: &[String]) -> String {
    let mut parts = vec![shell_escape::escape(program.to_string_lossy()).to_string()];
    parts.extend(
        args.iter()
            .map(|a| shell_escape::escape(Cow::from(a.as_str())).to_string()),
    );
    parts.join(" ")
}
