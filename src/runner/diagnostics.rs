//! Failure classification for external invocations.

/// Case-insensitive markers that flag a line as diagnostic.
const ERROR_MARKERS: [&str; 3] = ["error", "failed", "blocked"];

/// At most this many marker lines are surfaced.
const MAX_DIAGNOSTIC_LINES: usize = 5;

/// Fallback tail length when no line matches a marker.
const TAIL_LINES: usize = 10;

/// Build a human-readable diagnostic for a non-zero exit.
///
/// Scans stdout then stderr line-by-line for the error markers and surfaces
/// up to the first five matches. When nothing matches, falls back to the raw
/// exit code plus the last ten non-empty output lines, if any.
pub fn failure_diagnostic(exit_code: Option<i32>, stdout: &str, stderr: &str) -> String {
    let matching: Vec<&str> = stdout
        .lines()
        .chain(stderr.lines())
        .filter(|line| {
            let lower = line.to_lowercase();
            ERROR_MARKERS.iter().any(|marker| lower.contains(marker))
        })
        .take(MAX_DIAGNOSTIC_LINES)
        .collect();

    if !matching.is_empty() {
        return matching.join("\n");
    }

    let code = exit_code
        .map(|c| c.to_string())
        .unwrap_or_else(|| "unknown (killed by signal)".to_string());

    let all_lines: Vec<&str> = stdout
        .lines()
        .chain(stderr.lines())
        .filter(|line| !line.trim().is_empty())
        .collect();
    let tail_start = all_lines.len().saturating_sub(TAIL_LINES);
    let tail = &all_lines[tail_start..];

    if tail.is_empty() {
        format!("exit code {code}")
    } else {
        format!("exit code {code}\n{}", tail.join("\n"))
    }
}
