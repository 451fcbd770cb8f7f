use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::reference::{FailureKind, ResolutionFailure};

/// ANSI bold, used for headings on a terminal.
const BOLD: &str = "\x1b[1m";
/// ANSI reset.
const RESET: &str = "\x1b[0m";
/// Most suggestions a failure message lists.
const MAX_SUGGESTIONS: usize = 3;

/// How serious a problem is. Nothing below `Error` stops a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The input could not be used at all.
    Error,
    /// Something was dropped or left unresolved.
    Warning,
    /// Informational only.
    Information,
}

/// A diagnostic collected during a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
    /// What happened.
    pub message: String,
    /// Extra context, such as an allow-list notice.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Identifier of the page the problem was found on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    /// Severity.
    pub severity: Severity,
    /// Input file the problem came from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    /// A likely fix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Problem {
    /// A warning with only a message.
    pub fn warning(message: impl Into<String>) -> Self {
        return Self {
            message: message.into(),
            note: None,
            page: None,
            severity: Severity::Warning,
            source: None,
            suggestion: None,
        };
    }

    /// Attach the input file.
    #[must_use]
    pub fn with_source(mut self, source: &Path) -> Self {
        self.source = Some(source.to_path_buf());
        return self;
    }

    /// Attach the page identifier.
    #[must_use]
    pub fn with_page(mut self, page: impl Into<String>) -> Self {
        self.page = Some(page.into());
        return self;
    }

    /// Turn a failed resolution into a warning on the page that contains it.
    pub fn from_failure(failure: &ResolutionFailure, page: impl Into<String>) -> Self {
        let severity = match failure.kind {
            FailureKind::Ambiguous { .. } | FailureKind::Cyclic | FailureKind::External { .. } => {
                Severity::Warning
            },
            FailureKind::Unresolved if failure.note.is_some() => Severity::Information,
            FailureKind::Unresolved => Severity::Warning,
        };
        return Self {
            message: failure.message.clone(),
            note: failure.note.clone(),
            page: Some(page.into()),
            severity,
            source: None,
            suggestion: failure.suggestion.clone(),
        };
    }
}

/// Closest candidates to `name` by edit distance, best first.
///
/// Candidates further than `max(len / 2, 3)` edits away are not suggested.
pub fn closest_matches<'a, I>(name: &str, candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let limit = (name.chars().count() / 2).max(3);
    let mut scored: Vec<(usize, &str)> = candidates
        .into_iter()
        .map(|candidate| return (levenshtein_distance(name, candidate), candidate))
        .filter(|(distance, _)| return *distance <= limit)
        .collect();
    scored.sort();
    scored.dedup();
    return scored
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(_, candidate)| return candidate.to_string())
        .collect();
}

/// Levenshtein distance over chars, one row at a time.
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b_chars.len()).collect();

    for (i, a_char) in a.chars().enumerate() {
        let mut current = Vec::with_capacity(previous.len());
        current.push(i.saturating_add(1));
        for (j, b_char) in b_chars.iter().enumerate() {
            let substitution = previous
                .get(j)
                .copied()
                .unwrap_or(usize::MAX)
                .saturating_add(usize::from(a_char != *b_char));
            let deletion = previous.get(j.saturating_add(1)).copied().unwrap_or(usize::MAX).saturating_add(1);
            let insertion = current.last().copied().unwrap_or(usize::MAX).saturating_add(1);
            current.push(substitution.min(deletion).min(insertion));
        }
        previous = current;
    }
    return previous.last().copied().unwrap_or(0);
}

/// Print problems as markdown to stderr with bold headings.
pub fn print_problems(problems: &[Problem]) {
    for problem in problems {
        let md = render_problem(problem);
        for line in md.lines() {
            if line.starts_with('#') {
                eprintln!("{BOLD}{line}{RESET}");
            } else {
                eprintln!("{line}");
            }
        }
    }
}

/// Render a problem as a markdown block: what happened, where, and the likely fix.
pub fn render_problem(problem: &Problem) -> String {
    let heading = match problem.severity {
        Severity::Error => "Error",
        Severity::Warning => "Warning",
        Severity::Information => "Note",
    };
    let mut out = format!("# {heading}: {}\n", problem.message);

    if problem.source.is_some() || problem.page.is_some() {
        out.push('\n');
    }
    if let Some(source) = &problem.source {
        let _ = writeln!(out, "In `{}`.", source.display());
    }
    if let Some(page) = &problem.page {
        let _ = writeln!(out, "On page `{page}`.");
    }
    if let Some(note) = &problem.note {
        let _ = write!(out, "\n{note}\n");
    }
    if let Some(suggestion) = &problem.suggestion {
        let _ = write!(out, "\n## Did you mean `{suggestion}`?\n");
    }
    return out;
}
