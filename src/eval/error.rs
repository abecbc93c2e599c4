//! Execution errors
use crate::common::sourcemap::{HasSmid, Smid, SourceMap};
use codespan_reporting::diagnostic::Diagnostic;
use thiserror::Error;

/// Compute the Levenshtein edit distance between two strings.
///
/// This is a simple dynamic programming implementation suitable for
/// short identifier names in error messages.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let b_len = b.chars().count();
    if a.is_empty() {
        return b_len;
    }
    if b_len == 0 {
        return a.chars().count();
    }

    let mut prev_row: Vec<usize> = (0..=b_len).collect();
    let mut curr_row = vec![0; b_len + 1];

    for (i, a_ch) in a.chars().enumerate() {
        curr_row[0] = i + 1;
        for (j, b_ch) in b.chars().enumerate() {
            let cost = usize::from(a_ch != b_ch);
            curr_row[j + 1] = (prev_row[j] + cost)
                .min(prev_row[j + 1] + 1)
                .min(curr_row[j] + 1);
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b_len]
}

/// Up to `max_suggestions` candidates within `max_distance` of
/// `target`, closest first
pub fn suggest_similar<'a, I>(
    target: &str,
    candidates: I,
    max_suggestions: usize,
    max_distance: usize,
) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut scored: Vec<(usize, &String)> = candidates
        .into_iter()
        .map(|c| (levenshtein_distance(target, c), c))
        .filter(|(d, _)| *d > 0 && *d <= max_distance)
        .collect();

    scored.sort_by_key(|(d, _)| *d);
    scored
        .into_iter()
        .take(max_suggestions)
        .map(|(_, name)| name.clone())
        .collect()
}

fn format_name_failure(name: &str, suggestions: &[String]) -> String {
    let mut msg = format!("name '{name}' is not defined");
    if !suggestions.is_empty() {
        let quoted: Vec<String> = suggestions.iter().map(|s| format!("'{s}'")).collect();
        msg.push_str(&format!("\n  help: similar names: {}", quoted.join(", ")));
    }
    msg
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutionError {
    /// A raised exception (kind, message), catchable by handlers
    #[error("{1}: {2}")]
    Exception(Smid, String, String),
    #[error("{}", format_name_failure(.1, .2))]
    UnboundName(Smid, String, Vec<String>),
    #[error("temp {1} read before assignment")]
    UnboundTemp(Smid, String),
    #[error("tried to call a value that is not callable")]
    NotCallable(Smid),
    #[error("expected {1} arguments, received {2}")]
    ArityMismatch(Smid, usize, usize),
    #[error("{1} escaped its enclosing construct")]
    StrayControl(Smid, &'static str),
    #[error("machine did not terminate after {0} steps")]
    DidntTerminate(usize),
}

impl ExecutionError {
    pub fn exception<K: AsRef<str>, M: AsRef<str>>(smid: Smid, kind: K, message: M) -> Self {
        ExecutionError::Exception(smid, kind.as_ref().to_string(), message.as_ref().to_string())
    }

    pub fn type_error<M: AsRef<str>>(smid: Smid, message: M) -> Self {
        Self::exception(smid, "TypeError", message)
    }

    /// The exception kind if this error can be caught by a handler
    pub fn kind(&self) -> Option<&str> {
        match self {
            ExecutionError::Exception(_, kind, _) => Some(kind),
            ExecutionError::UnboundName(..) => Some("NameError"),
            _ => None,
        }
    }

    pub fn to_diagnostic(&self, source_map: &SourceMap) -> Diagnostic<usize> {
        source_map.diagnostic(self)
    }
}

impl HasSmid for ExecutionError {
    fn smid(&self) -> Smid {
        match self {
            ExecutionError::Exception(s, _, _) => *s,
            ExecutionError::UnboundName(s, _, _) => *s,
            ExecutionError::UnboundTemp(s, _) => *s,
            ExecutionError::NotCallable(s) => *s,
            ExecutionError::ArityMismatch(s, _, _) => *s,
            ExecutionError::StrayControl(s, _) => *s,
            ExecutionError::DidntTerminate(_) => Smid::default(),
        }
    }
}
