//! Case-insensitive line filtering over an extracted window.
//!
//! Patterns never pass through a shell. In [`MatchMode::Literal`] every
//! regex metacharacter is escaped before compilation, so the pattern is a
//! plain substring search; quotes, `$()`, `|` and friends match themselves.

use regex::bytes::{Regex, RegexBuilder};

use crate::error::{Result, RetrievalError};
use crate::models::{FilterOutcome, MatchMode};

/// Upper bound on the compiled program size of a user regex.
const REGEX_SIZE_LIMIT: usize = 1 << 20;

/// Compile `pattern` into a case-insensitive matcher.
pub fn compile_pattern(pattern: &str, mode: MatchMode) -> Result<Regex> {
    let source = match mode {
        MatchMode::Literal => regex::escape(pattern),
        MatchMode::Regex => pattern.to_string(),
    };
    RegexBuilder::new(&source)
        .case_insensitive(true)
        .size_limit(REGEX_SIZE_LIMIT)
        .build()
        .map_err(|e| RetrievalError::rejected(pattern, format!("invalid pattern: {}", e)))
}

/// Keep the lines of `window` that match `pattern` (or, with `invert_match`,
/// the ones that do not). Order and line terminators are preserved.
pub fn filter_lines(
    window: &[u8],
    pattern: &str,
    invert_match: bool,
    mode: MatchMode,
) -> Result<FilterOutcome> {
    let matcher = compile_pattern(pattern, mode)?;
    Ok(filter_with(window, &matcher, invert_match))
}

/// Like [`filter_lines`] with an already compiled matcher.
pub fn filter_with(window: &[u8], matcher: &Regex, invert_match: bool) -> FilterOutcome {
    let mut kept = Vec::new();
    for line in window.split_inclusive(|&b| b == b'\n') {
        if matcher.is_match(trim_terminator(line)) != invert_match {
            kept.extend_from_slice(line);
        }
    }

    if kept.is_empty() {
        FilterOutcome::NoMatch
    } else {
        FilterOutcome::Lines(kept)
    }
}

fn trim_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
