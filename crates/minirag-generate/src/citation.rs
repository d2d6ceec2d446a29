//! Citation marker parsing and refusal detection.
use regex::{Captures, Regex};
use tracing::warn;

use minirag_core::{Error, Result};

use crate::prompt::REFUSAL_PHRASE;

const MARKER: &str = r"(?i)[ \t]?\[\s*source\s+id\s*:\s*(\d+(?:\s*,\s*\d+)*)\s*\]";

/// Model output with citation markers checked against the context size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Text with valid markers intact and invalid ones removed.
    pub text: String,
    /// Distinct valid source ids in order of first appearance.
    pub cited: Vec<usize>,
}

pub struct CitationParser {
    marker: Regex,
}

impl CitationParser {
    pub fn new() -> Result<Self> {
        let marker = Regex::new(MARKER).map_err(|e| Error::InvalidConfig(format!("citation pattern: {e}")))?;
        Ok(Self { marker })
    }

    /// Validate every `[Source ID: N]` marker in `raw` against `1..=context_len`.
    ///
    /// A marker whose ids are all out of range is removed. A marker mixing valid and
    /// invalid ids is rewritten to list only the valid ones.
    pub fn resolve(&self, raw: &str, context_len: usize) -> Resolved {
        resolve_with(&self.marker, raw, context_len)
    }
}

fn resolve_with(marker: &Regex, raw: &str, context_len: usize) -> Resolved {
    let mut cited: Vec<usize> = Vec::new();
    let text = marker.replace_all(raw, |caps: &Captures<'_>| {
        let whole = &caps[0];
        let lead = if whole.starts_with([' ', '\t']) { &whole[..1] } else { "" };
        let mut valid = Vec::new();
        for id in caps[1].split(',').map(str::trim) {
            match id.parse::<usize>() {
                Ok(n) if (1..=context_len).contains(&n) => {
                    if !cited.contains(&n) {
                        cited.push(n);
                    }
                    if !valid.contains(&n) {
                        valid.push(n);
                    }
                }
                _ => warn!(source_id = id, context_len, "dropping citation of unknown source"),
            }
        }
        if valid.is_empty() {
            String::new()
        } else if valid.len() == caps[1].split(',').count() {
            whole.to_string()
        } else {
            let ids: Vec<String> = valid.iter().map(ToString::to_string).collect();
            format!("{lead}[Source ID: {}]", ids.join(", "))
        }
    });
    Resolved { text: text.trim().to_string(), cited }
}

fn normalize(s: &str) -> String {
    s.trim()
        .replace(['\u{2018}', '\u{2019}'], "'")
        .to_lowercase()
        .trim_end_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace())
        .to_string()
}

/// Whether `text` is the model declining to answer from the context.
pub fn is_refusal(text: &str, has_citations: bool) -> bool {
    let text = normalize(text);
    let phrase = normalize(REFUSAL_PHRASE);
    text == phrase || (!has_citations && text.starts_with(&phrase))
}
