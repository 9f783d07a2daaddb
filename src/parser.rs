use regex::Regex;
use std::borrow::Cow;

pub const THINK_OPEN: &str = "<think>";
pub const THINK_CLOSE: &str = "</think>";

/// Strips the first reasoning segment a model emits ahead of its answer.
///
/// A segment is the shortest span running from the opening marker to the
/// next closing marker, possibly across lines. An opening marker with no
/// closing marker leaves the text untouched.
#[derive(Debug, Clone)]
pub struct ReasoningFilter {
    pattern: Regex,
}

impl Default for ReasoningFilter {
    fn default() -> Self {
        Self::new(THINK_OPEN, THINK_CLOSE)
    }
}

impl ReasoningFilter {
    pub fn new(open: &str, close: &str) -> Self {
        let pattern = format!("(?s){}.*?{}", regex::escape(open), regex::escape(close));
        // Both markers are escaped, the pattern is always valid
        let pattern = Regex::new(&pattern).unwrap();
        Self { pattern }
    }

    /// Remove the first segment from `text`.
    ///
    /// Line breaks following the segment are dropped when the segment sat on
    /// its own line (or opened the text). A segment that closed mid-line keeps
    /// one line break so the next line stays separate. The text before the
    /// segment is kept verbatim apart from trailing line breaks when nothing
    /// follows the segment.
    pub fn strip<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let Some(span) = self.pattern.find(text) else {
            return Cow::Borrowed(text);
        };

        let before = &text[..span.start()];
        let raw_after = &text[span.end()..];
        let after = raw_after.trim_start_matches(['\r', '\n']);

        if after.is_empty() {
            return Cow::Owned(before.trim_end_matches(['\r', '\n']).to_string());
        }

        let own_line = before.trim().is_empty() || before.ends_with('\n');
        if own_line {
            let before = if before.trim().is_empty() {
                before.trim_matches(['\r', '\n'])
            } else {
                before
            };
            return Cow::Owned(format!("{}{}", before, after));
        }

        let line_break = match raw_after.as_bytes().first() {
            _ if raw_after.starts_with("\r\n") => "\r\n",
            Some(b'\n') => "\n",
            Some(b'\r') => "\r",
            _ => "",
        };
        Cow::Owned(format!("{}{}{}", before, line_break, after))
    }
}

/// Remove a `<think>...</think>` block from model output.
pub fn remove_think_tag(text: &str) -> String {
    ReasoningFilter::default().strip(text).into_owned()
}
