//! Section extraction from free-text investigation replies.
//!
//! A reply is expected to look like:
//!
//! ```text
//! root_cause: the switch timed out before crediting the wallet
//! confidence_score: 85%
//! next_steps:
//!   1. Re-push the credit
//!   2. Confirm with the switch operator
//! summary_report: ...
//! records: {"core_banking": {...}, ...}
//! ```
//!
//! A section runs from just after `label:` until the next line that starts
//! with a letter, or the end of the text. Continuation lines therefore have
//! to start with a digit, punctuation or whitespace. A capitalised sentence on
//! its own line ends the section early.

use super::prompts::SECTION_LABELS;

/// Returned for a label that never appears in the reply.
pub const PLACEHOLDER: &str = "-";

/// Preamble phrases models like to prepend. Removed wherever they occur.
const NOISE: &[&str] = &["```", "Here is the solution:", "output:"];

/// Strip code fences and known preamble phrases.
pub fn normalize(reply: &str) -> String {
    let mut text = reply.to_string();
    for noise in NOISE {
        text = text.replace(noise, "");
    }
    text
}

/// Whether a line opens a new section rather than continuing the current one.
fn starts_new_section(line: &str) -> bool {
    line.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
}

/// Capture the text under `label`, or [`PLACEHOLDER`] when the label is absent.
pub fn extract(label: &str, text: &str) -> String {
    // ASCII lowercasing keeps byte offsets aligned with `text`.
    let haystack = text.to_ascii_lowercase();
    let needle = format!("{}:", label.to_ascii_lowercase());
    let Some(pos) = haystack.find(&needle) else {
        return PLACEHOLDER.to_string();
    };

    let rest = &text[pos + needle.len()..];
    let mut lines = rest.split('\n');
    let mut captured = vec![lines.next().unwrap_or_default()];
    for line in lines {
        if starts_new_section(line) {
            break;
        }
        captured.push(line);
    }

    captured.join("\n").trim().to_string()
}

/// The five sections of a reply, as raw text.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplySections {
    pub root_cause: String,
    pub confidence_score: String,
    pub next_steps: String,
    pub summary_report: String,
    pub records: String,
}

impl ReplySections {
    /// Normalize a raw reply and pull out every section.
    pub fn parse(reply: &str) -> Self {
        let text = normalize(reply);
        Self {
            root_cause: extract("root_cause", &text),
            confidence_score: extract("confidence_score", &text),
            next_steps: extract("next_steps", &text),
            summary_report: extract("summary_report", &text),
            records: extract("records", &text),
        }
    }

    /// Labels that were not found at all.
    pub fn missing(&self) -> Vec<&'static str> {
        let values = [
            &self.root_cause,
            &self.confidence_score,
            &self.next_steps,
            &self.summary_report,
            &self.records,
        ];
        SECTION_LABELS
            .iter()
            .zip(values)
            .filter(|(_, v)| v.as_str() == PLACEHOLDER)
            .map(|(l, _)| *l)
            .collect()
    }
}
