//! Paragraph stitching across fragment and page boundaries.

use crate::text::patterns::{EXCESS_NEWLINES, ends_sentence, is_heading};

/// Append-only document buffer plus the continuation flag.
///
/// The flag deliberately survives page boundaries: a sentence cut off at the
/// bottom of one page is rejoined with its lower-case continuation on the
/// next.
#[derive(Debug, Default)]
pub struct Stitcher {
    buffer: String,
    previous_incomplete: bool,
}

impl Stitcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one healed fragment.
    pub fn push(&mut self, fragment: &str) {
        let Some(last) = fragment.chars().last() else {
            return;
        };

        if is_heading(fragment) {
            self.buffer.push_str("\n\n");
            self.buffer.push_str(fragment);
            self.buffer.push_str("\n\n");
            self.previous_incomplete = false;
            return;
        }

        if self.previous_incomplete && continues_sentence(fragment) {
            self.buffer.push(' ');
        } else if !self.buffer.is_empty() {
            self.buffer.push_str("\n\n");
        }
        self.buffer.push_str(fragment);

        self.previous_incomplete = !ends_sentence(last);
    }

    /// Final text: trimmed, with runs of three or more newlines collapsed to two.
    pub fn finish(self) -> String {
        EXCESS_NEWLINES
            .replace_all(self.buffer.trim(), "\n\n")
            .into_owned()
    }
}

fn continues_sentence(fragment: &str) -> bool {
    fragment
        .chars()
        .next()
        .is_some_and(|c| c.is_lowercase() || matches!(c, ',' | ';' | ':' | '\'' | '"'))
}
