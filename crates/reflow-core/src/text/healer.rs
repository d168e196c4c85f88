//! Repairs damage inside a single fragment.

use super::patterns::{GLUED_CITATION, HYPHEN_BREAK, WHITESPACE_RUN, is_all_caps};

/// Heal a fragment's text: rejoin hyphenated line breaks, unwrap lines,
/// bracket glued citation numbers and collapse whitespace.
///
/// All-caps text skips hyphen repair, since hyphens in headings are usually
/// real word separators.
pub fn heal(text: &str) -> String {
    let text = text.replace("\r\n", "\n");

    let unwrapped = if is_all_caps(&text) {
        text.replace('\n', " ")
    } else {
        HYPHEN_BREAK
            .replace_all(&text, "${1}${2}")
            .replace('\n', " ")
    };

    let cited = format_citations(&unwrapped);

    WHITESPACE_RUN.replace_all(&cited, " ").trim().to_string()
}

/// Turn `industry.67` into `industry. [67]`. Only 1-3 digit numbers followed
/// by whitespace or end of text qualify, so years survive.
pub fn format_citations(text: &str) -> String {
    GLUED_CITATION
        .replace_all(text, "${1} [${2}]${3}")
        .into_owned()
}
