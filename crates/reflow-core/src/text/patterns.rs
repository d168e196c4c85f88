//! Regex patterns for fragment classification and healing.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Download stamps from academic publishers ("Downloaded from https://... by guest on ...")
    pub static ref ACADEMIC_WATERMARK: Regex = Regex::new(
        r"(?i)downloaded from http"
    ).unwrap();

    // A bare date line: "25 November 2025", "Nov 2025", "3 Sept. 2019"
    pub static ref ISOLATED_DATE: Regex = Regex::new(
        r"^(?:[0-3]?\d\s+)?(?:Jan(?:uary)?|Feb(?:ruary)?|Mar(?:ch)?|Apr(?:il)?|May|June?|July?|Aug(?:ust)?|Sep(?:t(?:ember)?)?|Oct(?:ober)?|Nov(?:ember)?|Dec(?:ember)?)\.?\s+\d{4}$"
    ).unwrap();

    // Arabic or roman page numbers standing alone
    pub static ref PAGE_NUMBER: Regex = Regex::new(
        r"(?i)^(?:\d+|[xvi]+)\s*$"
    ).unwrap();

    // Word broken across a line by a hyphen or soft hyphen (U+00AD)
    pub static ref HYPHEN_BREAK: Regex = Regex::new(
        r"([a-zA-Z]+)[-\x{00AD}]\s*\n\s*([a-zA-Z]+)"
    ).unwrap();

    // Superscript citation glued to punctuation: "industry.67 "
    pub static ref GLUED_CITATION: Regex = Regex::new(
        r#"([a-zA-Z]{2,}[.,?!'"]+)(\d{1,3})(\s|$)"#
    ).unwrap();

    pub static ref WHITESPACE_RUN: Regex = Regex::new(
        r"\s{2,}"
    ).unwrap();

    // Paragraph boundary in OCR output
    pub static ref BLANK_LINE: Regex = Regex::new(
        r"\n[ \t\r]*\n"
    ).unwrap();

    pub static ref EXCESS_NEWLINES: Regex = Regex::new(
        r"\n{3,}"
    ).unwrap();
}

/// Python-style `isupper`: at least one cased character and no lower-case ones.
pub fn is_all_caps(text: &str) -> bool {
    let mut cased = false;
    for c in text.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            cased = true;
        }
    }
    cased
}

/// An all-caps fragment long enough to be treated as a section heading.
pub fn is_heading(text: &str) -> bool {
    is_all_caps(text) && text.chars().count() > 5
}

/// Python-style `istitle` for a single word: upper-case letters only follow
/// uncased characters, lower-case letters only follow cased ones.
pub fn is_title_word(word: &str) -> bool {
    let mut cased = false;
    let mut previous_cased = false;

    for c in word.chars() {
        if c.is_uppercase() {
            if previous_cased {
                return false;
            }
            previous_cased = true;
            cased = true;
        } else if c.is_lowercase() {
            if !previous_cased {
                return false;
            }
            previous_cased = true;
            cased = true;
        } else {
            previous_cased = false;
        }
    }

    cased
}

/// Characters that close a sentence for stitching and byline purposes.
pub fn ends_sentence(c: char) -> bool {
    matches!(c, '.' | '?' | '!' | '"' | '\'')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_all_caps() {
        assert!(is_all_caps("HOW DOES IT WORK?"));
        assert!(is_all_caps("PART 2"));
        assert!(!is_all_caps("Part 2"));
        assert!(!is_all_caps("1234"));
        assert!(!is_all_caps(""));
    }

    #[test]
    fn test_is_heading_requires_length() {
        assert!(is_heading("METHODS"));
        assert!(!is_heading("INTRO"));
    }

    #[test]
    fn test_is_title_word() {
        assert!(is_title_word("Smith"));
        assert!(is_title_word("O'Neil"));
        assert!(is_title_word("Jean-Paul"));
        assert!(!is_title_word("smith"));
        assert!(!is_title_word("SMITH"));
        assert!(!is_title_word("McDonald"));
        assert!(!is_title_word("42"));
    }

    #[test]
    fn test_isolated_date_pattern() {
        assert!(ISOLATED_DATE.is_match("25 November 2025"));
        assert!(ISOLATED_DATE.is_match("Nov 2025"));
        assert!(ISOLATED_DATE.is_match("3 Sept. 2019"));
        assert!(!ISOLATED_DATE.is_match("Published 25 November 2025"));
        assert!(!ISOLATED_DATE.is_match("Monday 2025"));
    }
}
