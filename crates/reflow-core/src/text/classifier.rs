//! Noise classification for native text fragments.
//!
//! Each rule is a plain function over a [`Candidate`]. Rules run in a fixed
//! order and the first decisive rule wins, so a rule only ever needs to know
//! about the cases the earlier rules have not already settled.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::config::ClassifierConfig;

use super::patterns::{
    ACADEMIC_WATERMARK, ISOLATED_DATE, PAGE_NUMBER, ends_sentence, is_heading, is_title_word,
};

/// Why a fragment was treated as noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NoiseReason {
    Blank,
    AcademicWatermark,
    IsolatedDate,
    IsolatedPageNumber,
    EdgeHeaderFooter,
    UnpunctuatedTitleCaseByline,
}

impl NoiseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoiseReason::Blank => "blank",
            NoiseReason::AcademicWatermark => "academic watermark",
            NoiseReason::IsolatedDate => "isolated date",
            NoiseReason::IsolatedPageNumber => "isolated page number",
            NoiseReason::EdgeHeaderFooter => "edge header/footer",
            NoiseReason::UnpunctuatedTitleCaseByline => "unpunctuated title-case byline",
        }
    }
}

impl fmt::Display for NoiseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of classifying one fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationVerdict {
    pub is_noise: bool,
    pub reason: Option<NoiseReason>,
}

impl ClassificationVerdict {
    pub fn keep() -> Self {
        Self {
            is_noise: false,
            reason: None,
        }
    }

    pub fn noise(reason: NoiseReason) -> Self {
        Self {
            is_noise: true,
            reason: Some(reason),
        }
    }
}

/// A fragment under inspection.
struct Candidate<'a> {
    text: &'a str,
    y0: f32,
    y1: f32,
    page_height: f32,
    word_count: usize,
}

enum RuleOutcome {
    Drop(NoiseReason),
    Keep,
    Continue,
}

type Rule = fn(&FragmentClassifier, &Candidate<'_>) -> RuleOutcome;

const RULES: &[Rule] = &[
    blank,
    academic_watermark,
    isolated_date,
    isolated_page_number,
    heading_exemption,
    edge_header_footer,
    title_case_byline,
];

/// Rule-based noise classifier for native text blocks.
#[derive(Debug, Clone)]
pub struct FragmentClassifier {
    config: ClassifierConfig,
    safe_mode: bool,
}

impl FragmentClassifier {
    /// Create a classifier with default thresholds, safe mode on.
    pub fn new() -> Self {
        Self {
            config: ClassifierConfig::default(),
            safe_mode: true,
        }
    }

    /// Use custom thresholds.
    pub fn with_config(mut self, config: ClassifierConfig) -> Self {
        self.config = config;
        self
    }

    /// Toggle safe mode. Safe mode disables the byline rule.
    pub fn with_safe_mode(mut self, safe_mode: bool) -> Self {
        self.safe_mode = safe_mode;
        self
    }

    /// Classify a fragment's text given its vertical extent on the page.
    pub fn classify(&self, text: &str, y0: f32, y1: f32, page_height: f32) -> ClassificationVerdict {
        let text = text.trim();
        let candidate = Candidate {
            text,
            y0,
            y1,
            page_height,
            word_count: text.split_whitespace().count(),
        };

        for rule in RULES {
            match rule(self, &candidate) {
                RuleOutcome::Drop(reason) => return ClassificationVerdict::noise(reason),
                RuleOutcome::Keep => return ClassificationVerdict::keep(),
                RuleOutcome::Continue => {}
            }
        }

        ClassificationVerdict::keep()
    }
}

impl Default for FragmentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn blank(_: &FragmentClassifier, c: &Candidate<'_>) -> RuleOutcome {
    if c.text.is_empty() {
        RuleOutcome::Drop(NoiseReason::Blank)
    } else {
        RuleOutcome::Continue
    }
}

fn academic_watermark(_: &FragmentClassifier, c: &Candidate<'_>) -> RuleOutcome {
    if ACADEMIC_WATERMARK.is_match(c.text) {
        RuleOutcome::Drop(NoiseReason::AcademicWatermark)
    } else {
        RuleOutcome::Continue
    }
}

fn isolated_date(_: &FragmentClassifier, c: &Candidate<'_>) -> RuleOutcome {
    if ISOLATED_DATE.is_match(c.text) {
        RuleOutcome::Drop(NoiseReason::IsolatedDate)
    } else {
        RuleOutcome::Continue
    }
}

fn isolated_page_number(_: &FragmentClassifier, c: &Candidate<'_>) -> RuleOutcome {
    if PAGE_NUMBER.is_match(c.text) {
        RuleOutcome::Drop(NoiseReason::IsolatedPageNumber)
    } else {
        RuleOutcome::Continue
    }
}

// All-caps headings survive even in the header band.
fn heading_exemption(_: &FragmentClassifier, c: &Candidate<'_>) -> RuleOutcome {
    if is_heading(c.text) {
        RuleOutcome::Keep
    } else {
        RuleOutcome::Continue
    }
}

fn edge_header_footer(classifier: &FragmentClassifier, c: &Candidate<'_>) -> RuleOutcome {
    if !c.page_height.is_finite() || c.page_height <= 0.0 {
        return RuleOutcome::Continue;
    }

    let config = &classifier.config;
    let in_top_band = c.y0 < c.page_height * config.top_band;
    let in_bottom_band = c.y1 > c.page_height * config.bottom_band;

    if (in_top_band || in_bottom_band) && c.word_count < config.edge_max_words {
        RuleOutcome::Drop(NoiseReason::EdgeHeaderFooter)
    } else {
        RuleOutcome::Continue
    }
}

fn title_case_byline(classifier: &FragmentClassifier, c: &Candidate<'_>) -> RuleOutcome {
    if classifier.safe_mode {
        return RuleOutcome::Continue;
    }

    let config = &classifier.config;
    if c.word_count == 0 || c.word_count >= config.byline_max_words {
        return RuleOutcome::Continue;
    }
    if c.text.chars().last().is_some_and(ends_sentence) {
        return RuleOutcome::Continue;
    }

    let title_words = c.text.split_whitespace().filter(|w| is_title_word(w)).count();
    let ratio = title_words as f32 / c.word_count as f32;

    if ratio > config.byline_title_ratio {
        RuleOutcome::Drop(NoiseReason::UnpunctuatedTitleCaseByline)
    } else {
        RuleOutcome::Continue
    }
}
