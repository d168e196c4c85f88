//! Per-document page loop: route, classify, heal and stitch.

mod stitch;

pub use stitch::Stitcher;

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::Level;

use crate::error::{PdfError, ReflowError, Result};
use crate::events::{CancelFlag, EventSink, emit};
use crate::models::config::{ExtractionConfig, ReflowConfig};
use crate::models::fragment::{Fragment, NativePage, PageContext};
use crate::ocr::OcrProvider;
use crate::pdf::PageSource;
use crate::text::classifier::{FragmentClassifier, NoiseReason};
use crate::text::healer::heal;
use crate::text::patterns::BLANK_LINE;

/// What happened while assembling one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssemblyReport {
    pub pages_total: u32,
    pub pages_native: u32,
    pub pages_ocr: u32,
    pub pages_failed: u32,
    pub fragments_kept: usize,
    pub fragments_dropped: BTreeMap<NoiseReason, usize>,
}

impl AssemblyReport {
    /// Total number of fragments dropped as noise.
    pub fn dropped_total(&self) -> usize {
        self.fragments_dropped.values().sum()
    }

    /// Number of fragments dropped for one reason.
    pub fn dropped(&self, reason: NoiseReason) -> usize {
        self.fragments_dropped.get(&reason).copied().unwrap_or(0)
    }
}

/// A fully assembled document.
#[derive(Debug, Clone)]
pub struct AssembledDocument {
    pub text: String,
    pub report: AssemblyReport,
}

/// Outcome of [`DocumentAssembler::assemble`].
#[derive(Debug, Clone)]
pub enum Assembly {
    Complete(AssembledDocument),
    /// Cancelled before the last page; buffered text is discarded.
    Cancelled { pages_processed: u32 },
}

/// Where a page's fragments came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageRoute {
    Native,
    Ocr,
}

impl std::fmt::Display for PageRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageRoute::Native => write!(f, "native"),
            PageRoute::Ocr => write!(f, "ocr"),
        }
    }
}

/// Turns the pages of one document into a single reflowed text.
pub struct DocumentAssembler<'a> {
    classifier: FragmentClassifier,
    extraction: ExtractionConfig,
    preview_chars: usize,
    ocr: &'a dyn OcrProvider,
    events: &'a dyn EventSink,
}

impl<'a> DocumentAssembler<'a> {
    pub fn new(config: &ReflowConfig, ocr: &'a dyn OcrProvider, events: &'a dyn EventSink) -> Self {
        let classifier = FragmentClassifier::new()
            .with_config(config.classifier.clone())
            .with_safe_mode(config.extraction.safe_mode);

        Self {
            classifier,
            extraction: config.extraction.clone(),
            preview_chars: config.output.preview_chars,
            ocr,
            events,
        }
    }

    /// Assemble every page of `source` in order.
    ///
    /// `on_page(done, total)` runs after each page, failed pages included.
    pub fn assemble(
        &self,
        source: &dyn PageSource,
        cancel: &CancelFlag,
        mut on_page: impl FnMut(u32, u32),
    ) -> Assembly {
        let total = source.page_count();
        let mut report = AssemblyReport {
            pages_total: total,
            ..AssemblyReport::default()
        };
        let mut stitcher = Stitcher::new();

        for page in 1..=total {
            if cancel.is_cancelled() {
                emit(
                    self.events,
                    Level::WARN,
                    format!("cancelled at page {page}/{total}, discarding document"),
                );
                return Assembly::Cancelled {
                    pages_processed: page - 1,
                };
            }

            match self.page_fragments(source, page, &mut report) {
                Ok((fragments, route)) => {
                    emit(
                        self.events,
                        Level::DEBUG,
                        format!("page {page}/{total}: kept {} fragments ({route})", fragments.len()),
                    );
                    report.fragments_kept += fragments.len();
                    for fragment in &fragments {
                        stitcher.push(fragment);
                    }
                }
                Err(e) => {
                    report.pages_failed += 1;
                    emit(self.events, Level::WARN, format!("page {page}: extraction failed: {e}"));
                }
            }

            on_page(page, total);
        }

        Assembly::Complete(AssembledDocument {
            text: stitcher.finish(),
            report,
        })
    }

    /// Healed, kept fragments of one page in reading order.
    ///
    /// Pages below the scan threshold go to OCR. When OCR cannot produce
    /// anything for them the page's own text layer is used instead.
    fn page_fragments(
        &self,
        source: &dyn PageSource,
        page: u32,
        report: &mut AssemblyReport,
    ) -> Result<(Vec<String>, PageRoute)> {
        let native = source.native_page(page)?;

        if native.raw_text.trim().chars().count() < self.extraction.scan_threshold {
            if let Some(kept) = self.ocr_fragments(source, page)? {
                report.pages_ocr += 1;
                return Ok((kept, PageRoute::Ocr));
            }
        }

        let kept = self.native_fragments(page, native, report);
        report.pages_native += 1;
        Ok((kept, PageRoute::Native))
    }

    /// OCR pieces for a scanned page, or `None` to fall back to native text.
    fn ocr_fragments(&self, source: &dyn PageSource, page: u32) -> Result<Option<Vec<String>>> {
        if !self.ocr.is_available() {
            emit(
                self.events,
                Level::WARN,
                format!("page {page}: looks scanned but no OCR engine is available, using native text"),
            );
            return Ok(None);
        }

        let image = match source.page_image(page) {
            Ok(image) => image,
            Err(PdfError::NoPageImage(_)) => {
                emit(
                    self.events,
                    Level::INFO,
                    format!("page {page}: no page image to OCR, using native text"),
                );
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        emit(
            self.events,
            Level::INFO,
            format!("page {page}: running OCR ({})", self.extraction.ocr_language),
        );
        let text = self
            .ocr
            .recognize(&image, &self.extraction.ocr_language)
            .map_err(ReflowError::from)?;

        let kept: Vec<String> = split_ocr_text(&text)
            .into_iter()
            .map(|f| heal(&f.text))
            .filter(|t| !t.is_empty())
            .collect();

        if kept.is_empty() {
            emit(
                self.events,
                Level::INFO,
                format!("page {page}: OCR found no text, using native text"),
            );
            return Ok(None);
        }
        Ok(Some(kept))
    }

    fn native_fragments(&self, page: u32, native: NativePage, report: &mut AssemblyReport) -> Vec<String> {
        let context = PageContext::from(native);
        let page_height = context.page_height();
        let mut kept = Vec::new();

        for fragment in context.into_fragments() {
            let verdict = self
                .classifier
                .classify(&fragment.text, fragment.bbox.y0, fragment.bbox.y1, page_height);

            if let Some(reason) = verdict.reason {
                *report.fragments_dropped.entry(reason).or_insert(0) += 1;
                let preview = self.preview(&fragment.text);
                if !preview.is_empty() {
                    emit(
                        self.events,
                        Level::INFO,
                        format!("page {page}: dropped [{reason}]: {preview}..."),
                    );
                }
                continue;
            }

            let healed = heal(&fragment.text);
            if !healed.is_empty() {
                kept.push(healed);
            }
        }

        kept
    }

    fn preview(&self, text: &str) -> String {
        text.replace('\n', " ")
            .trim()
            .chars()
            .take(self.preview_chars)
            .collect()
    }
}

/// Split raw OCR output into paragraph pseudo-fragments on blank lines.
pub fn split_ocr_text(text: &str) -> Vec<Fragment> {
    let text = text.replace("\r\n", "\n");
    BLANK_LINE
        .split(&text)
        .filter(|piece| !piece.trim().is_empty())
        .map(Fragment::ocr)
        .collect()
}
