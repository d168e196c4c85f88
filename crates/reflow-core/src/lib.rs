//! Core library for reconstructing clean running text from PDFs.
//!
//! This crate provides:
//! - Page access for PDFs (positioned text blocks and page images)
//! - Rule-based noise classification of text fragments
//! - Text healing (hyphenation, line unwrapping, citation markers)
//! - Paragraph stitching across fragment and page boundaries
//! - OCR fallback for scanned pages
//! - A cancellable sequential batch driver

pub mod assembler;
pub mod batch;
pub mod error;
pub mod events;
pub mod models;
pub mod ocr;
pub mod output;
pub mod pdf;
pub mod text;

pub use assembler::{AssembledDocument, Assembly, AssemblyReport, DocumentAssembler, Stitcher};
pub use batch::{BatchProcessor, BatchSummary, DocumentResult, DocumentStatus};
pub use error::{OcrError, PdfError, ReflowError, Result};
pub use events::{CancelFlag, Event, EventSink, NullSink, RecordingSink};
pub use models::config::ReflowConfig;
pub use models::fragment::{BBox, Fragment, FragmentSource, NativePage, PageContext};
pub use ocr::{DisabledOcr, OcrProvider};
#[cfg(feature = "native")]
pub use ocr::TesseractOcr;
pub use output::{DirectorySink, DocumentSink, unique_output_name};
pub use pdf::{DocumentLoader, PageSource, PdfExtractor, PdfLoader};
pub use text::{ClassificationVerdict, FragmentClassifier, NoiseReason, heal};
