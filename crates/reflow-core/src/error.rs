//! Error types for the reflow-core library.

use thiserror::Error;

/// Main error type for the reflow library.
#[derive(Error, Debug)]
pub enum ReflowError {
    /// PDF decoding error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Failed to hand the assembled text to its destination.
    #[error("output error: {0}")]
    Output(String),
}

/// Errors related to PDF decoding.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract positioned text from a page.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),

    /// A scanned page carries no image that could be handed to OCR.
    #[error("no decodable image on page {0}")]
    NoPageImage(u32),
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// The OCR engine binary could not be found.
    #[error("OCR engine not available: {0}")]
    Unavailable(String),

    /// The OCR engine ran but reported a failure.
    #[error("recognition failed: {0}")]
    Recognition(String),

    /// Writing the page image for the engine failed.
    #[error("failed to prepare image: {0}")]
    Preprocessing(String),

    /// I/O error while talking to the engine.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the reflow library.
pub type Result<T> = std::result::Result<T, ReflowError>;
