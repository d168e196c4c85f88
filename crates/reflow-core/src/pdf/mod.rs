//! PDF page access.

mod blocks;
mod extractor;

pub use blocks::BlockCollector;
pub use extractor::PdfExtractor;

use std::path::Path;

use crate::error::PdfError;
use crate::models::fragment::NativePage;
use image::DynamicImage;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Per-page access to an opened document. Pages are 1-indexed.
pub trait PageSource {
    /// Number of pages in the document.
    fn page_count(&self) -> u32;

    /// Positioned text blocks and plain text of a page.
    fn native_page(&self, page: u32) -> Result<NativePage>;

    /// Raster of a page, for OCR.
    fn page_image(&self, page: u32) -> Result<DynamicImage>;
}

/// Opens documents by path.
pub trait DocumentLoader: Send {
    fn open(&self, path: &Path) -> crate::Result<Box<dyn PageSource>>;
}

/// Loader for PDF files on disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfLoader;

impl DocumentLoader for PdfLoader {
    fn open(&self, path: &Path) -> crate::Result<Box<dyn PageSource>> {
        Ok(Box::new(PdfExtractor::open(path)?))
    }
}
