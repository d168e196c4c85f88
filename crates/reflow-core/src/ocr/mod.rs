//! OCR providers for scanned pages.

#[cfg(feature = "native")]
mod tesseract;

#[cfg(feature = "native")]
pub use tesseract::TesseractOcr;

use image::DynamicImage;

use crate::error::OcrError;
use crate::models::config::ReflowConfig;

/// Turns a page raster into plain text.
pub trait OcrProvider: Send + Sync {
    /// Whether the engine can be used at all. Checked once per scanned page
    /// before calling [`OcrProvider::recognize`].
    fn is_available(&self) -> bool;

    /// Recognise the text on `image`. `language` is handed to the engine as is.
    fn recognize(&self, image: &DynamicImage, language: &str) -> Result<String, OcrError>;
}

/// Provider used when OCR is switched off; scanned pages keep their native text.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledOcr;

impl OcrProvider for DisabledOcr {
    fn is_available(&self) -> bool {
        false
    }

    fn recognize(&self, _image: &DynamicImage, _language: &str) -> Result<String, OcrError> {
        Err(OcrError::Unavailable("OCR is disabled".to_string()))
    }
}

/// The provider configured for this build.
#[cfg(feature = "native")]
pub fn default_provider(config: &ReflowConfig) -> Box<dyn OcrProvider> {
    Box::new(TesseractOcr::with_command(&config.ocr.tesseract_command))
}

/// The provider configured for this build.
#[cfg(not(feature = "native"))]
pub fn default_provider(_config: &ReflowConfig) -> Box<dyn OcrProvider> {
    Box::new(DisabledOcr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_provider() {
        let ocr = DisabledOcr;
        assert!(!ocr.is_available());
        let img = DynamicImage::new_luma8(4, 4);
        assert!(matches!(ocr.recognize(&img, "eng"), Err(OcrError::Unavailable(_))));
    }
}
