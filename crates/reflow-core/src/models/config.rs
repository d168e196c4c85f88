//! Configuration structures for the reconstruction pipeline.

use serde::{Deserialize, Serialize};

use crate::error::ReflowError;

/// Main configuration for the reflow pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReflowConfig {
    /// Page-level extraction settings.
    pub extraction: ExtractionConfig,

    /// Noise classifier thresholds.
    pub classifier: ClassifierConfig,

    /// OCR engine settings.
    pub ocr: OcrConfig,

    /// Output and logging settings.
    pub output: OutputConfig,
}

/// Page-level extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Pages whose stripped native text has fewer characters than this are
    /// treated as scanned images and sent to OCR.
    pub scan_threshold: usize,

    /// Disables the title-case byline rule so short headings survive.
    pub safe_mode: bool,

    /// Language string passed through to the OCR engine unmodified.
    pub ocr_language: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            scan_threshold: 50,
            safe_mode: true,
            ocr_language: "eng".to_string(),
        }
    }
}

/// Thresholds for the fragment noise classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Fragments starting above this fraction of the page height sit in the header band.
    pub top_band: f32,

    /// Fragments ending below this fraction of the page height sit in the footer band.
    pub bottom_band: f32,

    /// Edge fragments with fewer words than this are dropped.
    pub edge_max_words: usize,

    /// Byline rule only applies to fragments with fewer words than this.
    pub byline_max_words: usize,

    /// Share of title-cased words above which a short fragment is a byline.
    pub byline_title_ratio: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            top_band: 0.08,
            bottom_band: 0.92,
            edge_max_words: 10,
            byline_max_words: 6,
            byline_title_ratio: 0.6,
        }
    }
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Name or path of the tesseract binary.
    pub tesseract_command: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_command: "tesseract".to_string(),
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Number of characters shown when logging a dropped fragment.
    pub preview_chars: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { preview_chars: 30 }
    }
}

impl ReflowConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Check value ranges before any document is touched.
    pub fn validate(&self) -> Result<(), ReflowError> {
        let c = &self.classifier;

        if !(0.0..=1.0).contains(&c.top_band) || !(0.0..=1.0).contains(&c.bottom_band) {
            return Err(ReflowError::Config(format!(
                "edge bands must lie within [0, 1] (top_band={}, bottom_band={})",
                c.top_band, c.bottom_band
            )));
        }
        if c.top_band >= c.bottom_band {
            return Err(ReflowError::Config(format!(
                "top_band ({}) must be below bottom_band ({})",
                c.top_band, c.bottom_band
            )));
        }
        if !(0.0..=1.0).contains(&c.byline_title_ratio) {
            return Err(ReflowError::Config(format!(
                "byline_title_ratio must lie within [0, 1], got {}",
                c.byline_title_ratio
            )));
        }
        if self.extraction.ocr_language.trim().is_empty() {
            return Err(ReflowError::Config("ocr_language must not be empty".to_string()));
        }
        if self.ocr.tesseract_command.trim().is_empty() {
            return Err(ReflowError::Config("tesseract_command must not be empty".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ReflowConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.extraction.scan_threshold, 50);
        assert!(config.extraction.safe_mode);
        assert_eq!(config.classifier.edge_max_words, 10);
    }

    #[test]
    fn test_inverted_bands_rejected() {
        let mut config = ReflowConfig::default();
        config.classifier.top_band = 0.95;
        assert!(matches!(config.validate(), Err(ReflowError::Config(_))));
    }

    #[test]
    fn test_ratio_out_of_range_rejected() {
        let mut config = ReflowConfig::default();
        config.classifier.byline_title_ratio = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ReflowConfig =
            serde_json::from_str(r#"{"extraction": {"safe_mode": false}}"#).unwrap();
        assert!(!config.extraction.safe_mode);
        assert_eq!(config.extraction.scan_threshold, 50);
        assert_eq!(config.output.preview_chars, 30);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = ReflowConfig::default();
        config.extraction.ocr_language = "eng+chi_sim".to_string();
        config.save(&path).unwrap();

        let loaded = ReflowConfig::from_file(&path).unwrap();
        assert_eq!(loaded.extraction.ocr_language, "eng+chi_sim");
    }
}
