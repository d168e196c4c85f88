//! Tesseract command-line backend.

use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;

use image::DynamicImage;
use tracing::debug;

use super::OcrProvider;
use crate::error::OcrError;

/// Runs the `tesseract` binary on a temporary PNG of the page.
#[derive(Debug)]
pub struct TesseractOcr {
    command: String,
    available: OnceLock<bool>,
}

impl TesseractOcr {
    /// Use `tesseract` from `PATH`.
    pub fn new() -> Self {
        Self::with_command("tesseract")
    }

    /// Use a specific binary name or path.
    pub fn with_command(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            available: OnceLock::new(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    fn probe(&self) -> bool {
        let found = Command::new(&self.command)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false);
        debug!("tesseract probe '{}': {}", self.command, found);
        found
    }

    fn run(&self, image_path: &Path, language: &str) -> Result<String, OcrError> {
        let output = Command::new(&self.command)
            .arg(image_path)
            .arg("stdout")
            .args(["-l", language])
            .output();

        match output {
            Ok(output) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(OcrError::Recognition(format!("tesseract failed: {}", stderr.trim())))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(OcrError::Unavailable(
                format!("'{}' not found (install tesseract-ocr)", self.command),
            )),
            Err(e) => Err(OcrError::Io(e)),
        }
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrProvider for TesseractOcr {
    fn is_available(&self) -> bool {
        *self.available.get_or_init(|| self.probe())
    }

    fn recognize(&self, image: &DynamicImage, language: &str) -> Result<String, OcrError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("page.png");
        image
            .save_with_format(&path, image::ImageFormat::Png)
            .map_err(|e| OcrError::Preprocessing(e.to_string()))?;

        self.run(&path, language)
    }
}
