//! Destinations for assembled text.

use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{ReflowError, Result};

/// Receives one assembled document per source file.
pub trait DocumentSink: Send {
    /// Persist `text` for `source` and return where it went.
    fn write(&mut self, source: &Path, text: &str) -> Result<PathBuf>;
}

/// Writes `{stem}_{YYYYmmdd_HHMMSS}_{xxxx}.txt` files into one directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DocumentSink for DirectorySink {
    fn write(&mut self, source: &Path, text: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        // Names carry a random suffix; retry on the rare collision instead of overwriting.
        for _ in 0..8 {
            let path = self.dir.join(unique_output_name(source));
            match write_new(&path, |file| file.write_all(text.as_bytes())) {
                Ok(()) => {
                    debug!("Wrote {} bytes to {}", text.len(), path.display());
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(ReflowError::Output(format!(
            "could not find a free output name for {} in {}",
            source.display(),
            self.dir.display()
        )))
    }
}

/// Create `path` exclusively and fill it. A failed fill removes the file again.
fn write_new(path: &Path, fill: impl FnOnce(&mut File) -> io::Result<()>) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;

    if let Err(e) = fill(&mut file).and_then(|()| file.sync_all()) {
        drop(file);
        if let Err(remove) = fs::remove_file(path) {
            warn!("Could not remove partial output {}: {}", path.display(), remove);
        }
        return Err(e);
    }
    Ok(())
}

/// Output file name for `source`: stem, local timestamp and a 4-hex suffix.
pub fn unique_output_name(source: &Path) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(4).collect();

    format!("{stem}_{timestamp}_{suffix}.txt")
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;
    use tempfile::TempDir;

    #[test]
    fn test_output_name_shape() {
        let name = unique_output_name(Path::new("/papers/Smith 2021.pdf"));
        let shape = Regex::new(r"^Smith 2021_\d{8}_\d{6}_[0-9a-f]{4}\.txt$").unwrap();
        assert!(shape.is_match(&name), "unexpected name {name}");
    }

    #[test]
    fn test_output_name_without_stem() {
        assert!(unique_output_name(Path::new("/")).starts_with("document_"));
    }

    #[test]
    fn test_directory_sink_writes_distinct_files() {
        let dir = TempDir::new().unwrap();
        let mut sink = DirectorySink::new(dir.path().join("out"));

        let first = sink.write(Path::new("paper.pdf"), "first").unwrap();
        let second = sink.write(Path::new("paper.pdf"), "second").unwrap();

        assert_ne!(first, second);
        assert_eq!(fs::read_to_string(&first).unwrap(), "first");
        assert_eq!(fs::read_to_string(&second).unwrap(), "second");
        assert_eq!(first.parent(), Some(sink.dir.as_path()));
    }

    #[test]
    fn test_failed_write_leaves_no_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("paper.txt");

        let err = write_new(&path, |file| {
            file.write_all(b"half a docu")?;
            Err(io::Error::other("disk full"))
        })
        .unwrap_err();

        assert_eq!(err.to_string(), "disk full");
        assert!(!path.exists());
    }

    #[test]
    fn test_write_new_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("paper.txt");
        fs::write(&path, "kept").unwrap();

        let err = write_new(&path, |file| file.write_all(b"replaced")).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(fs::read_to_string(&path).unwrap(), "kept");
    }
}
