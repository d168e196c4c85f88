//! Sequential multi-document driver.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::Level;

use crate::assembler::{Assembly, AssemblyReport, DocumentAssembler};
use crate::error::Result;
use crate::events::{CancelFlag, EventSink, NullSink, emit};
use crate::models::config::ReflowConfig;
use crate::ocr::{OcrProvider, default_provider};
use crate::output::DocumentSink;
use crate::pdf::{DocumentLoader, PdfLoader};

/// Final state of one input document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Text was handed to the sink, which stored it here.
    Written(PathBuf),
    /// Open, decode or write failed; nothing was stored.
    Failed(String),
    /// Cancelled while in flight; its text was discarded.
    Cancelled,
}

/// Per-document entry of a [`BatchSummary`].
#[derive(Debug, Clone, Serialize)]
pub struct DocumentResult {
    pub source: PathBuf,
    pub status: DocumentStatus,
    pub report: Option<AssemblyReport>,
    pub processing_time_ms: u64,
}

/// Everything a batch run did, in input order.
///
/// Documents never started because of cancellation are absent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub documents: Vec<DocumentResult>,
    pub cancelled: bool,
}

impl BatchSummary {
    pub fn written(&self) -> usize {
        self.count(|s| matches!(s, DocumentStatus::Written(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, DocumentStatus::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&DocumentStatus) -> bool) -> usize {
        self.documents.iter().filter(|d| pred(&d.status)).count()
    }
}

/// Runs documents one after another through the assembler and into a sink.
pub struct BatchProcessor {
    config: ReflowConfig,
    loader: Box<dyn DocumentLoader>,
    ocr: Box<dyn OcrProvider>,
    sink: Box<dyn DocumentSink>,
    events: Arc<dyn EventSink>,
    cancel: CancelFlag,
}

impl BatchProcessor {
    /// Create a processor writing to `sink`, with the PDF loader, the build's
    /// default OCR provider and tracing-only events.
    ///
    /// Fails if `config` does not validate.
    pub fn new(config: ReflowConfig, sink: Box<dyn DocumentSink>) -> Result<Self> {
        config.validate()?;
        let ocr = default_provider(&config);

        Ok(Self {
            config,
            loader: Box::new(PdfLoader),
            ocr,
            sink,
            events: Arc::new(NullSink),
            cancel: CancelFlag::new(),
        })
    }

    pub fn with_loader(mut self, loader: Box<dyn DocumentLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_ocr(mut self, ocr: Box<dyn OcrProvider>) -> Self {
        self.ocr = ocr;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle for cancelling a running batch from another thread.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Process `inputs` in order.
    ///
    /// A failing document is recorded and the batch moves on. Cancellation
    /// discards the in-flight document and starts no further ones.
    pub fn run(&mut self, inputs: &[PathBuf]) -> BatchSummary {
        let total = inputs.len();
        let mut summary = BatchSummary::default();
        let assembler = DocumentAssembler::new(&self.config, self.ocr.as_ref(), self.events.as_ref());

        for (index, source) in inputs.iter().enumerate() {
            if self.cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            emit(
                self.events.as_ref(),
                Level::INFO,
                format!("[{}/{}] processing {}", index + 1, total, display_name(source)),
            );

            let started = Instant::now();
            let document = match self.loader.open(source) {
                Ok(document) => document,
                Err(e) => {
                    emit(
                        self.events.as_ref(),
                        Level::ERROR,
                        format!("skipping {}: {}", display_name(source), e),
                    );
                    summary.documents.push(DocumentResult {
                        source: source.clone(),
                        status: DocumentStatus::Failed(e.to_string()),
                        report: None,
                        processing_time_ms: elapsed_ms(started),
                    });
                    self.events.progress((index + 1) as f32 / total as f32);
                    continue;
                }
            };

            let events = self.events.as_ref();
            let assembly = assembler.assemble(document.as_ref(), &self.cancel, |done, pages| {
                events.progress((index as f32 + done as f32 / pages as f32) / total as f32);
            });

            let (status, report) = match assembly {
                Assembly::Complete(doc) => match self.sink.write(source, &doc.text) {
                    Ok(path) => {
                        emit(
                            self.events.as_ref(),
                            Level::INFO,
                            format!("finished {}, wrote {}", display_name(source), path.display()),
                        );
                        (DocumentStatus::Written(path), Some(doc.report))
                    }
                    Err(e) => {
                        emit(
                            self.events.as_ref(),
                            Level::ERROR,
                            format!("failed to write {}: {}", display_name(source), e),
                        );
                        (DocumentStatus::Failed(e.to_string()), Some(doc.report))
                    }
                },
                Assembly::Cancelled { .. } => {
                    summary.cancelled = true;
                    (DocumentStatus::Cancelled, None)
                }
            };

            if document.page_count() == 0 {
                self.events.progress((index + 1) as f32 / total as f32);
            }

            let stop = status == DocumentStatus::Cancelled;
            summary.documents.push(DocumentResult {
                source: source.clone(),
                status,
                report,
                processing_time_ms: elapsed_ms(started),
            });
            if stop {
                break;
            }
        }

        summary
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PdfError, ReflowError};
    use crate::events::RecordingSink;
    use crate::models::fragment::{BBox, Fragment, NativePage};
    use crate::ocr::DisabledOcr;
    use crate::pdf::PageSource;
    use image::DynamicImage;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Pages are plain strings; every page is one long native fragment.
    struct TextSource {
        pages: Vec<String>,
        cancel_after: Option<(u32, CancelFlag)>,
    }

    impl PageSource for TextSource {
        fn page_count(&self) -> u32 {
            self.pages.len() as u32
        }

        fn native_page(&self, page: u32) -> crate::pdf::Result<NativePage> {
            if let Some((after, flag)) = &self.cancel_after {
                if page == *after {
                    flag.cancel();
                }
            }
            let text = self.pages[(page - 1) as usize].clone();
            Ok(NativePage {
                raw_text: text.clone(),
                page_height: 1000.0,
                fragments: vec![Fragment::native(text, BBox::new(72.0, 200.0, 500.0, 400.0))],
            })
        }

        fn page_image(&self, page: u32) -> crate::pdf::Result<DynamicImage> {
            Err(PdfError::NoPageImage(page))
        }
    }

    #[derive(Default)]
    struct MapLoader {
        documents: HashMap<PathBuf, Vec<String>>,
        cancel_after: Option<(PathBuf, u32, CancelFlag)>,
    }

    impl DocumentLoader for MapLoader {
        fn open(&self, path: &Path) -> Result<Box<dyn PageSource>> {
            let pages = self
                .documents
                .get(path)
                .cloned()
                .ok_or_else(|| ReflowError::Pdf(PdfError::Parse("not a PDF".to_string())))?;
            let cancel_after = self
                .cancel_after
                .as_ref()
                .filter(|(p, _, _)| p == path)
                .map(|(_, page, flag)| (*page, flag.clone()));
            Ok(Box::new(TextSource { pages, cancel_after }))
        }
    }

    #[derive(Clone, Default)]
    struct MemorySink {
        written: Arc<Mutex<Vec<(PathBuf, String)>>>,
        fail: bool,
    }

    impl DocumentSink for MemorySink {
        fn write(&mut self, source: &Path, text: &str) -> Result<PathBuf> {
            if self.fail {
                return Err(ReflowError::Output("disk full".to_string()));
            }
            let out = PathBuf::from(format!("/out/{}.txt", display_name(source)));
            self.written.lock().unwrap().push((source.to_path_buf(), text.to_string()));
            Ok(out)
        }
    }

    fn sentence(tag: &str) -> String {
        format!("Page {tag} holds a full sentence that is comfortably longer than fifty characters.")
    }

    fn loader(docs: &[(&str, usize)]) -> MapLoader {
        MapLoader {
            documents: docs
                .iter()
                .map(|(name, pages)| {
                    let pages = (1..=*pages).map(|p| sentence(&format!("{name}-{p}"))).collect();
                    (PathBuf::from(*name), pages)
                })
                .collect(),
            cancel_after: None,
        }
    }

    fn processor(loader: MapLoader, sink: MemorySink, events: Arc<RecordingSink>) -> BatchProcessor {
        BatchProcessor::new(ReflowConfig::default(), Box::new(sink))
            .unwrap()
            .with_loader(Box::new(loader))
            .with_ocr(Box::new(DisabledOcr))
            .with_events(events)
    }

    #[test]
    fn test_progress_per_page() {
        let events = Arc::new(RecordingSink::new());
        let sink = MemorySink::default();
        let mut batch = processor(loader(&[("a.pdf", 2), ("b.pdf", 2)]), sink.clone(), events.clone());

        let summary = batch.run(&[PathBuf::from("a.pdf"), PathBuf::from("b.pdf")]);

        assert_eq!(events.progress_values(), vec![0.25, 0.5, 0.75, 1.0]);
        assert_eq!(summary.written(), 2);
        assert!(!summary.cancelled);

        let written = sink.written.lock().unwrap();
        assert_eq!(written[0].1, format!("{}\n\n{}", sentence("a.pdf-1"), sentence("a.pdf-2")));
    }

    #[test]
    fn test_cancel_handle_stops_before_first_document() {
        let events = Arc::new(RecordingSink::new());
        let sink = MemorySink::default();
        let mut batch = processor(loader(&[("a.pdf", 1)]), sink.clone(), events.clone());

        batch.cancel_flag().cancel();
        let summary = batch.run(&[PathBuf::from("a.pdf")]);

        assert!(summary.cancelled);
        assert!(summary.documents.is_empty());
        assert!(sink.written.lock().unwrap().is_empty());
        assert!(events.messages().is_empty());
    }

    #[test]
    fn test_failed_document_does_not_stop_batch() {
        let events = Arc::new(RecordingSink::new());
        let sink = MemorySink::default();
        let mut batch = processor(loader(&[("good.pdf", 1)]), sink.clone(), events.clone());

        let summary = batch.run(&[PathBuf::from("broken.pdf"), PathBuf::from("good.pdf")]);

        assert_eq!(summary.documents.len(), 2);
        assert!(matches!(summary.documents[0].status, DocumentStatus::Failed(_)));
        assert_eq!(
            summary.documents[1].status,
            DocumentStatus::Written(PathBuf::from("/out/good.pdf.txt"))
        );
        assert_eq!(summary.failed(), 1);
        assert_eq!(events.progress_values(), vec![0.5, 1.0]);

        let messages = events.messages();
        assert_eq!(messages[0], "[1/2] processing broken.pdf");
        assert_eq!(
            messages[1],
            "skipping broken.pdf: PDF error: failed to parse PDF: not a PDF"
        );
        assert_eq!(messages[2], "[2/2] processing good.pdf");
    }

    #[test]
    fn test_cancel_discards_document_and_stops() {
        let events = Arc::new(RecordingSink::new());
        let sink = MemorySink::default();
        let mut docs = loader(&[("first.pdf", 1), ("second.pdf", 3), ("third.pdf", 1)]);
        let cancel = CancelFlag::new();
        docs.cancel_after = Some((PathBuf::from("second.pdf"), 1, cancel.clone()));

        let mut batch = processor(docs, sink.clone(), events.clone()).with_cancel_flag(cancel);
        let summary = batch.run(&[
            PathBuf::from("first.pdf"),
            PathBuf::from("second.pdf"),
            PathBuf::from("third.pdf"),
        ]);

        assert!(summary.cancelled);
        assert_eq!(summary.documents.len(), 2);
        assert_eq!(summary.documents[1].status, DocumentStatus::Cancelled);

        let written = sink.written.lock().unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].0, PathBuf::from("first.pdf"));
        assert!(!events.messages().iter().any(|m| m.contains("third.pdf")));
    }

    #[test]
    fn test_write_failure_recorded() {
        let events = Arc::new(RecordingSink::new());
        let sink = MemorySink {
            fail: true,
            ..MemorySink::default()
        };
        let mut batch = processor(loader(&[("a.pdf", 1)]), sink, events);

        let summary = batch.run(&[PathBuf::from("a.pdf")]);
        assert_eq!(
            summary.documents[0].status,
            DocumentStatus::Failed("output error: disk full".to_string())
        );
        assert!(summary.documents[0].report.is_some());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = ReflowConfig::default();
        config.classifier.top_band = 0.95;
        assert!(matches!(
            BatchProcessor::new(config, Box::new(MemorySink::default())),
            Err(ReflowError::Config(_))
        ));
    }
}
