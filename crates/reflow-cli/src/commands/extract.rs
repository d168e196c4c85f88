//! Extract command - reflow many PDFs into an output directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use tracing::debug;

use reflow_core::{BatchProcessor, BatchSummary, DirectorySink, DocumentStatus};

use super::{PipelineArgs, ProgressSink, install_ctrlc, load_config};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input PDF files or glob patterns (e.g. "papers/*.pdf")
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Output directory (default: current directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Also write summary.csv into the output directory
    #[arg(long)]
    summary: bool,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    args.pipeline.apply(&mut config);

    let files = expand_inputs(&args.inputs)?;
    if files.is_empty() {
        anyhow::bail!("No matching PDF files found for: {}", args.inputs.join(" "));
    }

    let output_dir = args.output_dir.clone().unwrap_or_else(|| PathBuf::from("."));

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    let ocr = args.pipeline.ocr_provider(&config);
    let progress = Arc::new(ProgressSink::new());
    let mut processor = BatchProcessor::new(config, Box::new(DirectorySink::new(&output_dir)))?
        .with_ocr(ocr)
        .with_events(progress.clone());
    install_ctrlc(processor.cancel_flag())?;

    let summary = tokio::task::spawn_blocking(move || processor.run(&files)).await?;
    progress.finish();

    if args.summary {
        let summary_path = output_dir.join("summary.csv");
        write_summary(&summary_path, &summary)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    print_summary(&summary, start);
    Ok(())
}

/// Expand globs; plain paths are taken as given so a missing file is reported
/// per document instead of silently vanishing.
fn expand_inputs(inputs: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in inputs {
        if !input.contains(['*', '?', '[']) {
            files.push(PathBuf::from(input));
            continue;
        }

        let before = files.len();
        files.extend(glob(input)?.filter_map(|r| r.ok()).filter(|p| is_pdf(p)));
        debug!("Pattern {} matched {} files", input, files.len() - before);
    }

    Ok(files)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

fn print_summary(summary: &BatchSummary, start: Instant) {
    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        summary.documents.len(),
        start.elapsed()
    );
    println!(
        "   {} written, {} failed",
        style(summary.written()).green(),
        style(summary.failed()).red()
    );

    for doc in &summary.documents {
        match &doc.status {
            DocumentStatus::Written(path) => {
                println!("  {} {}", style("→").green(), path.display());
            }
            DocumentStatus::Failed(error) => {
                println!("  {} {}: {}", style("✗").red(), doc.source.display(), error);
            }
            DocumentStatus::Cancelled => {
                println!("  {} {} (discarded)", style("!").yellow(), doc.source.display());
            }
        }
    }

    if summary.cancelled {
        println!();
        println!("{}", style("Cancelled: remaining files were not started.").yellow());
    }
}

fn write_summary(path: &Path, summary: &BatchSummary) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "output",
        "pages",
        "native_pages",
        "ocr_pages",
        "failed_pages",
        "kept_fragments",
        "dropped_fragments",
        "processing_time_ms",
        "error",
    ])?;

    for doc in &summary.documents {
        let filename = doc
            .source
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let (status, output, error) = match &doc.status {
            DocumentStatus::Written(path) => ("written", path.display().to_string(), String::new()),
            DocumentStatus::Failed(e) => ("failed", String::new(), e.clone()),
            DocumentStatus::Cancelled => ("cancelled", String::new(), String::new()),
        };

        let counts = match &doc.report {
            Some(r) => [
                r.pages_total.to_string(),
                r.pages_native.to_string(),
                r.pages_ocr.to_string(),
                r.pages_failed.to_string(),
                r.fragments_kept.to_string(),
                r.dropped_total().to_string(),
            ],
            None => Default::default(),
        };

        let mut record = vec![filename, status.to_string(), output];
        record.extend(counts);
        record.push(doc.processing_time_ms.to_string());
        record.push(error);
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reflow_core::{AssemblyReport, DocumentResult};
    use tempfile::TempDir;

    #[test]
    fn test_plain_paths_kept_and_globs_filtered() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.pdf"), b"").unwrap();
        std::fs::write(dir.path().join("b.PDF"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let pattern = format!("{}/*", dir.path().display());
        let mut files = expand_inputs(&[pattern, "missing.pdf".to_string()]).unwrap();
        files.sort();

        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.pdf", "b.PDF", "missing.pdf"]);
    }

    #[test]
    fn test_summary_csv() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("summary.csv");
        let summary = BatchSummary {
            documents: vec![
                DocumentResult {
                    source: PathBuf::from("in/a.pdf"),
                    status: DocumentStatus::Written(PathBuf::from("out/a.txt")),
                    report: Some(AssemblyReport {
                        pages_total: 3,
                        pages_native: 2,
                        pages_ocr: 1,
                        fragments_kept: 12,
                        ..AssemblyReport::default()
                    }),
                    processing_time_ms: 40,
                },
                DocumentResult {
                    source: PathBuf::from("in/b.pdf"),
                    status: DocumentStatus::Failed("bad xref".to_string()),
                    report: None,
                    processing_time_ms: 2,
                },
            ],
            cancelled: false,
        };

        write_summary(&path, &summary).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "a.pdf,written,out/a.txt,3,2,1,0,12,0,40,");
        assert_eq!(lines[2], "b.pdf,failed,,,,,,,,2,bad xref");
    }
}
