//! Process command - reflow a single PDF to stdout or a file.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::info;

use reflow_core::{Assembly, CancelFlag, DocumentAssembler, DocumentLoader, EventSink, PdfLoader};

use super::{PipelineArgs, ProgressSink, install_ctrlc, load_config};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input PDF file
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Print per-page statistics as JSON to stderr
    #[arg(long)]
    report: bool,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    args.pipeline.apply(&mut config);
    config.validate()?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let ocr = args.pipeline.ocr_provider(&config);
    let progress = Arc::new(ProgressSink::new());
    let cancel = CancelFlag::new();
    install_ctrlc(cancel.clone())?;

    let input = args.input.clone();
    let events = progress.clone();
    let assembly = tokio::task::spawn_blocking(move || -> anyhow::Result<Assembly> {
        let document = PdfLoader.open(&input)?;
        let assembler = DocumentAssembler::new(&config, ocr.as_ref(), events.as_ref());
        Ok(assembler.assemble(document.as_ref(), &cancel, |done, total| {
            events.progress(done as f32 / total as f32);
        }))
    })
    .await??;
    progress.finish();

    let doc = match assembly {
        Assembly::Complete(doc) => doc,
        Assembly::Cancelled { pages_processed } => {
            anyhow::bail!("Cancelled after {} pages; nothing written", pages_processed);
        }
    };

    info!(
        "Assembled {} pages ({} native, {} OCR, {} failed) in {:?}",
        doc.report.pages_total,
        doc.report.pages_native,
        doc.report.pages_ocr,
        doc.report.pages_failed,
        start.elapsed()
    );

    if args.report {
        eprintln!("{}", serde_json::to_string_pretty(&doc.report)?);
    }

    match &args.output {
        Some(path) => {
            fs::write(path, &doc.text)?;
            eprintln!(
                "{} Text written to {}",
                style("✓").green(),
                path.display()
            );
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(doc.text.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }

    Ok(())
}
