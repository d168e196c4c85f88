//! Subcommands and the pieces they share.

pub mod config;
pub mod extract;
pub mod process;

use std::io::{self, Write};
use std::path::Path;
use std::sync::LazyLock;

use clap::Args;
use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tracing::{Level, debug};
use tracing_subscriber::fmt::MakeWriter;

use reflow_core::{CancelFlag, DisabledOcr, EventSink, OcrProvider, ReflowConfig};

/// Pipeline options that override the configuration file.
#[derive(Args, Debug, Clone)]
pub struct PipelineArgs {
    /// Pages with fewer native characters than this are sent to OCR
    #[arg(long, value_name = "CHARS")]
    scan_threshold: Option<usize>,

    /// OCR language passed to tesseract (e.g. "eng", "eng+deu")
    #[arg(short, long)]
    lang: Option<String>,

    /// Also drop short unpunctuated title-case lines (bylines); may eat short headings
    #[arg(long)]
    strict: bool,

    /// Never run OCR; scanned pages keep whatever native text they have
    #[arg(long)]
    no_ocr: bool,
}

impl PipelineArgs {
    /// Apply command line overrides on top of `config`.
    pub fn apply(&self, config: &mut ReflowConfig) {
        if let Some(threshold) = self.scan_threshold {
            config.extraction.scan_threshold = threshold;
        }
        if let Some(lang) = &self.lang {
            config.extraction.ocr_language = lang.clone();
        }
        if self.strict {
            config.extraction.safe_mode = false;
        }
    }

    /// OCR provider for this run.
    pub fn ocr_provider(&self, config: &ReflowConfig) -> Box<dyn OcrProvider> {
        if self.no_ocr {
            Box::new(DisabledOcr)
        } else {
            reflow_core::ocr::default_provider(config)
        }
    }
}

/// Load the configuration: an explicit `--config` file, else the user config
/// file if present, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<ReflowConfig> {
    if let Some(path) = config_path {
        return Ok(ReflowConfig::from_file(Path::new(path))?);
    }

    let default_path = config::default_config_path();
    if default_path.exists() {
        debug!("Using config from {}", default_path.display());
        Ok(ReflowConfig::from_file(&default_path)?)
    } else {
        Ok(ReflowConfig::default())
    }
}

/// Cancel `flag` on Ctrl-C.
pub fn install_ctrlc(flag: CancelFlag) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        if !flag.is_cancelled() {
            eprintln!(
                "{} Cancelling after the current page...",
                style("!").yellow()
            );
        }
        flag.cancel();
    })?;
    Ok(())
}

/// Every progress bar of the process. Log output is printed through it.
static BARS: LazyLock<MultiProgress> = LazyLock::new(MultiProgress::new);

/// Log writer that hides active progress bars while a line is printed.
#[derive(Clone, Copy, Default)]
pub struct BarWriter;

impl Write for BarWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        BARS.suspend(|| io::stderr().write_all(buf))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

impl<'a> MakeWriter<'a> for BarWriter {
    type Writer = BarWriter;

    fn make_writer(&'a self) -> Self::Writer {
        *self
    }
}

/// Event sink drawing onto an indicatif progress bar.
///
/// Progress is scaled to 0..=1000. Info lines are echoed above the bar unless
/// the tracing subscriber already prints them.
pub struct ProgressSink {
    bar: ProgressBar,
    echo_info: bool,
}

impl ProgressSink {
    pub fn new() -> Self {
        let bar = BARS.add(ProgressBar::new(1000));
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent:>3}% {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );

        Self {
            bar,
            echo_info: !tracing::enabled!(Level::INFO),
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl EventSink for ProgressSink {
    fn log(&self, level: Level, message: &str) {
        if level != Level::INFO {
            return;
        }
        if message.starts_with('[') {
            self.bar.set_message(message.to_string());
        }
        if self.echo_info {
            self.bar.println(format!("{} {}", style("·").dim(), message));
        }
    }

    fn progress(&self, fraction: f32) {
        let position = (fraction.clamp(0.0, 1.0) * 1000.0).round() as u64;
        self.bar.set_position(position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_writer_passes_whole_lines_through() {
        let sink = ProgressSink::new();
        sink.progress(0.5);

        let mut writer = BarWriter.make_writer();
        assert_eq!(writer.write(b"page 1/2: kept 3 fragments (native)\n").unwrap(), 36);
        writer.flush().unwrap();
        sink.finish();
    }

    #[test]
    fn test_pipeline_args_override_config() {
        let args = PipelineArgs {
            scan_threshold: Some(10),
            lang: Some("deu".to_string()),
            strict: true,
            no_ocr: false,
        };
        let mut config = ReflowConfig::default();
        args.apply(&mut config);

        assert_eq!(config.extraction.scan_threshold, 10);
        assert_eq!(config.extraction.ocr_language, "deu");
        assert!(!config.extraction.safe_mode);
    }
}
