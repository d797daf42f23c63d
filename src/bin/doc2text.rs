//! CLI binary for doc2text.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig`, runs one extraction, and prints the result.

use anyhow::{Context, Result};
use clap::Parser;
use doc2text::{
    Document, ExtractionConfig, Extractor, OcrConfig, Stage, StageObserver, TesseractCli,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI stage observer using indicatif ───────────────────────────────────────

/// Spinner that shows which stage the request is in.
struct CliStageObserver {
    bar: ProgressBar,
}

impl CliStageObserver {
    fn new(file: &str) -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix(file.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl StageObserver for CliStageObserver {
    fn on_stage(&self, stage: Stage) {
        if !stage.is_terminal() {
            self.bar.set_message(format!("{stage}…"));
        }
    }

    fn on_failure(&self, last_stage: Stage, _reason: &str) {
        self.bar.finish_and_clear();
        eprintln!("{} failed after: {}", red("✘"), last_stage);
    }

    fn on_success(&self, char_count: usize) {
        self.bar.finish_and_clear();
        eprintln!("{} {} chars recognised", green("✔"), bold(&char_count.to_string()));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Text from a scanned page
  doc2text scan.png

  # First page of a PDF, German language data
  doc2text --lang deu letter.pdf

  # Bytes from a temp file, detected by the name they were uploaded as
  doc2text /tmp/upload-3f2a --name invoice.pdf

  # Keep the binarised image for inspection
  doc2text --save-normalized ./debug receipt.jpg

  # Machine-readable result
  doc2text --json form.pdf

  # Which engines are usable?
  doc2text --check

ENVIRONMENT VARIABLES:
  TESSERACT_CMD     Path to the tesseract executable
  TESSDATA_PREFIX   Directory holding tesseract language data
  PDFIUM_LIB_PATH   Path to libpdfium (file or containing directory)
  RUST_LOG          Log filter, overrides -v / -q
"#;

/// Extract text from a PDF or image with Tesseract OCR.
#[derive(Parser, Debug)]
#[command(
    name = "doc2text",
    version,
    about = "Extract text from a PDF or image with Tesseract OCR",
    long_about = "Extract plain text from an uploaded document. The first page of a PDF is \
rendered at 300 DPI with PDFium; image files are decoded directly. The page is binarised \
with an Otsu threshold and read by Tesseract.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF or image file to read.
    #[arg(required_unless_present = "check")]
    input: Option<PathBuf>,

    /// Filename used for kind detection instead of the input's own name.
    #[arg(long)]
    name: Option<String>,

    /// Tesseract language (e.g. eng, deu, eng+fra).
    #[arg(short, long, env = "DOC2TEXT_LANG", default_value = "eng")]
    lang: String,

    /// Tesseract page segmentation mode (0–13).
    #[arg(long, env = "DOC2TEXT_PSM",
          value_parser = clap::value_parser!(u8).range(0..=13))]
    psm: Option<u8>,

    /// PDF rendering DPI (72–600).
    #[arg(long, env = "DOC2TEXT_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Tesseract executable; overrides TESSERACT_CMD and PATH lookup.
    #[arg(long)]
    tesseract_cmd: Option<PathBuf>,

    /// Tesseract language data directory; overrides TESSDATA_PREFIX.
    #[arg(long)]
    tessdata: Option<PathBuf>,

    /// libpdfium file or directory; overrides PDFIUM_LIB_PATH.
    #[arg(long)]
    pdfium_lib: Option<PathBuf>,

    /// Write the binarised page into this directory.
    #[arg(long, env = "DOC2TEXT_SAVE_NORMALIZED")]
    save_normalized: Option<PathBuf>,

    /// Print {"text": ..., "error": ...} instead of plain text.
    #[arg(long, env = "DOC2TEXT_JSON")]
    json: bool,

    /// Report which engines are available and exit.
    #[arg(long)]
    check: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "DOC2TEXT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOC2TEXT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOC2TEXT_QUIET")]
    quiet: bool,
}

#[derive(serde::Serialize)]
struct JsonOutput {
    text: Option<String>,
    error: Option<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner covers INFO-level feedback; keep library logs quiet under it.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.check;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;

    if cli.check {
        return Ok(check(config));
    }

    let Some(ref path) = cli.input else {
        anyhow::bail!("No input file given");
    };
    let document = Document::from_path(path, cli.name.as_deref())
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut extractor = Extractor::from_config(config).context("Invalid configuration")?;
    if show_progress {
        extractor = extractor.with_observer(CliStageObserver::new(&document.name));
    }
    let extractor = Arc::new(extractor);

    let result = extractor.extract_async(document).await;
    let ok = result.is_success();
    let (text, error) = result.into_parts();

    if cli.json {
        let json = serde_json::to_string_pretty(&JsonOutput { text, error })
            .context("Failed to serialise output")?;
        println!("{json}");
    } else if let Some(text) = text {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(text.as_bytes())
            .context("Failed to write to stdout")?;
        if !text.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    } else if let Some(error) = error {
        eprintln!("{}", red(&error));
    }

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .dpi(cli.dpi)
        .language(cli.lang.clone());

    if let Some(psm) = cli.psm {
        builder = builder.page_segmentation_mode(psm);
    }
    if let Some(ref p) = cli.tesseract_cmd {
        builder = builder.tesseract_cmd(p);
    }
    if let Some(ref p) = cli.tessdata {
        builder = builder.tessdata_prefix(p);
    }
    if let Some(ref p) = cli.pdfium_lib {
        builder = builder.pdfium_library(p);
    }
    if let Some(ref d) = cli.save_normalized {
        builder = builder.artifact_dir(d);
    }

    builder.build().context("Invalid configuration")
}

/// Print one line per engine; fail when OCR is unusable.
fn check(config: ExtractionConfig) -> ExitCode {
    let ocr = TesseractCli::new(OcrConfig::resolve(&config));
    let ocr_ok = match ocr.version() {
        Ok(version) => {
            println!(
                "{} OCR       {}  ({}, via {:?})",
                green("✔"),
                version,
                ocr.config().command.display(),
                ocr.config().source
            );
            true
        }
        Err(e) => {
            println!("{} OCR       {}", red("✘"), e);
            false
        }
    };

    match Extractor::from_config(config) {
        Ok(extractor) => match extractor.pdf_unavailable_reason() {
            None => println!("{} PDF       pdfium bound", green("✔")),
            Some(reason) => println!("{} PDF       {}", red("✘"), reason),
        },
        Err(e) => println!("{} PDF       {}", red("✘"), e),
    }

    if ocr_ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
