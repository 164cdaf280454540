//! CLI binary for edgequake-plan2csv.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_plan2csv::service::validate_folder;
use edgequake_plan2csv::{
    extract_file, run_job, DecimalSeparator, ExtractionConfig, JobProgressCallback, JobService,
    JobStore, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar over the job's documents plus a log
/// line per finished document.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start of the document currently being processed.
    doc_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Scanning");
        bar.set_message("Looking for plans…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            doc_started: Mutex::new(None),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} plans  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Extracting");
        self.bar.reset_eta();
    }

    fn take_elapsed(&self) -> f64 {
        self.doc_started
            .lock()
            .ok()
            .and_then(|mut s| s.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl JobProgressCallback for CliProgressCallback {
    fn on_job_start(&self, total_files: usize) {
        self.activate_bar(total_files);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Found {total_files} plans"))
        ));
    }

    fn on_no_files(&self, root: &Path) {
        self.bar.finish_and_clear();
        eprintln!("{} No plan.pdf under {}", cyan("⚠"), root.display());
    }

    fn on_document_start(&self, _index: usize, _total: usize, path: &Path) {
        if let Ok(mut s) = self.doc_started.lock() {
            *s = Some(Instant::now());
        }
        self.bar.set_message(path.display().to_string());
    }

    fn on_document_complete(&self, index: usize, total: usize, path: &Path, pairs: usize) {
        let elapsed = self.take_elapsed();
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {:<10}  {}  {}",
            green("✓"),
            index,
            total,
            dim(&format!("{pairs:>4} pairs")),
            path.display(),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, index: usize, total: usize, path: &Path, error: &str) {
        self.take_elapsed();

        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            red("✗"),
            index,
            total,
            path.display(),
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_job_complete(&self, total_files: usize, succeeded: usize) {
        let failed = total_files.saturating_sub(succeeded);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} plans extracted successfully",
                green("✔"),
                bold(&succeeded.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} plans extracted  ({} failed)",
                if failed == total_files {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&succeeded.to_string()),
                total_files,
                red(&failed.to_string()),
            );
        }
    }

    fn on_job_failed(&self, error: &str) {
        self.bar.finish_and_clear();
        eprintln!("{} Job aborted: {}", red("✘"), error);
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Every plan.pdf under a folder tree → plan.csv beside each
  plan2csv run /data/plans

  # One document
  plan2csv extract /data/plans/site-a/plan.pdf

  # Point decimals, 4 OCR workers, JSON status report
  plan2csv run --decimal point --workers 4 --json /data/plans

  # HTTP front end (build with --features server)
  plan2csv serve --port 8000

OUTPUT:
  plan.csv, semicolon separated, header X;Y, one row per coordinate pair.

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Directory (or file) of the pdfium shared library
  PLAN2CSV_DPI            Rendering DPI
  PLAN2CSV_WORKERS        OCR worker count (default: cores - 1)
  PLAN2CSV_LANG           Tesseract language (default: fra)
  PLAN2CSV_TESSERACT      Tesseract executable (default: tesseract)
  PLAN2CSV_DECIMAL        comma | point
  RUST_LOG                Overrides the log filter

SETUP:
  1. Install tesseract with the language pack:  apt install tesseract-ocr-fra
  2. Download pdfium and export PDFIUM_LIB_PATH=/path/to/pdfium/lib
"#;

/// Extract X;Y coordinate tables from scanned PDF plans.
#[derive(Parser, Debug)]
#[command(
    name = "plan2csv",
    version,
    about = "Extract X;Y coordinate tables from scanned PDF plans",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PLAN2CSV_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PLAN2CSV_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process every plan.pdf under a folder.
    Run {
        /// Root folder to scan.
        folder: String,

        #[command(flatten)]
        engine: EngineArgs,

        /// Print the final job status report as JSON.
        #[arg(long, env = "PLAN2CSV_JSON")]
        json: bool,

        /// Disable progress bar.
        #[arg(long, env = "PLAN2CSV_NO_PROGRESS")]
        no_progress: bool,
    },

    /// Process a single PDF.
    Extract {
        /// PDF to process; the table is written beside it.
        pdf: PathBuf,

        #[command(flatten)]
        engine: EngineArgs,

        /// Print the document report as JSON.
        #[arg(long, env = "PLAN2CSV_JSON")]
        json: bool,
    },

    /// Serve the job API over HTTP.
    #[cfg(feature = "server")]
    Serve {
        #[arg(long, env = "PLAN2CSV_HOST", default_value = "127.0.0.1")]
        host: String,

        #[arg(long, env = "PLAN2CSV_PORT", default_value_t = 8000)]
        port: u16,

        #[command(flatten)]
        engine: EngineArgs,
    },
}

#[derive(Args, Debug)]
struct EngineArgs {
    /// pdfium library location (directory or file).
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium: Option<PathBuf>,

    /// Rendering DPI (72–600).
    #[arg(long, env = "PLAN2CSV_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// OCR worker count. Default: cores - 1.
    #[arg(short, long, env = "PLAN2CSV_WORKERS")]
    workers: Option<usize>,

    /// Tesseract language code.
    #[arg(long, env = "PLAN2CSV_LANG", default_value = "fra")]
    lang: String,

    /// Tesseract executable.
    #[arg(long, env = "PLAN2CSV_TESSERACT", default_value = "tesseract")]
    tesseract: PathBuf,

    /// Decimal separator written to tables.
    #[arg(long, env = "PLAN2CSV_DECIMAL", value_enum, default_value = "comma")]
    decimal: DecimalArg,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum DecimalArg {
    Comma,
    Point,
}

impl From<DecimalArg> for DecimalSeparator {
    fn from(v: DecimalArg) -> Self {
        match v {
            DecimalArg::Comma => DecimalSeparator::Comma,
            DecimalArg::Point => DecimalSeparator::Point,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs during `run`.
    let show_progress = matches!(
        &cli.command,
        Command::Run { json: false, no_progress: false, .. }
    ) && !cli.quiet;
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

    match cli.command {
        Command::Run {
            ref folder,
            ref engine,
            json,
            ..
        } => {
            let progress: Option<ProgressCallback> = if show_progress {
                Some(CliProgressCallback::new() as Arc<dyn JobProgressCallback>)
            } else {
                None
            };
            let config = build_config(engine, progress)?;
            run_folder(folder, config, json, cli.quiet).await
        }
        Command::Extract {
            ref pdf,
            ref engine,
            json,
        } => {
            let config = build_config(engine, None)?;
            let report = extract_file(pdf, &config)
                .await
                .with_context(|| format!("Extraction failed for {}", pdf.display()))?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report).context("Failed to serialise report")?
                );
            } else if !cli.quiet {
                eprintln!(
                    "{}  {} pages  {} pairs  {:.1}s  →  {}",
                    green("✔"),
                    report.pages,
                    report.pairs.len(),
                    report.elapsed.as_secs_f64(),
                    bold(&report.csv_path.display().to_string()),
                );
            }
            Ok(())
        }
        #[cfg(feature = "server")]
        Command::Serve {
            ref host,
            port,
            ref engine,
        } => {
            let config = build_config(engine, None)?;
            let addr: std::net::SocketAddr = format!("{}:{}", host, port)
                .parse()
                .with_context(|| format!("Invalid listen address {}:{}", host, port))?;
            edgequake_plan2csv::server::serve(JobService::new(config), addr)
                .await
                .context("Server stopped")
        }
    }
}

/// Run a folder job in the foreground.
async fn run_folder(folder: &str, config: ExtractionConfig, json: bool, quiet: bool) -> Result<()> {
    let root = validate_folder(folder).context("Invalid folder")?;
    let store = Arc::new(JobStore::new());
    let job = store.create_job(root);

    let summary = run_job(job.id, &store, &config)
        .await
        .context("Job failed")?;

    if json {
        let service = JobService::with_store(Arc::clone(&store), config);
        let report = service.job_status(job.id)?;
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else if !quiet && config.progress_callback.is_none() {
        eprintln!(
            "Processed {}/{} plans in {:.1}s",
            summary.succeeded, summary.total_files, summary.total_processing_time
        );
        if summary.failed > 0 {
            eprintln!("  {} plans failed", summary.failed);
        }
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(args: &EngineArgs, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .dpi(args.dpi)
        .ocr_language(args.lang.clone())
        .ocr_binary(args.tesseract.clone())
        .decimal_separator(args.decimal.clone().into());

    if let Some(ref lib) = args.pdfium {
        builder = builder.pdfium_lib_path(lib.clone());
    }
    if let Some(n) = args.workers {
        builder = builder.workers(n);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
