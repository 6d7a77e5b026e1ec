//! CLI binary for pdfconvert.
//!
//! A thin shim over the library crate: maps flags and environment variables
//! to `ConverterConfig`, then converts a local file, lists formats, or runs
//! the HTTP service.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdfconvert::{
    ConversionProgressCallback, Converter, ConverterConfig, FormatStatus, ProgressCallback,
    SourceDocument,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner until the first page event, then a page counter.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn activate_bar(&self, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} pages  {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");
        self.bar.set_length(total as u64);
        self.bar.set_style(style);
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, format: &str) {
        self.bar.set_prefix("Converting");
        self.bar.set_message(format!("to {format}"));
    }

    fn on_page_complete(&self, page_num: usize, total_pages: usize) {
        if self.bar.length() != Some(total_pages as u64) {
            self.activate_bar(total_pages);
        }
        self.bar.set_position(page_num as u64);
    }

    fn on_conversion_complete(&self, format: &str, bytes: u64) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} written ({})",
            green("✔"),
            bold(format),
            dim(&format!("{bytes} bytes"))
        );
    }

    fn on_conversion_error(&self, format: &str, message: &str) {
        self.bar.finish_and_clear();
        eprintln!("{} {} failed: {}", red("✘"), bold(format), red(message));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert a local PDF to Word
  pdfconvert convert report.pdf --to docx

  # Per-page PNG archive at 300 DPI into ./out
  pdfconvert --dpi 300 --output-dir out convert slides.pdf --to png

  # List formats and whether their toolchain was found
  pdfconvert formats

  # Run the HTTP service
  pdfconvert serve --bind 0.0.0.0:8080

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH            libpdfium or the directory containing it
  PDFCONVERT_UPLOAD_DIR      Where uploads are stored (default: uploads)
  PDFCONVERT_OUTPUT_DIR      Where outputs are written (default: converted)
  PDFCONVERT_STAGING_DIR     Parent of per-job staging directories
  PDFCONVERT_DPI             Rendering DPI (72-600, default 200)
  PDFCONVERT_MAX_UPLOAD_MB   Upload size cap in MiB (default 50)
  PANDOC_PATH                pandoc executable (doc, rtf, epub, mobi, odt, markdown, pages)
  JAVA_PATH                  java executable for tabula (csv, xlsx)
  TABULA_JAR                 tabula-java jar with dependencies
  PDFCONVERT_BIND            Listen address for `serve`
  RUST_LOG                   Overrides --verbose / --quiet
"#;

/// Convert PDF documents to text, HTML, Office, image and e-book formats.
#[derive(Parser, Debug)]
#[command(
    name = "pdfconvert",
    version,
    about = "Convert PDF documents to text, HTML, Office, image and e-book formats",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDFCONVERT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDFCONVERT_QUIET")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct Settings {
    /// Path to libpdfium, or the directory containing it.
    #[arg(long, global = true, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    #[arg(long, global = true, env = "PDFCONVERT_UPLOAD_DIR", default_value = "uploads")]
    upload_dir: PathBuf,

    #[arg(long, global = true, env = "PDFCONVERT_OUTPUT_DIR", default_value = "converted")]
    output_dir: PathBuf,

    /// Parent directory for per-job staging areas (default: system temp dir).
    #[arg(long, global = true, env = "PDFCONVERT_STAGING_DIR")]
    staging_dir: Option<PathBuf>,

    /// Rendering DPI (72-600).
    #[arg(long, global = true, env = "PDFCONVERT_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Upload size cap in MiB.
    #[arg(long, global = true, env = "PDFCONVERT_MAX_UPLOAD_MB", default_value_t = 50,
          value_parser = clap::value_parser!(u64).range(1..=4096))]
    max_upload_mb: u64,

    #[arg(long, global = true, env = "PANDOC_PATH", default_value = "pandoc")]
    pandoc: PathBuf,

    #[arg(long, global = true, env = "JAVA_PATH", default_value = "java")]
    java: PathBuf,

    #[arg(long, global = true, env = "TABULA_JAR")]
    tabula_jar: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, global = true, env = "PDFCONVERT_PASSWORD")]
    password: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a local PDF file.
    Convert {
        /// PDF file to convert.
        input: PathBuf,

        /// Output format key (see `pdfconvert formats`).
        #[arg(short = 't', long = "to")]
        format: String,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List the output formats and their availability.
    Formats {
        #[arg(long)]
        json: bool,
    },

    /// Run the HTTP service.
    Serve {
        #[arg(long, env = "PDFCONVERT_BIND", default_value = "127.0.0.1:8080")]
        bind: std::net::SocketAddr,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs during a local conversion.
    let show_progress = !cli.quiet && matches!(cli.command, Command::Convert { json: false, .. });
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

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli.settings, progress_cb)?;
    let converter = Converter::start(config)
        .await
        .context("Failed to start converter")?;

    match cli.command {
        Command::Convert {
            input,
            format,
            json,
        } => {
            let source = SourceDocument::from_path(&input)
                .with_context(|| format!("Cannot use '{}' as input", input.display()))?;
            let output = converter
                .convert(&source, &format)
                .await
                .with_context(|| format!("Failed to convert '{}'", input.display()))?;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&output).context("Failed to serialize result")?
                );
            } else {
                println!("{}", output.destination.display());
            }
        }

        Command::Formats { json } => {
            let registry = converter.registry();
            if json {
                let formats: Vec<_> = registry.iter().collect();
                println!(
                    "{}",
                    serde_json::to_string_pretty(&formats).context("Failed to serialize formats")?
                );
            } else {
                for f in registry.iter() {
                    let status = match f.status {
                        FormatStatus::Stable => green("stable"),
                        FormatStatus::RequiresOptionalDependency(dep) => {
                            green(&format!("via {dep}"))
                        }
                        FormatStatus::Disabled(dep) => red(&format!("disabled (needs {dep})")),
                    };
                    println!("  {:<10} {:<28} .{:<5} {}", bold(f.key), f.name, f.extension, status);
                }
            }
        }

        Command::Serve { bind } => {
            serve(converter, bind).await?;
        }
    }

    Ok(())
}

fn build_config(s: &Settings, progress: Option<ProgressCallback>) -> Result<ConverterConfig> {
    let max_upload_bytes = usize::try_from(s.max_upload_mb * 1024 * 1024)
        .context("Upload cap does not fit this platform")?;

    let mut builder = ConverterConfig::builder()
        .upload_dir(&s.upload_dir)
        .output_dir(&s.output_dir)
        .max_upload_bytes(max_upload_bytes)
        .dpi(s.dpi)
        .pandoc_program(&s.pandoc)
        .java_program(&s.java);

    if let Some(dir) = &s.staging_dir {
        builder = builder.staging_dir(dir);
    }
    if let Some(lib) = &s.pdfium_lib {
        builder = builder.pdfium_library(lib);
    }
    if let Some(jar) = &s.tabula_jar {
        builder = builder.tabula_jar(jar);
    }
    if let Some(pwd) = &s.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

#[cfg(feature = "server")]
async fn serve(converter: Converter, bind: std::net::SocketAddr) -> Result<()> {
    pdfconvert::server::serve(Arc::new(converter), bind)
        .await
        .with_context(|| format!("HTTP service on {bind} failed"))
}

#[cfg(not(feature = "server"))]
async fn serve(_converter: Converter, _bind: std::net::SocketAddr) -> Result<()> {
    anyhow::bail!("this build has no HTTP service; rebuild with --features server")
}
