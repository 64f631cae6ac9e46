//! CLI binary for drive-pdf2img.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConversionConfig`, picks a token provider and prints the new file id.

use anyhow::{Context, Result};
use clap::Parser;
use drive_pdf2img::{
    ConversionConfig, ConversionOutcome, ConversionProgressCallback, Converter, GcloudToken,
    OutputFormat, ProgressCallback, Stage, StaticToken, TokenProvider,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
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
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner that names the running stage and leaves one log line per
/// finished stage above it.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.set_message("opening folder…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_message(format!("{stage}…"));
    }

    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} {:<7} {}",
            green("✓"),
            stage,
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
    }

    fn on_not_found(&self, title: &str) {
        self.bar.finish_and_clear();
        eprintln!("{} no PDF titled {}", red("✘"), bold(title));
    }

    fn on_error(&self, stage: Stage, error: &str) {
        self.bar.finish_and_clear();
        eprintln!("  {} {:<7} {}", red("✗"), stage, red(error));
    }

    fn on_created(&self, file_id: &str, name: &str) {
        self.bar.finish_and_clear();
        eprintln!("{} {}  {}", green("✔"), bold(name), dim(file_id));
    }
}

impl CliProgressCallback {
    /// Stop the spinner so a following message is not overdrawn.
    fn clear(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # PNG preview of invoice.pdf, token from the environment
  export GOOGLE_OAUTH_TOKEN=$(gcloud auth print-access-token)
  pdf2img 1AbCdEfFolderId invoice

  # JPEG instead (only the exact value JPEG selects JPEG)
  pdf2img --format JPEG 1AbCdEfFolderId invoice

  # Let gcloud supply the token and keep a local copy
  pdf2img --gcloud -o invoice.png 1AbCdEfFolderId invoice

  # Structured output
  pdf2img --json 1AbCdEfFolderId invoice

EXIT STATUS:
  0  a new file was created; its id is printed on stdout (even when the
     --output copy could not be written, which is reported on stderr)
  1  no matching PDF, or a stage failed (details on stderr)
  2  bad arguments or the folder could not be opened

ENVIRONMENT VARIABLES:
  GOOGLE_OAUTH_TOKEN   OAuth access token with a Drive scope
  PDF2IMG_FORMAT       Default for --format
  RUST_LOG             Override log filter (e.g. drive_pdf2img=debug)
"#;

/// Render a Drive PDF's preview to PNG/JPEG and upload it back to Drive.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2img",
    version,
    about = "Render a Google Drive PDF's preview to PNG/JPEG and upload it back to Drive",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Drive id of the folder to search.
    folder_id: String,

    /// PDF title without extension (e.g. "invoice" for invoice.pdf).
    title: String,

    /// Output format: JPEG for JPEG, anything else for PNG.
    #[arg(short, long, env = "PDF2IMG_FORMAT")]
    format: Option<String>,

    /// OAuth access token.
    #[arg(long, env = "GOOGLE_OAUTH_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Obtain the token from `gcloud auth print-access-token` (wins over --token).
    #[arg(long)]
    gcloud: bool,

    /// Preview width in pixels (16–4000).
    #[arg(long, env = "PDF2IMG_WIDTH", default_value_t = 1000)]
    width: u32,

    /// JPEG quality (1–100).
    #[arg(long, env = "PDF2IMG_JPEG_QUALITY", default_value_t = 90)]
    jpeg_quality: u8,

    /// Thumbnail fetch timeout in seconds (default: none).
    #[arg(long, env = "PDF2IMG_FETCH_TIMEOUT")]
    fetch_timeout: Option<u64>,

    /// Also write the uploaded image to this local path.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the full outcome as JSON instead of just the id.
    #[arg(long)]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "PDF2IMG_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    // ── Build converter ──────────────────────────────────────────────────
    let token = token_provider(&cli)?;
    let spinner = show_progress.then(CliProgressCallback::new);
    let progress: Option<ProgressCallback> = spinner
        .clone()
        .map(|cb| cb as Arc<dyn ConversionProgressCallback>);
    let config = build_config(&cli, progress)?;
    let converter = Converter::google_drive(token, config).context("Failed to set up converter")?;
    let format = OutputFormat::from_arg(cli.format.as_deref());

    // ── Run conversion ───────────────────────────────────────────────────
    let outcome = match cli.output {
        Some(ref path) => {
            converter
                .convert_to_file(&cli.folder_id, &cli.title, format, path)
                .await
        }
        None => {
            converter
                .convert_detailed(&cli.folder_id, &cli.title, format)
                .await
        }
    };
    let outcome = match outcome {
        Ok(o) => o,
        Err(e) => {
            if let Some(cb) = &spinner {
                cb.clear();
            }
            eprintln!("{} {e}", red("error:"));
            return Ok(ExitCode::from(2));
        }
    };

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).context("Failed to serialise outcome")?
        );
    }

    match outcome {
        ConversionOutcome::Created { file, stats } => {
            if !cli.json {
                println!("{}", file.id);
            }
            if !cli.quiet && !cli.json && !show_progress {
                eprintln!(
                    "Created {} from {} in {}ms",
                    file.name, file.source_name, stats.total_duration_ms
                );
            }
            match (&cli.output, &file.local_copy_error) {
                (Some(path), Some(err)) => eprintln!(
                    "{} local copy {} not written: {}",
                    red("warning:"),
                    bold(&path.display().to_string()),
                    err
                ),
                (Some(path), None) if !cli.quiet => {
                    eprintln!("   local copy → {}", bold(&path.display().to_string()))
                }
                _ => {}
            }
            Ok(ExitCode::SUCCESS)
        }
        ConversionOutcome::NotFound | ConversionOutcome::Failed(_) => Ok(ExitCode::from(1)),
    }
}

/// Pick the token source from flags.
fn token_provider(cli: &Cli) -> Result<Arc<dyn TokenProvider>> {
    if cli.gcloud {
        return Ok(Arc::new(GcloudToken::new()));
    }
    match cli.token {
        Some(ref t) if !t.trim().is_empty() => Ok(Arc::new(StaticToken::new(t.clone()))),
        _ => anyhow::bail!(
            "No access token: pass --token, set GOOGLE_OAUTH_TOKEN, or use --gcloud"
        ),
    }
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .thumbnail_width(cli.width)
        .jpeg_quality(cli.jpeg_quality);

    if let Some(secs) = cli.fetch_timeout {
        builder = builder.fetch_timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
