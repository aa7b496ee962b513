//! CLI binary for edgequake-img2pdf.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints where the artifact landed.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_img2pdf::{
    convert, decode_record_file, inspect, ArtifactFormat, ArtifactSink, ConversionConfig,
    ConversionProgressCallback, DirectorySink, NamingPolicy, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per encoded
/// image.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_conversion_start` reports the image count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Waiting for the coordinator…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} images  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Encoding");
    }

    fn elapsed_secs(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&page_num)
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Encoding {total_pages} image(s)…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total_pages: usize) {
        self.start_times
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(page_num, Instant::now());
        self.bar.set_message(format!("image {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total_pages: usize, encoded_len: usize) {
        let secs = self.elapsed_secs(page_num);
        self.bar.println(format!(
            "  {} Image {:>3}/{:<3}  {:<12}  {}",
            green("✓"),
            page_num,
            total_pages,
            dim(&format!("{encoded_len:>8} bytes")),
            dim(&format!("{secs:.2}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let secs = self.elapsed_secs(page_num);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(['\u{2026}']).collect()
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Image {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total_pages,
            red(&msg),
            dim(&format!("{secs:.2}s")),
        ));
        self.bar.inc(1);
    }

    fn on_conversion_complete(&self, total_pages: usize, success_count: usize) {
        self.bar.finish_and_clear();
        if success_count == total_pages {
            eprintln!(
                "{} {} image(s) encoded",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} image(s) encoded, conversion aborted ({} error(s))",
                red("✘"),
                bold(&success_count.to_string()),
                total_pages,
                red(&self.errors.load(Ordering::SeqCst).to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Three scans → one PDF, one page per image, in argument order
  img2pdf page1.png page2.jpg page3.png -o out/

  # Leading image → JSON record with a base64 JPEG payload
  img2pdf --format json photo.png --name receipt --description "March receipt"

  # Images from the web
  img2pdf https://example.com/a.png https://example.com/b.jpg

  # Reconstruct the image from a record
  img2pdf --decode out/convertedRecord-3f9a0c1b2d4e.json -o out/

  # Page count and page sizes of a PDF
  img2pdf --inspect-only out/convertedDocument-1c2d3e4f5a6b.pdf

  # Stable file names (overwrites the previous artifact)
  img2pdf --fixed-names scan.png -o out/

OUTPUT FILES:
  convertedDocument-<hash>.pdf   --format pdf (default)
  convertedRecord-<hash>.json    --format json
  decodedImage-<hash>.jpg        --decode
  <hash> is the first 12 hex digits of the file's SHA-256; --fixed-names drops it.

ENVIRONMENT VARIABLES:
  IMG2PDF_FORMAT            pdf | json
  IMG2PDF_OUTPUT_DIR        Output directory (default: system temp dir)
  IMG2PDF_QUALITY           JPEG quality 0.01–1.0 (default 0.8)
  IMG2PDF_NAME              Record imageName
  IMG2PDF_DESCRIPTION       Record description
  RUST_LOG                  Overrides the log filter (e.g. edgequake_img2pdf=debug)
"#;

/// Convert images to a multi-page PDF or a base64 JSON record.
#[derive(Parser, Debug)]
#[command(
    name = "img2pdf",
    version,
    about = "Convert images to a multi-page PDF or a base64 JSON record",
    long_about = "Convert an ordered set of PNG/JPEG images (local files or URLs) into a PDF \
with one page per image, each page sized to its image, or into a JSON record embedding the \
leading image as base64-encoded JPEG. Records can be decoded back into images.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Image paths or HTTP/HTTPS URLs, in page order.
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Artifact to produce.
    #[arg(long, env = "IMG2PDF_FORMAT", value_enum, default_value = "pdf")]
    format: FormatArg,

    /// Directory to write artifacts into.
    #[arg(short, long, env = "IMG2PDF_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Lossy compression quality (0.01–1.0).
    #[arg(long, env = "IMG2PDF_QUALITY", default_value_t = 0.8)]
    quality: f32,

    /// `imageName` written into JSON records.
    #[arg(long, env = "IMG2PDF_NAME")]
    name: Option<String>,

    /// `description` written into JSON records.
    #[arg(long, env = "IMG2PDF_DESCRIPTION")]
    description: Option<String>,

    /// Use fixed file names instead of content-hashed ones.
    #[arg(long, env = "IMG2PDF_FIXED_NAMES")]
    fixed_names: bool,

    /// Treat the single input as a JSON record and write its image.
    #[arg(long, conflicts_with = "inspect_only")]
    decode: bool,

    /// Print page count and page sizes of a PDF, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Print the result summary as JSON.
    #[arg(long, env = "IMG2PDF_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "IMG2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "IMG2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "IMG2PDF_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "IMG2PDF_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Pdf,
    Json,
}

impl From<FormatArg> for ArtifactFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Pdf => ArtifactFormat::Document,
            FormatArg::Json => ArtifactFormat::Record,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs unless -v asks for them.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
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

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        for input in &cli.inputs {
            let meta = inspect(input)
                .await
                .with_context(|| format!("Failed to inspect {input}"))?;

            if cli.json {
                let out = json!({ "file": input, "metadata": meta });
                println!(
                    "{}",
                    serde_json::to_string_pretty(&out).context("Failed to serialize metadata")?
                );
            } else {
                println!("File:         {}", input);
                println!("Pages:        {}", meta.page_count);
                println!("PDF Version:  {}", meta.pdf_version);
                for (i, size) in meta.page_sizes.iter().enumerate() {
                    println!(
                        "  Page {:>3}:   {} × {} pt",
                        i + 1,
                        size.width,
                        size.height
                    );
                }
            }
        }
        return Ok(());
    }

    let sink = build_sink(&cli);

    // ── Decode mode ──────────────────────────────────────────────────────
    if cli.decode {
        let [input] = cli.inputs.as_slice() else {
            anyhow::bail!("--decode takes exactly one record file");
        };
        let config = build_config(&cli, None)?;
        let (decoded, location) = decode_record_file(input, sink, &config)
            .await
            .context("Decoding failed")?;

        if cli.json {
            let out = json!({
                "imageName": decoded.record.name,
                "description": decoded.record.description,
                "width": decoded.image.width(),
                "height": decoded.image.height(),
                "bytes": decoded.compressed.len(),
                "location": location,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&out).context("Failed to serialise output")?
            );
        } else if !cli.quiet {
            eprintln!(
                "{}  '{}'  {}×{}  →  {}",
                green("✔"),
                decoded.record.name,
                decoded.image.width(),
                decoded.image.height(),
                bold(&location.display().to_string()),
            );
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run conversion ───────────────────────────────────────────────────
    let summary = convert(&cli.inputs, cli.format.into(), sink, &config)
        .await
        .context("Conversion failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&summary).context("Failed to serialise output")?;
        println!("{json}");
    } else {
        // The location goes to stdout so it can be piped.
        println!("{}", summary.location.display());
        if !cli.quiet {
            eprintln!(
                "{}  {} image(s)  {} bytes  {}ms  →  {}",
                green("✔"),
                summary.stats.image_count,
                dim(&summary.stats.artifact_bytes.to_string()),
                summary.stats.total_duration_ms,
                bold(&summary.location.display().to_string()),
            );
        }
    }

    Ok(())
}

fn build_sink(cli: &Cli) -> Arc<dyn ArtifactSink> {
    let sink = match cli.output_dir {
        Some(ref dir) => DirectorySink::new(dir),
        None => DirectorySink::temp(),
    };
    let naming = if cli.fixed_names {
        NamingPolicy::Fixed
    } else {
        NamingPolicy::ContentHash
    };
    Arc::new(sink.with_naming(naming))
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .quality(cli.quality)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref name) = cli.name {
        builder = builder.record_name(name);
    }
    if let Some(ref description) = cli.description {
        builder = builder.record_description(description);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
