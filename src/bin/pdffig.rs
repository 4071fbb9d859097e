//! CLI binary for edgequake-pdffig.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_pdffig::{
    derive_prefix, extract_all, extract_annotated, DocumentBackend, ExtractionConfig,
    ExtractionItem, ExtractionManifest, ExtractionProgressCallback, ItemStatus, PdfiumBackend,
    ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
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
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
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

/// Terminal progress callback: a progress bar over pages (scan) or
/// directives (annotate) plus one log line per item.
struct CliProgressCallback {
    bar: ProgressBar,
    /// "pages" or "directives", shown next to the counter.
    unit: &'static str,
}

impl CliProgressCallback {
    /// Spinner until `on_extraction_start` tells us the total.
    fn new(unit: &'static str) -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar, unit })
    }

    fn activate_bar(&self, total: usize) {
        let template = format!(
            "{{spinner:.cyan}} {{prefix:.bold}}  \
             [{{bar:42.green/238}}] {{pos:>3}}/{{len}} {}  \
             ⏱ {{elapsed_precise}}",
            self.unit
        );
        let progress_style = ProgressStyle::with_template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Extracting");
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_units: usize) {
        self.activate_bar(total_units);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Processing {total_units} {}…", self.unit))
        ));
    }

    fn on_unit_start(&self, unit: usize, total_units: usize) {
        self.bar.set_message(format!("{unit}/{total_units}"));
    }

    fn on_item_extracted(&self, item: &ExtractionItem) {
        let note = if item.reused_existing {
            "kept"
        } else {
            "saved"
        };
        self.bar.println(format!(
            "  {} {:<12} p.{:<4} {}  {}",
            green("✓"),
            item.label(),
            item.page_number(),
            item.output_filename,
            dim(note),
        ));
    }

    fn on_item_failed(&self, item: &ExtractionItem) {
        let reason = item
            .error
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_else(|| format!("{:?}", item.status));
        self.bar.println(format!(
            "  {} {:<12} p.{:<4} {}",
            red("✗"),
            item.label(),
            item.page_number(),
            red(&reason),
        ));
    }

    fn on_unit_complete(&self, _unit: usize, _total_units: usize) {
        self.bar.inc(1);
    }

    fn on_extraction_complete(&self, extracted: usize, failed: usize) {
        self.bar.finish_and_clear();
        if failed == 0 {
            eprintln!(
                "{} {} item(s) extracted",
                green("✔"),
                bold(&extracted.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} item(s) extracted  ({} failed)",
                if extracted == 0 { red("✘") } else { yellow("⚠") },
                bold(&extracted.to_string()),
                extracted + failed,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract every captioned figure and table into ./images
  pdffig scan paper.pdf

  # Custom output directory and file prefix
  pdffig scan paper.pdf -o figs --prefix T5

  # Fulfil the 【配图建议】 directives in an article draft (rewrites it in place)
  pdffig annotate t5.pdf T5论文_解读.md

  # Keep the draft untouched and write the result elsewhere
  pdffig annotate t5.pdf draft.md --output-markdown final.md

  # Machine-readable manifest
  pdffig --json scan paper.pdf > manifest.json

DIRECTIVE FORMAT:
  **【配图建议：第3页，Figure 1 - 展示T5的text-to-text统一框架】**
  is replaced by
  ![展示T5的text-to-text统一框架](images/T5_figure1.png)

  *展示T5的text-to-text统一框架*

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Directory containing libpdfium (or the library file)
  RUST_LOG                Override the log filter (e.g. edgequake_pdffig=debug)

Images that already exist are kept, so an interrupted run can simply be
repeated. Use --overwrite to re-render them.
"#;

/// Extract figures and tables from PDF papers as PNG images.
#[derive(Parser, Debug)]
#[command(
    name = "pdffig",
    version,
    about = "Extract figures and tables from PDF papers as PNG images",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Re-render images that already exist.
    #[arg(long, global = true, env = "PDFFIG_OVERWRITE")]
    overwrite: bool,

    /// Rasterisation scale in pixels per PDF point.
    #[arg(long, global = true, env = "PDFFIG_SCALE", default_value_t = 2.0)]
    scale: f32,

    /// Print the extraction manifest as JSON on stdout.
    #[arg(long, global = true, env = "PDFFIG_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "PDFFIG_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDFFIG_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDFFIG_QUIET")]
    quiet: bool,

    /// Directory containing libpdfium (tried before the system library).
    #[arg(long, global = true, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract every captioned figure and table in a PDF.
    Scan {
        /// PDF file.
        pdf: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Extract what an article draft asks for and embed the images in it.
    Annotate {
        /// PDF file.
        pdf: PathBuf,

        /// Markdown draft containing 【配图建议】 directives.
        markdown: PathBuf,

        #[command(flatten)]
        output: OutputArgs,

        /// Write the rewritten markdown here instead of in place.
        #[arg(long)]
        output_markdown: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Directory for the PNG files.
    #[arg(short = 'o', long, default_value = "images")]
    output_dir: PathBuf,

    /// File-name prefix. `annotate` derives one from the markdown file name
    /// when omitted.
    #[arg(long)]
    prefix: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
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

    match &cli.command {
        Command::Scan { pdf, output } => {
            let progress = show_progress.then(|| CliProgressCallback::new("pages"));
            let prefix = output.prefix.clone().unwrap_or_default();
            let config = build_config(&cli, output, prefix, progress, None)?;

            let manifest = extract_all(pdf, &config)
                .await
                .with_context(|| format!("Failed to extract from {}", pdf.display()))?;

            if cli.json {
                print_json(&manifest)?;
            } else if !cli.quiet {
                print_summary(&manifest, show_progress);
                if let Some(ref list) = manifest.reference_list {
                    eprintln!("   reference list → {}", bold(&list.display().to_string()));
                }
            }
        }
        Command::Annotate {
            pdf,
            markdown,
            output,
            output_markdown,
        } => {
            let progress = show_progress.then(|| CliProgressCallback::new("directives"));
            let prefix = output
                .prefix
                .clone()
                .unwrap_or_else(|| derive_prefix(markdown));
            let config = build_config(&cli, output, prefix, progress, output_markdown.clone())?;

            let out = extract_annotated(pdf, markdown, &config)
                .await
                .with_context(|| format!("Failed to annotate {}", markdown.display()))?;

            if cli.json {
                print_json(&out)?;
            } else if !cli.quiet {
                print_summary(&out.manifest, show_progress);
                eprintln!(
                    "   {} directive(s) replaced → {}",
                    out.embeds.len(),
                    bold(&out.markdown_path.display().to_string())
                );
            }
        }
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(
    cli: &Cli,
    output: &OutputArgs,
    prefix: String,
    progress: Option<Arc<CliProgressCallback>>,
    output_markdown: Option<PathBuf>,
) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .output_dir(&output.output_dir)
        .prefix(prefix)
        .scale(cli.scale)
        .overwrite(cli.overwrite);

    if let Some(ref lib) = cli.pdfium_lib {
        let backends: Vec<Arc<dyn DocumentBackend>> = vec![
            Arc::new(PdfiumBackend::from_path(lib)),
            Arc::new(PdfiumBackend::system()),
        ];
        builder = builder.backends(backends);
    }
    if let Some(path) = output_markdown {
        builder = builder.output_markdown(path);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb as ProgressCallback);
    }

    builder.build().context("Invalid configuration")
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialise manifest")?;
    println!("{json}");
    Ok(())
}

/// Summary line; per-item lines only when the progress bar didn't print them.
fn print_summary(manifest: &ExtractionManifest, show_progress: bool) {
    let stats = &manifest.stats;
    if !show_progress {
        for item in &manifest.items {
            match item.status {
                ItemStatus::Success => eprintln!(
                    "  {} {} (page {}) → {}",
                    green("✓"),
                    item.label(),
                    item.page_number(),
                    item.output_filename
                ),
                _ => eprintln!(
                    "  {} {} (page {}): {:?}",
                    red("✗"),
                    item.label(),
                    item.page_number(),
                    item.status
                ),
            }
        }
    }
    eprintln!(
        "{}  {}/{} items  ({} rendered, {} kept)  {}ms  →  {}",
        if stats.failed() == 0 {
            green("✔")
        } else {
            cyan("⚠")
        },
        stats.succeeded(),
        stats.total_items,
        stats.rendered,
        stats.reused,
        stats.total_duration_ms,
        bold(&manifest.output_dir.display().to_string()),
    );
}
