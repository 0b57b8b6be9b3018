//! CLI binary for paper2epub.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` / `RecognizerConfig` and prints a summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use paper2epub::{
    ConversionConfig, ConversionProgressCallback, ConversionResult, ConversionStage, Converter,
    ImageFormat, PageSelection, ProgressCallback, RecognizerConfig,
};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar plus one log line per page. Pages may finish out of
/// order when `--concurrency` is above 1.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn page_elapsed(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&page_num))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Recognizing");
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {total_pages} pages…"))
        ));
    }

    fn on_stage(&self, stage: ConversionStage) {
        match stage {
            ConversionStage::FiguresExtracting => self.bar.set_prefix("Figures"),
            ConversionStage::Packaging => self.bar.set_prefix("Packaging"),
            _ => {}
        }
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(page_num, Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, text_len: usize) {
        let secs = self.page_elapsed(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{text_len:>5} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let secs = self.page_elapsed(page_num);
        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(std::iter::once('…')).collect()
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_figures_extracted(&self, count: usize) {
        self.bar.println(format!("  {} {} figures extracted", cyan("▣"), count));
    }

    fn on_conversion_complete(&self, _total_pages: usize, _success_count: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert next to the input (paper.epub)
  paper2epub paper.pdf

  # Explicit output, title and author
  paper2epub paper.pdf -o books/attention.epub -t "Attention Is All You Need" -a "Vaswani et al."

  # Keep the intermediate Markdown and use JPEG figures
  paper2epub --save-markdown --figure-format jpeg --jpeg-quality 85 paper.pdf

  # Text only, first ten pages, four pages in flight
  paper2epub --no-figures --pages 1-10 --concurrency 4 paper.pdf

  # Machine-readable summary
  paper2epub --json paper.pdf > report.json

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Directory containing libpdfium
  RUST_LOG                Log filter, e.g. paper2epub=debug
"#;

/// Convert academic PDFs to EPUB with LaTeX math and extracted figures.
#[derive(Parser, Debug)]
#[command(
    name = "paper2epub",
    version,
    about = "Convert academic PDFs to EPUB with LaTeX math and extracted figures",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF file to convert.
    input: PathBuf,

    /// Output EPUB path. Default: the input with an .epub extension.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Book title. Default: PDF metadata or the file name.
    #[arg(short, long)]
    title: Option<String>,

    /// Book author. Default: PDF metadata, the file name, or "Unknown".
    #[arg(short, long)]
    author: Option<String>,

    /// Language code written into the book.
    #[arg(short, long, default_value = "en")]
    language: String,

    /// Vision model provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Vision model ID. Default: gpt-4.1-nano.
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// Pages recognized at the same time.
    #[arg(short, long, env = "PAPER2EPUB_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Rendering DPI (72–400).
    #[arg(long, env = "PAPER2EPUB_DPI", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, default_value = "all")]
    pages: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PAPER2EPUB_PASSWORD")]
    password: Option<String>,

    /// Per-page recognition timeout in seconds.
    #[arg(long, default_value_t = 120)]
    page_timeout: u64,

    /// Retries per page on recognition failure.
    #[arg(long, default_value_t = 3)]
    max_retries: u32,

    /// Text file with a custom system prompt.
    #[arg(long)]
    system_prompt: Option<PathBuf>,

    /// Also write the Markdown next to the input.
    #[arg(long)]
    save_markdown: bool,

    /// Skip figure extraction.
    #[arg(long)]
    no_figures: bool,

    /// Minimum figure width and height in pixels.
    #[arg(long, default_value_t = 100)]
    figure_min_size: u32,

    /// Encoding of extracted figures.
    #[arg(long, value_enum, default_value = "png")]
    figure_format: FigureFormatArg,

    /// JPEG quality (1–100) when --figure-format is jpeg.
    #[arg(long, default_value_t = 95,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Prefix for figure paths inside the book.
    #[arg(long, default_value = "images/")]
    image_prefix: String,

    /// Print a JSON report instead of the summary.
    #[arg(long)]
    json: bool,

    /// Disable the progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Print PDF metadata only, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FigureFormatArg {
    Png,
    Jpeg,
}

impl From<FigureFormatArg> for ImageFormat {
    fn from(v: FigureFormatArg) -> Self {
        match v {
            FigureFormatArg::Png => ImageFormat::Png,
            FigureFormatArg::Jpeg => ImageFormat::Jpeg,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Ctrl-C: finish the pages in flight, skip the rest ────────────────
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.store(true, Ordering::SeqCst);
                eprintln!("\n{} Cancelling; remaining pages will be skipped", cyan("⚠"));
            }
        });
    }

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb, Arc::clone(&cancel))?;
    let recognizer = build_recognizer_config(&cli).await?;
    let converter = Converter::pdfium(recognizer, config);

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = converter
            .inspect(&cli.input)
            .await
            .context("Failed to inspect PDF")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:    {}", cli.input.display());
            if let Some(ref t) = meta.title {
                println!("Title:   {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:  {}", a);
            }
            println!("Pages:   {}", meta.page_count);
        }
        return Ok(());
    }

    // ── Run conversion ───────────────────────────────────────────────────
    let result = converter
        .convert(&cli.input, cli.output.as_deref())
        .await
        .with_context(|| format!("Conversion of {} failed", cli.input.display()))?;

    if cli.json {
        let json = serde_json::to_string_pretty(&result).context("Failed to serialise result")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&result);
    }

    Ok(())
}

fn print_summary(result: &ConversionResult) {
    let stats = &result.stats;
    let size = std::fs::metadata(&result.output_path)
        .map(|m| format_file_size(m.len()))
        .unwrap_or_else(|_| "?".to_string());
    let attempted = stats.processed_pages + stats.failed_pages;

    eprintln!(
        "{}  {}/{} pages  {} figures  {}ms  →  {} ({})",
        if stats.failed_pages == 0 {
            green("✔")
        } else {
            cyan("⚠")
        },
        stats.processed_pages,
        attempted,
        stats.figures,
        stats.total_duration_ms,
        bold(&result.output_path.display().to_string()),
        size,
    );
    if let Some(ref md) = result.markdown_path {
        eprintln!("   Markdown: {}", md.display());
    }
    for (page, reason) in result.failure_summary() {
        eprintln!("   {} page {}: {}", red("✗"), page, dim(&reason));
    }
    if stats.skipped_figures > 0 {
        eprintln!(
            "   {} embedded images could not be decoded",
            stats.skipped_figures
        );
    }
}

/// Map CLI args to `ConversionConfig`.
fn build_config(
    cli: &Cli,
    progress: Option<ProgressCallback>,
    cancel: Arc<AtomicBool>,
) -> Result<ConversionConfig> {
    let pages: PageSelection = cli.pages.parse().context("Invalid --pages")?;

    let mut builder = ConversionConfig::builder()
        .dpi(cli.dpi)
        .concurrency(cli.concurrency)
        .pages(pages)
        .page_timeout_secs(cli.page_timeout)
        .extract_figures(!cli.no_figures)
        .figure_min_size(cli.figure_min_size)
        .figure_format(cli.figure_format.into())
        .jpeg_quality(cli.jpeg_quality)
        .image_path_prefix(cli.image_prefix.clone())
        .language(cli.language.clone())
        .save_markdown(cli.save_markdown)
        .cancel_flag(cancel);

    if let Some(ref t) = cli.title {
        builder = builder.title(t.clone());
    }
    if let Some(ref a) = cli.author {
        builder = builder.author(a.clone());
    }
    if let Some(ref p) = cli.password {
        builder = builder.password(p.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Map CLI args to `RecognizerConfig`.
async fn build_recognizer_config(cli: &Cli) -> Result<RecognizerConfig> {
    let system_prompt = match cli.system_prompt {
        Some(ref path) => Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read system prompt from {:?}", path))?,
        ),
        None => None,
    };

    Ok(RecognizerConfig {
        provider_name: cli.provider.clone(),
        model: cli.model.clone(),
        max_retries: cli.max_retries,
        system_prompt,
        ..RecognizerConfig::default()
    })
}

/// Human-readable size: `500.0 B`, `1.5 MB`.
fn format_file_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{size:.1} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.1} TB")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_sizes() {
        assert_eq!(format_file_size(500), "500.0 B");
        assert_eq!(format_file_size(1024), "1.0 KB");
        assert_eq!(format_file_size(1536 * 1024), "1.5 MB");
        assert_eq!(format_file_size(2 * 1024 * 1024 * 1024 * 1024), "2.0 TB");
    }

    #[test]
    fn cli_maps_to_config() {
        let cli = Cli::parse_from([
            "paper2epub",
            "paper.pdf",
            "--no-figures",
            "--figure-format",
            "jpeg",
            "--pages",
            "2-4",
            "-t",
            "A Title",
        ]);
        let config = build_config(&cli, None, Arc::new(AtomicBool::new(false))).unwrap();
        assert!(!config.extract_figures);
        assert_eq!(config.figures.format, ImageFormat::Jpeg);
        assert_eq!(config.pages, PageSelection::Range(2, 4));
        assert_eq!(config.title.as_deref(), Some("A Title"));
        assert_eq!(config.language, "en");
    }
}
