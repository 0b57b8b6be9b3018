//! The conversion orchestrator.
//!
//! [`Converter`] drives one document through
//!
//! ```text
//! Init → TextExtracting → FiguresExtracting → Binding → Packaging → Done
//! ```
//!
//! and owns failure isolation: a page that fails is recorded and skipped,
//! a figure scan that fails is downgraded to "no figures", and only a bad
//! input, a document with no recognized text, or a packaging failure ends
//! the run with an error.
//!
//! The three collaborators sit behind traits so the state machine can be
//! driven without pdfium or a model:
//!
//! * [`DocumentBackend`] renders pages and scans figures,
//! * [`PageRecognizer`] turns one page image into text,
//! * [`Packager`] writes the book.

use crate::config::{ConversionConfig, PageSelection};
use crate::error::{PageError, Paper2EpubError, RecognitionError};
use crate::output::{
    ConversionResult, ConversionStage, ConversionStats, DocumentMetadata,
};
use crate::package::{EpubPackager, PackageRequest, Packager};
use crate::pipeline::backend::{DocumentBackend, PdfiumBackend};
use crate::pipeline::recognize::{PageRecognizer, RecognizerConfig, VisionRecognizer};
use crate::pipeline::render::{RenderSettings, RenderedPage};
use crate::pipeline::{binder, input, postprocess, references};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Author written into the book when nothing better is known.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Sequences the conversion of a PDF into an EPUB.
///
/// A `Converter` holds no per-document state and can convert any number of
/// documents, one after another or concurrently.
///
/// # Example
/// ```rust,no_run
/// use paper2epub::{ConversionConfig, Converter, RecognizerConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let converter = Converter::pdfium(RecognizerConfig::default(), ConversionConfig::default());
/// let result = converter.convert("paper.pdf", None).await?;
/// println!("{} ({} figures)", result.output_path.display(), result.stats.figures);
/// # Ok(())
/// # }
/// ```
pub struct Converter {
    backend: Arc<dyn DocumentBackend>,
    recognizer: Arc<dyn PageRecognizer>,
    packager: Arc<dyn Packager>,
    config: ConversionConfig,
}

impl Converter {
    pub fn new(
        backend: Arc<dyn DocumentBackend>,
        recognizer: Arc<dyn PageRecognizer>,
        packager: Arc<dyn Packager>,
        config: ConversionConfig,
    ) -> Self {
        Self {
            backend,
            recognizer,
            packager,
            config,
        }
    }

    /// pdfium rendering, a vision model for recognition, EPUB output.
    pub fn pdfium(recognizer: RecognizerConfig, config: ConversionConfig) -> Self {
        Self::new(
            Arc::new(PdfiumBackend::new()),
            Arc::new(VisionRecognizer::new(recognizer)),
            Arc::new(EpubPackager::new()),
            config,
        )
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Convert `input` and write the book to `output`, or next to the input
    /// as `<stem>.epub` when `output` is None.
    ///
    /// # Errors
    /// Only fatal failures are errors:
    /// - the input is missing or not a PDF
    /// - the page selection matches no page
    /// - no page yielded text
    /// - packaging failed
    ///
    /// Per-page and per-figure failures are reported in the result.
    pub async fn convert(
        &self,
        input: impl AsRef<Path>,
        output: Option<&Path>,
    ) -> Result<ConversionResult, Paper2EpubError> {
        let total_start = Instant::now();
        let cfg = &self.config;

        // ── Init ─────────────────────────────────────────────────────────
        self.enter(ConversionStage::Init);
        let pdf_path = input::validate_input(input.as_ref())?;
        let output_path = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| input::default_output_path(&pdf_path));
        info!("Starting conversion: {}", pdf_path.display());

        let metadata = self
            .backend
            .inspect(&pdf_path, cfg.password.as_deref())
            .await?;
        let total_pages = metadata.page_count;
        info!("PDF has {} pages", total_pages);

        let page_indices = cfg.pages.to_indices(total_pages);
        if page_indices.is_empty() {
            return Err(Paper2EpubError::PageOutOfRange {
                page: requested_page(&cfg.pages),
                total: total_pages,
            });
        }
        debug!("Selected {} pages for conversion", page_indices.len());
        if let Some(ref cb) = cfg.progress_callback {
            cb.on_conversion_start(page_indices.len());
        }

        // ── TextExtracting ───────────────────────────────────────────────
        self.enter(ConversionStage::TextExtracting);
        let extraction = self.extract_text(&pdf_path, &page_indices).await;
        // The model is not needed past this point.
        self.recognizer.release().await;
        let extraction = extraction?;

        let processed = extraction.pages.len();
        if processed == 0 {
            if let Some((provider, hint)) = extraction.unavailable {
                return Err(Paper2EpubError::RecognizerUnavailable { provider, hint });
            }
            let first_error = extraction
                .failures
                .first()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(Paper2EpubError::NoContentExtracted {
                total: page_indices.len(),
                first_error,
            });
        }
        let text = extraction
            .pages
            .iter()
            .map(|(_, t)| t.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        // ── FiguresExtracting ────────────────────────────────────────────
        let scan = if cfg.extract_figures {
            self.enter(ConversionStage::FiguresExtracting);
            match self
                .backend
                .scan_figures(&pdf_path, cfg.password.as_deref(), &cfg.figures, &cfg.pages)
                .await
            {
                Ok(scan) => Some(scan),
                Err(e) => {
                    warn!("Figure extraction failed, continuing without figures: {}", e);
                    None
                }
            }
        } else {
            None
        };
        let (assets, asset_skips) = scan
            .map(|s| (s.assets, s.skipped))
            .unwrap_or_default();
        if let Some(ref cb) = cfg.progress_callback {
            cb.on_figures_extracted(assets.len());
        }

        let figure_references = references::find_references(&text);
        debug!(
            "Found {} figure citations, {} figures extracted",
            figure_references.len(),
            assets.len()
        );

        // ── Binding ──────────────────────────────────────────────────────
        let (body_text, named_assets) = if cfg.extract_figures {
            self.enter(ConversionStage::Binding);
            binder::bind(&text, assets, &cfg.image_path_prefix)
        } else {
            (text, Vec::new())
        };

        let markdown_path = if cfg.save_markdown {
            save_markdown(&pdf_path, &body_text).await
        } else {
            None
        };

        // ── Packaging ────────────────────────────────────────────────────
        self.enter(ConversionStage::Packaging);
        let (title, author) = resolve_title_author(cfg, &metadata, &pdf_path);
        let request = PackageRequest {
            body_text: &body_text,
            assets: &named_assets,
            title: &title,
            author: &author,
            language: &cfg.language,
            image_path_prefix: &cfg.image_path_prefix,
        };
        let output_path = self.packager.package(&request, &output_path)?;

        // ── Done ─────────────────────────────────────────────────────────
        self.enter(ConversionStage::Done);
        let stats = ConversionStats {
            total_pages,
            processed_pages: processed,
            failed_pages: extraction.failures.len(),
            figures: named_assets.len(),
            skipped_figures: asset_skips.len(),
            render_duration_ms: extraction.render_duration_ms,
            recognition_duration_ms: extraction.recognition_duration_ms,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };
        info!(
            "Conversion complete: {}/{} pages, {} figures, {}ms total",
            processed,
            page_indices.len(),
            stats.figures,
            stats.total_duration_ms
        );
        if let Some(ref cb) = cfg.progress_callback {
            cb.on_conversion_complete(page_indices.len(), processed);
        }

        Ok(ConversionResult {
            body_text,
            assets: named_assets,
            page_failures: extraction.failures,
            asset_skips,
            figure_references,
            metadata,
            stats,
            output_path,
            markdown_path,
        })
    }

    /// Synchronous wrapper around [`Converter::convert`].
    ///
    /// Creates a temporary tokio runtime internally.
    pub fn convert_sync(
        &self,
        input: impl AsRef<Path>,
        output: Option<&Path>,
    ) -> Result<ConversionResult, Paper2EpubError> {
        tokio::runtime::Runtime::new()
            .map_err(|e| Paper2EpubError::Internal(format!("Failed to create tokio runtime: {}", e)))?
            .block_on(self.convert(input, output))
    }

    /// Validate `input` and read its metadata without converting anything.
    ///
    /// Does not touch the recognizer.
    pub async fn inspect(&self, input: impl AsRef<Path>) -> Result<DocumentMetadata, Paper2EpubError> {
        let pdf_path = input::validate_input(input.as_ref())?;
        self.backend
            .inspect(&pdf_path, self.config.password.as_deref())
            .await
    }

    fn enter(&self, stage: ConversionStage) {
        debug!("Entering stage: {}", stage);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_stage(stage);
        }
    }

    fn is_cancelled(&self) -> bool {
        self.config
            .cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Render the selected pages and recognize them, at most
    /// `concurrency` at a time. The returned pages are in page order.
    async fn extract_text(
        &self,
        pdf_path: &Path,
        page_indices: &[usize],
    ) -> Result<TextExtraction, Paper2EpubError> {
        let cfg = &self.config;
        let settings = RenderSettings {
            dpi: cfg.dpi,
            max_rendered_pixels: cfg.max_rendered_pixels,
            password: cfg.password.clone(),
        };

        let render_start = Instant::now();
        let rendered = self
            .backend
            .render_pages(pdf_path, &settings, page_indices)
            .await?;
        let render_duration_ms = render_start.elapsed().as_millis() as u64;
        info!("Rendered {} pages in {}ms", rendered.len(), render_duration_ms);

        let total = page_indices.len();
        let unavailable: Mutex<Option<(String, String)>> = Mutex::new(None);
        let recognition_start = Instant::now();
        let mut outcomes: Vec<(usize, Result<String, PageError>)> = stream::iter(
            rendered
                .into_iter()
                .map(|page| self.recognize_page(page, total, &unavailable)),
        )
        .buffer_unordered(cfg.concurrency.max(1))
        .collect()
        .await;
        let recognition_duration_ms = recognition_start.elapsed().as_millis() as u64;

        // Completion order is arbitrary; the text must follow page order.
        outcomes.sort_by_key(|(page_num, _)| *page_num);

        let mut pages = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for (page_num, outcome) in outcomes {
            match outcome {
                Ok(text) => pages.push((page_num, text)),
                Err(e) => failures.push(e),
            }
        }

        Ok(TextExtraction {
            pages,
            failures,
            unavailable: unavailable.into_inner().unwrap_or_else(|p| p.into_inner()),
            render_duration_ms,
            recognition_duration_ms,
        })
    }

    async fn recognize_page(
        &self,
        page: RenderedPage,
        total: usize,
        unavailable: &Mutex<Option<(String, String)>>,
    ) -> (usize, Result<String, PageError>) {
        let page_num = page.page_num;
        let cfg = &self.config;

        let result = if self.is_cancelled() {
            Err(PageError::Cancelled { page: page_num })
        } else {
            match page.image {
                Err(e) => Err(e),
                Ok(image) => {
                    if let Some(ref cb) = cfg.progress_callback {
                        cb.on_page_start(page_num, total);
                    }
                    let limit = Duration::from_secs(cfg.page_timeout_secs);
                    match tokio::time::timeout(limit, self.recognizer.recognize(page_num, &image))
                        .await
                    {
                        Err(_) => Err(PageError::Timeout {
                            page: page_num,
                            secs: cfg.page_timeout_secs,
                        }),
                        Ok(Err(e)) => {
                            if let RecognitionError::Unavailable { provider, hint } = &e {
                                if let Ok(mut slot) = unavailable.lock() {
                                    slot.get_or_insert_with(|| (provider.clone(), hint.clone()));
                                }
                            }
                            Err(PageError::RecognitionFailed {
                                page: page_num,
                                detail: e.to_string(),
                            })
                        }
                        Ok(Ok(raw)) => {
                            let text = postprocess::clean_page(&raw);
                            if text.is_empty() {
                                Err(PageError::EmptyOutput { page: page_num })
                            } else {
                                Ok(text)
                            }
                        }
                    }
                }
            }
        };

        match &result {
            Ok(text) => {
                debug!("Page {}: {} chars", page_num, text.len());
                if let Some(ref cb) = cfg.progress_callback {
                    cb.on_page_complete(page_num, total, text.len());
                }
            }
            Err(e) => {
                warn!("{}", e);
                if let Some(ref cb) = cfg.progress_callback {
                    cb.on_page_error(page_num, total, &e.to_string());
                }
            }
        }
        (page_num, result)
    }
}

struct TextExtraction {
    /// `(page_num, cleaned text)` in page order.
    pages: Vec<(usize, String)>,
    failures: Vec<PageError>,
    /// Set when the recognizer reported itself unavailable.
    unavailable: Option<(String, String)>,
    render_duration_ms: u64,
    recognition_duration_ms: u64,
}

/// The first page the caller asked for, for out-of-range errors.
fn requested_page(selection: &PageSelection) -> usize {
    match selection {
        PageSelection::All => 0,
        PageSelection::Single(p) => *p,
        PageSelection::Range(start, _) => *start,
        PageSelection::Set(pages) => pages.iter().copied().min().unwrap_or(0),
    }
}

/// Write the bound Markdown next to the input. Failure only warns.
async fn save_markdown(pdf_path: &Path, markdown: &str) -> Option<PathBuf> {
    let path = input::markdown_path(pdf_path);
    match tokio::fs::write(&path, markdown).await {
        Ok(()) => {
            info!("Saved markdown: {}", path.display());
            Some(path)
        }
        Err(e) => {
            warn!("Could not save markdown to {}: {}", path.display(), e);
            None
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Book title and author.
///
/// Title: configured, then the PDF's Title tag, then the file name.
/// Author: configured, then the PDF's Author tag, then an `"Author - Title"`
/// file name, then [`UNKNOWN_AUTHOR`].
pub(crate) fn resolve_title_author(
    config: &ConversionConfig,
    metadata: &DocumentMetadata,
    pdf_path: &Path,
) -> (String, String) {
    let from_name = input::metadata_from_filename(pdf_path);

    let title = non_empty(config.title.as_deref())
        .or_else(|| non_empty(metadata.title.as_deref()))
        .unwrap_or(from_name.title);
    let author = non_empty(config.author.as_deref())
        .or_else(|| non_empty(metadata.author.as_deref()))
        .or(from_name.author)
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());
    (title, author)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(title: Option<&str>, author: Option<&str>) -> DocumentMetadata {
        DocumentMetadata {
            title: title.map(str::to_string),
            author: author.map(str::to_string),
            page_count: 1,
        }
    }

    #[test]
    fn configured_title_and_author_win() {
        let config = ConversionConfig::builder()
            .title("Configured")
            .author("Someone")
            .build()
            .unwrap();
        let (title, author) = resolve_title_author(
            &config,
            &meta(Some("From PDF"), Some("PDF Author")),
            Path::new("Smith - Paper.pdf"),
        );
        assert_eq!(title, "Configured");
        assert_eq!(author, "Someone");
    }

    #[test]
    fn pdf_metadata_beats_file_name() {
        let (title, author) = resolve_title_author(
            &ConversionConfig::default(),
            &meta(Some("Attention Is All You Need"), Some("Vaswani et al.")),
            Path::new("1706.03762.pdf"),
        );
        assert_eq!(title, "Attention Is All You Need");
        assert_eq!(author, "Vaswani et al.");
    }

    #[test]
    fn blank_metadata_falls_back_to_file_name() {
        let (title, author) = resolve_title_author(
            &ConversionConfig::default(),
            &meta(Some("   "), None),
            Path::new("/papers/Turing - Computing Machinery.pdf"),
        );
        assert_eq!(title, "Computing Machinery");
        assert_eq!(author, "Turing");
    }

    #[test]
    fn stem_and_unknown_author_as_last_resort() {
        let (title, author) = resolve_title_author(
            &ConversionConfig::default(),
            &DocumentMetadata::default(),
            Path::new("paper.pdf"),
        );
        assert_eq!(title, "paper");
        assert_eq!(author, UNKNOWN_AUTHOR);
    }

    #[test]
    fn requested_page_for_errors() {
        assert_eq!(requested_page(&PageSelection::All), 0);
        assert_eq!(requested_page(&PageSelection::Single(9)), 9);
        assert_eq!(requested_page(&PageSelection::Range(4, 8)), 4);
        assert_eq!(requested_page(&PageSelection::Set(vec![7, 3])), 3);
    }
}
