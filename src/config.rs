//! Configuration types for PDF-to-EPUB conversion.
//!
//! All orchestrator behaviour is controlled through [`ConversionConfig`],
//! built via its [`ConversionConfigBuilder`]. The recognition model has its
//! own [`crate::pipeline::recognize::RecognizerConfig`] because it is handed
//! to the recognizer's constructor, not to the orchestrator.

use crate::error::Paper2EpubError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Configuration for a PDF-to-EPUB conversion.
///
/// # Example
/// ```rust
/// use paper2epub::{ConversionConfig, ImageFormat};
///
/// let config = ConversionConfig::builder()
///     .title("Attention Is All You Need")
///     .figure_format(ImageFormat::Jpeg)
///     .figure_min_size(150)
///     .build()
///     .unwrap();
/// assert_eq!(config.figures.min_width, 150);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Rendering DPI used when rasterising each page. Range: 72–400. Default: 150.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 2000.
    ///
    /// Caps the longest edge regardless of the physical page size so a
    /// poster-sized page cannot exhaust memory.
    pub max_rendered_pixels: u32,

    /// Number of pages recognized at once. Default: 1.
    ///
    /// Bound this by the recognizer's batching capacity. Output order does
    /// not depend on it.
    pub concurrency: usize,

    /// Per-page recognition timeout in seconds. Default: 120.
    pub page_timeout_secs: u64,

    /// Run the figure-extraction pass. Default: true.
    pub extract_figures: bool,

    /// Size filter and output encoding for extracted figures.
    pub figures: FigureOptions,

    /// Prefix used when the figures section references asset files. Default: `"images/"`.
    pub image_path_prefix: String,

    /// Book title. If None, taken from the PDF metadata or the file name.
    pub title: Option<String>,

    /// Book author. If None, taken from the PDF metadata or the file name.
    pub author: Option<String>,

    /// Language code written into the book. Default: `"en"`.
    pub language: String,

    /// Persist the final Markdown next to the input as `<stem>.md`. Default: false.
    pub save_markdown: bool,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Page selection. Default: all pages.
    pub pages: PageSelection,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,

    /// Coarse cancellation: once set, pages not yet dispatched are skipped.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            dpi: 150,
            max_rendered_pixels: 2000,
            concurrency: 1,
            page_timeout_secs: 120,
            extract_figures: true,
            figures: FigureOptions::default(),
            image_path_prefix: "images/".to_string(),
            title: None,
            author: None,
            language: "en".to_string(),
            save_markdown: false,
            password: None,
            pages: PageSelection::default(),
            progress_callback: None,
            cancel: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("concurrency", &self.concurrency)
            .field("page_timeout_secs", &self.page_timeout_secs)
            .field("extract_figures", &self.extract_figures)
            .field("figures", &self.figures)
            .field("image_path_prefix", &self.image_path_prefix)
            .field("title", &self.title)
            .field("author", &self.author)
            .field("language", &self.language)
            .field("save_markdown", &self.save_markdown)
            .field("pages", &self.pages)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn page_timeout_secs(mut self, secs: u64) -> Self {
        self.config.page_timeout_secs = secs;
        self
    }

    pub fn extract_figures(mut self, v: bool) -> Self {
        self.config.extract_figures = v;
        self
    }

    /// Set both the minimum width and height of an extracted figure.
    pub fn figure_min_size(mut self, px: u32) -> Self {
        self.config.figures.min_width = px;
        self.config.figures.min_height = px;
        self
    }

    pub fn figure_min_width(mut self, px: u32) -> Self {
        self.config.figures.min_width = px;
        self
    }

    pub fn figure_min_height(mut self, px: u32) -> Self {
        self.config.figures.min_height = px;
        self
    }

    pub fn figure_format(mut self, format: ImageFormat) -> Self {
        self.config.figures.format = format;
        self
    }

    /// JPEG quality; only used when the figure format is JPEG.
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.figures.jpeg_quality = quality;
        self
    }

    pub fn image_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.image_path_prefix = prefix.into();
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.config.title = Some(title.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.config.author = Some(author.into());
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.config.language = language.into();
        self
    }

    pub fn save_markdown(mut self, v: bool) -> Self {
        self.config.save_markdown = v;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.config.cancel = Some(flag);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Paper2EpubError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 400 {
            return Err(Paper2EpubError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        if c.concurrency == 0 {
            return Err(Paper2EpubError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.figures.min_width == 0 || c.figures.min_height == 0 {
            return Err(Paper2EpubError::InvalidConfig(
                "Minimum figure size must be ≥ 1 pixel".into(),
            ));
        }
        if !(1..=100).contains(&c.figures.jpeg_quality) {
            return Err(Paper2EpubError::InvalidConfig(format!(
                "JPEG quality must be 1–100, got {}",
                c.figures.jpeg_quality
            )));
        }
        if c.language.trim().is_empty() {
            return Err(Paper2EpubError::InvalidConfig(
                "Language code must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Figure options ───────────────────────────────────────────────────────

/// Size filter and output encoding for the figure-extraction pass.
///
/// Logos and section-rule glyphs are typically well under 100×100 px while
/// genuine figures are larger, so the defaults drop decorations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FigureOptions {
    /// Images narrower than this are discarded. Default: 100.
    pub min_width: u32,
    /// Images shorter than this are discarded. Default: 100.
    pub min_height: u32,
    /// Encoding of the extracted files. Default: PNG.
    pub format: ImageFormat,
    /// JPEG quality (1–100). Default: 95.
    pub jpeg_quality: u8,
}

impl Default for FigureOptions {
    fn default() -> Self {
        Self {
            min_width: 100,
            min_height: 100,
            format: ImageFormat::Png,
            jpeg_quality: 95,
        }
    }
}

/// Output encoding for extracted figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageFormat {
    #[default]
    Png,
    /// No alpha channel: transparent sources are flattened to opaque RGB.
    Jpeg,
}

impl ImageFormat {
    /// File extension used in synthesized asset names.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
        }
    }

    /// MIME type written into the package manifest.
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }
}

impl std::str::FromStr for ImageFormat {
    type Err = Paper2EpubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            other => Err(Paper2EpubError::InvalidConfig(format!(
                "Unknown figure format '{other}' (expected png or jpeg)"
            ))),
        }
    }
}

// ── Page selection ───────────────────────────────────────────────────────

/// Specifies which pages of the PDF to convert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Convert all pages (default).
    #[default]
    All,
    /// Convert a single page (1-indexed).
    Single(usize),
    /// Convert a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Convert specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// Whether a 1-based page number is part of the selection.
    pub fn contains(&self, page_num: usize) -> bool {
        match self {
            PageSelection::All => page_num >= 1,
            PageSelection::Single(p) => *p == page_num,
            PageSelection::Range(start, end) => page_num >= *start && page_num <= *end,
            PageSelection::Set(pages) => pages.contains(&page_num),
        }
    }
}

impl std::str::FromStr for PageSelection {
    type Err = Paper2EpubError;

    /// Parse `"all"`, `"3"`, `"2-5"` or `"1,4,7"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let bad = || Paper2EpubError::InvalidConfig(format!("Invalid page selection '{s}'"));
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            return Ok(PageSelection::All);
        }
        if let Some((a, b)) = s.split_once('-') {
            let start = a.trim().parse().map_err(|_| bad())?;
            let end = b.trim().parse().map_err(|_| bad())?;
            return Ok(PageSelection::Range(start, end));
        }
        if s.contains(',') {
            let pages = s
                .split(',')
                .map(|p| p.trim().parse::<usize>().map_err(|_| bad()))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(PageSelection::Set(pages));
        }
        s.parse().map(PageSelection::Single).map_err(|_| bad())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = ConversionConfig::default();
        assert_eq!(c.figures.min_width, 100);
        assert_eq!(c.figures.min_height, 100);
        assert_eq!(c.figures.format, ImageFormat::Png);
        assert_eq!(c.figures.jpeg_quality, 95);
        assert!(c.extract_figures);
        assert_eq!(c.image_path_prefix, "images/");
        assert_eq!(c.language, "en");
    }

    #[test]
    fn builder_rejects_bad_quality() {
        let err = ConversionConfig::builder().jpeg_quality(0).build();
        assert!(matches!(err, Err(Paper2EpubError::InvalidConfig(_))));
        let err = ConversionConfig::builder().jpeg_quality(101).build();
        assert!(err.is_err());
    }

    #[test]
    fn builder_rejects_zero_min_size() {
        let err = ConversionConfig::builder().figure_min_size(0).build();
        assert!(err.is_err());
    }

    #[test]
    fn builder_clamps_dpi_and_concurrency() {
        let c = ConversionConfig::builder()
            .dpi(10)
            .concurrency(0)
            .build()
            .unwrap();
        assert_eq!(c.dpi, 72);
        assert_eq!(c.concurrency, 1);
    }

    #[test]
    fn image_format_parse_and_extension() {
        assert_eq!("PNG".parse::<ImageFormat>().unwrap(), ImageFormat::Png);
        assert_eq!("jpg".parse::<ImageFormat>().unwrap(), ImageFormat::Jpeg);
        assert!("gif".parse::<ImageFormat>().is_err());
        assert_eq!(ImageFormat::Jpeg.extension(), "jpeg");
        assert_eq!(ImageFormat::Png.mime_type(), "image/png");
    }

    #[test]
    fn page_selection_to_indices() {
        assert_eq!(PageSelection::All.to_indices(3), vec![0, 1, 2]);
        assert_eq!(PageSelection::Single(4).to_indices(3), Vec::<usize>::new());
        assert_eq!(PageSelection::Range(2, 9).to_indices(4), vec![1, 2, 3]);
        assert_eq!(
            PageSelection::Set(vec![3, 1, 3]).to_indices(5),
            vec![0, 2]
        );
    }

    #[test]
    fn page_selection_parse() {
        assert_eq!("all".parse::<PageSelection>().unwrap(), PageSelection::All);
        assert_eq!("3".parse::<PageSelection>().unwrap(), PageSelection::Single(3));
        assert_eq!(
            "2-5".parse::<PageSelection>().unwrap(),
            PageSelection::Range(2, 5)
        );
        assert_eq!(
            "1, 4,7".parse::<PageSelection>().unwrap(),
            PageSelection::Set(vec![1, 4, 7])
        );
        assert!("x-2".parse::<PageSelection>().is_err());
    }

    #[test]
    fn page_selection_contains() {
        assert!(PageSelection::All.contains(9));
        assert!(PageSelection::Range(2, 4).contains(4));
        assert!(!PageSelection::Range(2, 4).contains(5));
        assert!(PageSelection::Set(vec![1, 3]).contains(3));
    }
}
