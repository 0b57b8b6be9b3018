//! # paper2epub
//!
//! Convert academic PDFs into EPUB books a phone or e-reader can reflow.
//!
//! ## Why this crate?
//!
//! Text extraction tools lose what makes a paper a paper: equations come out
//! as symbol soup and figures disappear. This crate rasterises each page and
//! lets a recognition model transcribe it into Markdown with LaTeX math,
//! pulls the embedded figures straight out of the PDF, and packages both
//! into an EPUB whose math is typeset by MathJax.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Init        validate the input, read page count and metadata
//!  ├─ 2. Text        render pages, recognize each one, clean up, join in order
//!  ├─ 3. Figures     scan embedded images, drop icons, re-encode (optional)
//!  ├─ 4. Binding     number figures in extraction order, append a figures section
//!  └─ 5. Packaging   write the EPUB (and optionally the Markdown next to the input)
//! ```
//!
//! A page that fails is skipped and reported; the book is still written as
//! long as one page produced text. A failing figure scan only costs the
//! figures.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use paper2epub::{ConversionConfig, Converter, RecognizerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = ConversionConfig::builder().author("A. Turing").build()?;
//!     let converter = Converter::pdfium(RecognizerConfig::default(), config);
//!     let result = converter.convert("paper.pdf", None).await?;
//!     eprintln!("wrote {} with {} figures", result.output_path.display(), result.stats.figures);
//!     for (page, reason) in result.failure_summary() {
//!         eprintln!("page {page} skipped: {reason}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `paper2epub` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! paper2epub = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod package;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, FigureOptions, ImageFormat, PageSelection};
pub use convert::Converter;
pub use error::{AssetSkip, PackagingError, PageError, Paper2EpubError, RecognitionError};
pub use output::{
    ConversionResult, ConversionStage, ConversionStats, DocumentMetadata, NamedAsset,
};
pub use package::{EpubPackager, PackageRequest, Packager};
pub use pipeline::backend::{DocumentBackend, PdfiumBackend};
pub use pipeline::binder::{bind, BoundFigure};
pub use pipeline::figures::{FigureScan, RasterAsset};
pub use pipeline::recognize::{PageRecognizer, RecognizerConfig, VisionRecognizer};
pub use pipeline::references::{find_references, FigureReference};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
