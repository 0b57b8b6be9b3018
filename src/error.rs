//! Error types for the paper2epub library.
//!
//! Failures are split by the granularity at which they stop work:
//!
//! * [`Paper2EpubError`]: **Fatal**: the conversion cannot produce a book
//!   (missing input, not a PDF, no page yielded text, packaging failed).
//!   Returned as `Err(Paper2EpubError)` from [`crate::Converter::convert`].
//!
//! * [`PageError`]: **Non-fatal**: one page could not be rendered or
//!   recognized. Stored in [`crate::output::ConversionResult::page_failures`].
//!
//! * [`AssetSkip`]: **Non-fatal**: one embedded image could not be decoded.
//!   Stored in [`crate::output::ConversionResult::asset_skips`].
//!
//! Assets below the size threshold are neither: they are filtered silently.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the paper2epub library.
#[derive(Debug, Error)]
pub enum Paper2EpubError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    InputNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists but is not a PDF container.
    #[error("File is not a PDF: '{path}' ({detail})")]
    InputFormat { path: PathBuf, detail: String },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The page selection matched no page of the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// Every attempted page failed; there is no text to package.
    #[error("No content extracted: all {total} pages failed.\nFirst error: {first_error}")]
    NoContentExtracted { total: usize, first_error: String },

    /// The recognition collaborator could not be initialised.
    #[error("Recognizer '{provider}' is not available.\n{hint}")]
    RecognizerUnavailable { provider: String, hint: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The packaging collaborator failed; no book was written.
    #[error("Packaging failed: {0}")]
    Packaging(#[from] PackagingError),

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install libpdfium for your platform and either place it next to the\n\
executable or set PDFIUM_LIB_PATH=/path/to/dir-containing-libpdfium.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
///
/// The overall conversion continues unless every page fails.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Page rasterisation failed.
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The recognizer returned an error (after its own retries).
    #[error("Page {page}: recognition failed: {detail}")]
    RecognitionFailed { page: usize, detail: String },

    /// The recognizer answered but nothing usable remained after cleanup.
    #[error("Page {page}: recognizer returned no text")]
    EmptyOutput { page: usize },

    /// Recognition did not finish within the per-page timeout.
    #[error("Page {page}: recognition timed out after {secs}s")]
    Timeout { page: usize, secs: u64 },

    /// The conversion was cancelled before this page was dispatched.
    #[error("Page {page}: skipped after cancellation")]
    Cancelled { page: usize },
}

impl PageError {
    /// 1-based page number the error refers to.
    pub fn page(&self) -> usize {
        match self {
            PageError::RenderFailed { page, .. }
            | PageError::RecognitionFailed { page, .. }
            | PageError::EmptyOutput { page }
            | PageError::Timeout { page, .. }
            | PageError::Cancelled { page } => *page,
        }
    }
}

/// Why an embedded image was dropped during the figure scan.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum AssetSkip {
    /// The image object could not be decoded or re-encoded.
    #[error("Page {page}, image {index}: {detail}")]
    DecodeFailed {
        page: usize,
        index: usize,
        detail: String,
    },

    /// The page's object list could not be read at all.
    #[error("Page {page}: could not enumerate images: {detail}")]
    PageEnumerationFailed { page: usize, detail: String },
}

/// Failure reported by a [`crate::pipeline::recognize::PageRecognizer`].
#[derive(Debug, Clone, Error)]
pub enum RecognitionError {
    /// The underlying model could not be initialised.
    #[error("recognizer '{provider}' unavailable: {hint}")]
    Unavailable { provider: String, hint: String },

    /// The model call failed after all retries.
    #[error("failed after {retries} retries: {detail}")]
    Failed { retries: u32, detail: String },
}

/// Failure reported by a [`crate::package::Packager`].
#[derive(Debug, Error)]
pub enum PackagingError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("zip container error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// The body references an asset that was not supplied.
    #[error("body references missing asset '{0}'")]
    MissingAsset(String),

    #[error("invalid package request: {0}")]
    InvalidRequest(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_content_display() {
        let e = Paper2EpubError::NoContentExtracted {
            total: 2,
            first_error: "Page 1: recognizer returned no text".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("all 2 pages"), "got: {msg}");
        assert!(msg.contains("Page 1"));
    }

    #[test]
    fn packaging_error_converts() {
        let e: Paper2EpubError = PackagingError::MissingAsset("figure_001.png".into()).into();
        assert!(matches!(e, Paper2EpubError::Packaging(_)));
        assert!(e.to_string().contains("figure_001.png"));
    }

    #[test]
    fn page_error_reports_page() {
        assert_eq!(PageError::EmptyOutput { page: 4 }.page(), 4);
        assert_eq!(
            PageError::Timeout { page: 2, secs: 30 }.page(),
            2,
        );
        let e = PageError::RenderFailed {
            page: 7,
            detail: "bad xref".into(),
        };
        assert!(e.to_string().contains("Page 7"));
    }

    #[test]
    fn asset_skip_display() {
        let e = AssetSkip::DecodeFailed {
            page: 3,
            index: 1,
            detail: "unsupported filter JBIG2Decode".into(),
        };
        assert!(e.to_string().contains("image 1"));
    }
}
