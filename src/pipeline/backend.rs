//! The document seam between the orchestrator and the PDF library.
//!
//! [`PdfiumBackend`] is the production implementation. The orchestrator
//! only sees [`DocumentBackend`], which keeps the state machine testable
//! without a pdfium shared library.

use crate::config::{FigureOptions, PageSelection};
use crate::error::Paper2EpubError;
use crate::output::DocumentMetadata;
use crate::pipeline::figures::{self, FigureScan};
use crate::pipeline::render::{self, RenderSettings, RenderedPage};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Read access to a paged document.
///
/// Every call opens the document, does its work and closes it again; no
/// handle outlives a call.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Page count and metadata tags.
    async fn inspect(
        &self,
        pdf_path: &Path,
        password: Option<&str>,
    ) -> Result<DocumentMetadata, Paper2EpubError>;

    /// Rasterise the given 0-based pages, one [`RenderedPage`] per page.
    async fn render_pages(
        &self,
        pdf_path: &Path,
        settings: &RenderSettings,
        page_indices: &[usize],
    ) -> Result<Vec<RenderedPage>, Paper2EpubError>;

    /// Run the figure scan over the selected pages.
    async fn scan_figures(
        &self,
        pdf_path: &Path,
        password: Option<&str>,
        options: &FigureOptions,
        selection: &PageSelection,
    ) -> Result<FigureScan, Paper2EpubError>;
}

/// [`DocumentBackend`] backed by pdfium.
#[derive(Debug, Clone, Default)]
pub struct PdfiumBackend {
    library_dir: Option<PathBuf>,
}

impl PdfiumBackend {
    /// Use the default library lookup (see [`render::bind_pdfium`]).
    pub fn new() -> Self {
        Self::default()
    }

    /// Look for libpdfium in `dir` first.
    pub fn with_library_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            library_dir: Some(dir.into()),
        }
    }
}

/// Run blocking pdfium work off the async worker threads.
async fn blocking<T, F>(what: &'static str, f: F) -> Result<T, Paper2EpubError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, Paper2EpubError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Paper2EpubError::Internal(format!("{} task panicked: {}", what, e)))?
}

#[async_trait]
impl DocumentBackend for PdfiumBackend {
    async fn inspect(
        &self,
        pdf_path: &Path,
        password: Option<&str>,
    ) -> Result<DocumentMetadata, Paper2EpubError> {
        let lib = self.library_dir.clone();
        let path = pdf_path.to_path_buf();
        let pwd = password.map(str::to_string);
        blocking("Metadata", move || {
            let pdfium = render::bind_pdfium(lib.as_deref())?;
            render::extract_metadata(&pdfium, &path, pwd.as_deref())
        })
        .await
    }

    async fn render_pages(
        &self,
        pdf_path: &Path,
        settings: &RenderSettings,
        page_indices: &[usize],
    ) -> Result<Vec<RenderedPage>, Paper2EpubError> {
        let lib = self.library_dir.clone();
        let path = pdf_path.to_path_buf();
        let settings = settings.clone();
        let indices = page_indices.to_vec();
        blocking("Render", move || {
            let pdfium = render::bind_pdfium(lib.as_deref())?;
            render::render_pages(&pdfium, &path, &settings, &indices)
        })
        .await
    }

    async fn scan_figures(
        &self,
        pdf_path: &Path,
        password: Option<&str>,
        options: &FigureOptions,
        selection: &PageSelection,
    ) -> Result<FigureScan, Paper2EpubError> {
        let lib = self.library_dir.clone();
        let path = pdf_path.to_path_buf();
        let pwd = password.map(str::to_string);
        let options = *options;
        let selection = selection.clone();
        blocking("Figure scan", move || {
            let pdfium = render::bind_pdfium(lib.as_deref())?;
            figures::scan_pdf(&pdfium, &path, pwd.as_deref(), &options, &selection)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocking_propagates_result() {
        let out = tokio_test::block_on(blocking("Test", || Ok::<_, Paper2EpubError>(7)));
        assert_eq!(out.unwrap(), 7);
    }

    #[tokio::test]
    async fn blocking_maps_panics_to_internal() {
        let out: Result<(), _> = blocking("Test", || panic!("boom")).await;
        assert!(matches!(out, Err(Paper2EpubError::Internal(msg)) if msg.contains("Test task")));
    }
}
