//! PDF access via pdfium: binding, opening, metadata and page rasterisation.
//!
//! Everything here is blocking. `pdfium-render` wraps a C++ library with
//! thread-local state, so [`crate::pipeline::backend::PdfiumBackend`] calls
//! these functions from `tokio::task::spawn_blocking`.
//!
//! A document opened with [`open_document`] is closed when the returned
//! `PdfDocument` is dropped, on every exit path.

use crate::error::{PageError, Paper2EpubError};
use crate::output::DocumentMetadata;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming a directory that contains libpdfium.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Rasterisation settings for recognition input.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub dpi: u32,
    pub max_rendered_pixels: u32,
    pub password: Option<String>,
}

/// One rasterised page, or the reason it could not be rasterised.
#[derive(Debug)]
pub struct RenderedPage {
    /// 1-based page number.
    pub page_num: usize,
    pub image: Result<DynamicImage, PageError>,
}

/// Bind to a pdfium library.
///
/// Lookup order: `library_dir`, then `$PDFIUM_LIB_PATH`, then the current
/// directory, then the system library search path.
pub fn bind_pdfium(library_dir: Option<&Path>) -> Result<Pdfium, Paper2EpubError> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(dir) = library_dir {
        candidates.push(dir.to_path_buf());
    }
    if let Ok(dir) = std::env::var(PDFIUM_LIB_PATH_ENV) {
        if !dir.is_empty() {
            candidates.push(PathBuf::from(dir));
        }
    }
    candidates.push(PathBuf::from("./"));

    for dir in &candidates {
        let lib = Pdfium::pdfium_platform_library_name_at_path(dir);
        if let Ok(bindings) = Pdfium::bind_to_library(&lib) {
            debug!("Bound pdfium from {}", lib.display());
            return Ok(Pdfium::new(bindings));
        }
    }

    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| Paper2EpubError::PdfiumBindingFailed(format!("{:?}", e)))
}

/// Open a PDF, mapping pdfium's errors to the fatal error taxonomy.
pub fn open_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, Paper2EpubError> {
    pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                Paper2EpubError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                Paper2EpubError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            Paper2EpubError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}

/// Read page count and Title/Author tags without rendering anything.
pub fn extract_metadata(
    pdfium: &Pdfium,
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentMetadata, Paper2EpubError> {
    let document = open_document(pdfium, pdf_path, password)?;
    let metadata = document.metadata();

    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().trim().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    Ok(DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        page_count: document.pages().len() as usize,
    })
}

/// Rasterise the selected pages (0-based indices).
///
/// A page that fails to load or render yields `Err(PageError::RenderFailed)`
/// in its slot; only a document-level open failure is returned as `Err`.
pub fn render_pages(
    pdfium: &Pdfium,
    pdf_path: &Path,
    settings: &RenderSettings,
    page_indices: &[usize],
) -> Result<Vec<RenderedPage>, Paper2EpubError> {
    let document = open_document(pdfium, pdf_path, settings.password.as_deref())?;
    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded for rendering: {} pages", total_pages);

    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(settings.dpi as f32 / 72.0)
        .set_maximum_width(settings.max_rendered_pixels as i32)
        .set_maximum_height(settings.max_rendered_pixels as i32);

    let mut results = Vec::with_capacity(page_indices.len());

    for &idx in page_indices {
        let page_num = idx + 1;
        if idx >= total_pages {
            warn!("Skipping page {} (out of range, total={})", page_num, total_pages);
            continue;
        }

        let rendered = match pages.get(idx as u16) {
            Ok(page) => page
                .render_with_config(&render_config)
                .map(|bitmap| bitmap.as_image()),
            Err(e) => Err(e),
        };
        let image = rendered.map_err(|e| PageError::RenderFailed {
            page: page_num,
            detail: format!("{:?}", e),
        });

        match &image {
            Ok(img) => debug!("Rendered page {} → {}x{} px", page_num, img.width(), img.height()),
            Err(e) => warn!("{}", e),
        }

        results.push(RenderedPage { page_num, image });
    }

    Ok(results)
}
